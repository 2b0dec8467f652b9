use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use styleprof_core::{
    ChunkScores, Job, JobFailure, JobState, NewJob, NotificationState, StyleProfile,
};
use uuid::Uuid;

use super::JobStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    /// Every state each job has been in, in order.
    history: HashMap<Uuid, Vec<JobState>>,
}

impl Inner {
    fn insert(&mut self, new_job: NewJob) -> Result<Job, StoreError> {
        let busy = self
            .jobs
            .values()
            .any(|j| j.project_id == new_job.project_id && j.state.is_active());
        if busy {
            return Err(StoreError::Conflict {
                project_id: new_job.project_id,
            });
        }

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            project_id: new_job.project_id,
            client_id: new_job.client_id,
            display_name: new_job.display_name,
            transcript_ref: new_job.transcript_ref,
            state: JobState::Pending,
            notification_state: NotificationState::NotSent,
            attempt: new_job.attempt,
            retry_of: new_job.retry_of,
            error: None,
            profile: None,
            scores: None,
            created_at: now,
            updated_at: now,
        };
        self.history.insert(job.id, vec![JobState::Pending]);
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }
}

/// Process-local job store.
///
/// Used by the CLI when no database is configured and by tests. The
/// active-job check and the insert happen under one lock, so concurrent
/// triggers for a project see exactly one winner.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// States the job has passed through, starting with `Pending`.
    #[must_use]
    pub fn history(&self, id: Uuid) -> Vec<JobState> {
        self.lock()
            .ok()
            .and_then(|inner| inner.history.get(&id).cloned())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory job store lock poisoned".to_string()))
    }

    fn transition<F>(&self, id: Uuid, expected: JobState, apply: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut inner = self.lock()?;
        let job = inner.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if job.state != expected {
            return Err(StoreError::InvalidTransition {
                id,
                expected: expected.as_str(),
            });
        }

        let before = job.state;
        apply(job);
        job.updated_at = Utc::now();
        let updated = job.clone();

        if updated.state != before {
            inner.history.entry(id).or_default().push(updated.state);
        }
        Ok(updated)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.lock()?;
        inner.insert(new_job)
    }

    async fn start_job(&self, id: Uuid) -> Result<Job, StoreError> {
        self.transition(id, JobState::Pending, |job| job.state = JobState::Running)
    }

    async fn create_running_job(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.lock()?;
        let mut job = inner.insert(new_job)?;
        job.state = JobState::Running;
        inner.jobs.insert(job.id, job.clone());
        inner.history.entry(job.id).or_default().push(JobState::Running);
        Ok(job)
    }

    async fn complete_job(
        &self,
        id: Uuid,
        profile: &StyleProfile,
        scores: &ChunkScores,
    ) -> Result<Job, StoreError> {
        self.transition(id, JobState::Running, |job| {
            job.state = JobState::Completed;
            job.profile = Some(profile.clone());
            job.scores = Some(scores.clone());
        })
    }

    async fn fail_job(&self, id: Uuid, failure: &JobFailure) -> Result<Job, StoreError> {
        self.transition(id, JobState::Running, |job| {
            job.state = JobState::Failed;
            job.error = Some(failure.clone());
        })
    }

    async fn set_notification_state(
        &self,
        id: Uuid,
        state: NotificationState,
    ) -> Result<Job, StoreError> {
        self.transition(id, JobState::Completed, |job| job.notification_state = state)
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError> {
        self.lock()?
            .jobs
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.lock()?.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn list_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .lock()?
            .jobs
            .values()
            .filter(|j| j.state == JobState::Running && j.updated_at < cutoff)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.updated_at);
        Ok(jobs)
    }
}
