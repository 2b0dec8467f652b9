//! Persistence seam for job records.
//!
//! Every write is a conditional transition: the store checks the job's
//! current state and rejects the call with [`StoreError::InvalidTransition`]
//! when it does not match. Inserts additionally enforce one active
//! (pending or running) job per project.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use styleprof_core::{ChunkScores, Job, JobFailure, NewJob, NotificationState, StyleProfile};
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a `Pending` job, or [`StoreError::Conflict`] if the project
    /// already has an active one.
    async fn create_job(&self, new_job: NewJob) -> Result<Job, StoreError>;

    /// `Pending -> Running`.
    async fn start_job(&self, id: Uuid) -> Result<Job, StoreError>;

    /// Insert a job and take it `Pending -> Running` as one atomic write.
    ///
    /// On error nothing is recorded and the project's slot stays free.
    async fn create_running_job(&self, new_job: NewJob) -> Result<Job, StoreError>;

    /// `Running -> Completed`, storing profile and scores with the transition.
    async fn complete_job(
        &self,
        id: Uuid,
        profile: &StyleProfile,
        scores: &ChunkScores,
    ) -> Result<Job, StoreError>;

    /// `Running -> Failed` with a structured cause.
    async fn fail_job(&self, id: Uuid, failure: &JobFailure) -> Result<Job, StoreError>;

    /// Record the notification outcome of a completed job.
    async fn set_notification_state(
        &self,
        id: Uuid,
        state: NotificationState,
    ) -> Result<Job, StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError>;

    /// Most recent jobs first.
    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Running jobs last updated before `cutoff`.
    async fn list_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>, StoreError>;
}
