//! Job lifecycle orchestration.
//!
//! A trigger moves through [`JobManager::start`] (validate, load, parse,
//! then create and mark running in one store write) and [`JobManager::execute`] (analyse and score
//! concurrently, write artifacts, persist the terminal state, notify).
//! Input problems surface from `start` before any record exists.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use styleprof_agents::{AgentPipeline, PipelineError};
use styleprof_core::{
    parse_transcript, AppConfig, ChunkScores, FailureKind, Job, JobFailure, JobState,
    MissingSection, NewJob, NotificationState, ParsedTranscript, StyleProfile, TriggerRequest,
};
use styleprof_notify::{CompletionEvent, Notifier, NotifyError, RetryPolicy};
use styleprof_scoring::{ChunkScorer, ScoringCancelled};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::artifacts::write_artifacts;
use crate::error::{JobError, StoreError};
use crate::source::{FileTranscriptSource, TranscriptSource};
use crate::store::JobStore;

/// A job that is persisted as `Running` and ready to execute.
#[derive(Debug)]
pub struct StartedJob {
    pub job: Job,
    pub transcript: ParsedTranscript,
}

/// Owns the collaborators a job needs and drives it to a terminal state.
pub struct JobManager {
    store: Arc<dyn JobStore>,
    source: Arc<dyn TranscriptSource>,
    pipeline: AgentPipeline,
    scorer: ChunkScorer,
    notifier: Option<Notifier>,
    output_dir: PathBuf,
    speaker_label: String,
    tasks: TaskTracker,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("pipeline", &self.pipeline)
            .field("notifier", &self.notifier)
            .field("output_dir", &self.output_dir)
            .field("speaker_label", &self.speaker_label)
            .field("in_flight", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

/// Build the notifier described by `config`, or `None` when no URL is set.
///
/// # Errors
///
/// Returns [`NotifyError`] if the URL is invalid or the HTTP client cannot
/// be built.
pub fn notifier_from_config(config: &AppConfig) -> Result<Option<Notifier>, NotifyError> {
    let Some(url) = config.notify_url.as_deref() else {
        return Ok(None);
    };
    let policy = RetryPolicy::new(config.notify_max_attempts, config.notify_backoff_base());
    Notifier::new(
        url,
        config.notify_api_key.clone(),
        config.notify_timeout(),
        policy,
    )
    .map(Some)
}

impl JobManager {
    /// Manager with the default pipeline and scorer and no notifier.
    pub fn new(
        store: Arc<dyn JobStore>,
        source: Arc<dyn TranscriptSource>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            source,
            pipeline: AgentPipeline::default(),
            scorer: ChunkScorer::default(),
            notifier: None,
            output_dir: output_dir.into(),
            speaker_label: "Speaker 2".to_string(),
            tasks: TaskTracker::new(),
        }
    }

    /// Manager wired from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the notifier settings are invalid.
    pub fn from_config(config: &AppConfig, store: Arc<dyn JobStore>) -> Result<Self, NotifyError> {
        let source = Arc::new(FileTranscriptSource::new(&config.transcript_root));
        let pipeline = AgentPipeline::new(
            styleprof_agents::default_capabilities(),
            config.analysis_timeout(),
            config.analysis_concurrency,
        );
        let scorer = ChunkScorer::new(
            Arc::new(styleprof_scoring::LexiconExtractor),
            config.scoring_timeout(),
            config.scoring_concurrency,
        );

        let manager = Self::new(store, source, &config.output_dir)
            .with_pipeline(pipeline)
            .with_scorer(scorer)
            .with_speaker_label(&config.speaker_label);
        Ok(match notifier_from_config(config)? {
            Some(notifier) => manager.with_notifier(notifier),
            None => manager,
        })
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: AgentPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: ChunkScorer) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_speaker_label(mut self, label: &str) -> Self {
        self.speaker_label = label.to_string();
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Validate a trigger, load its transcript, and persist a `Running` job.
    ///
    /// # Errors
    ///
    /// - [`JobError::Trigger`] / [`JobError::Transcript`] for input problems;
    ///   no record is created.
    /// - [`JobError::Conflict`] if the project already has an active job.
    /// - [`JobError::Store`] if persistence fails.
    pub async fn start(&self, trigger: TriggerRequest) -> Result<StartedJob, JobError> {
        let trigger = trigger.normalized()?;
        let transcript = self.load_transcript(&trigger.transcript_ref).await?;

        let job = self
            .store
            .create_running_job(NewJob {
                project_id: trigger.project_id,
                client_id: trigger.client_id,
                display_name: trigger.display_name,
                transcript_ref: trigger.transcript_ref,
                attempt: 1,
                retry_of: None,
            })
            .await?;
        Ok(self.started(job, transcript))
    }

    /// Create and start a new attempt of a failed job.
    ///
    /// `transcript_ref` overrides the prior job's reference when given.
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] if `prior_id` is unknown.
    /// - [`JobError::NotRetryable`] if the prior job is not `Failed`.
    /// - Any error [`JobManager::start`] can return.
    pub async fn retry_job(
        &self,
        prior_id: Uuid,
        transcript_ref: Option<String>,
    ) -> Result<StartedJob, JobError> {
        let prior = self.store.get_job(prior_id).await?;
        if prior.state != JobState::Failed {
            return Err(JobError::NotRetryable {
                id: prior.id,
                state: prior.state,
            });
        }

        let transcript_ref = transcript_ref
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or(prior.transcript_ref);
        let transcript = self.load_transcript(&transcript_ref).await?;

        let job = self
            .store
            .create_running_job(NewJob {
                project_id: prior.project_id,
                client_id: prior.client_id,
                display_name: prior.display_name,
                transcript_ref,
                attempt: prior.attempt.saturating_add(1),
                retry_of: Some(prior.id),
            })
            .await?;
        tracing::info!(job_id = %job.id, retry_of = %prior_id, attempt = job.attempt, "retrying job");
        Ok(self.started(job, transcript))
    }

    /// Analyse, score, persist, and notify. Returns the terminal job record.
    ///
    /// Analysis and scoring failures end the job as `Failed`; they are not
    /// returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Store`] only if the store cannot record any
    /// terminal state.
    pub async fn execute(
        &self,
        started: StartedJob,
        cancel: &CancellationToken,
    ) -> Result<Job, JobError> {
        let StartedJob { job, transcript } = started;
        let text: Arc<str> = Arc::from(transcript.clean_text());

        let (profile, scores) = tokio::join!(
            self.pipeline.run(text, cancel),
            self.scorer.score_chunks(transcript.chunks(), cancel),
        );

        let failure = match (profile, scores) {
            (Ok(profile), Ok(scores)) => return self.finish(&job, profile, scores).await,
            (Err(PipelineError::Cancelled), _) | (_, Err(ScoringCancelled)) => {
                JobFailure::new(FailureKind::Cancelled, "cancelled before all work started")
            }
            (Err(PipelineError::Exhausted { missing }), Ok(_)) => JobFailure::new(
                FailureKind::PipelineExhausted,
                describe_missing(&missing),
            ),
        };
        self.fail(&job, failure).await
    }

    /// [`JobManager::start`] followed by [`JobManager::execute`].
    ///
    /// # Errors
    ///
    /// Any error either step can return.
    pub async fn run(
        &self,
        trigger: TriggerRequest,
        cancel: &CancellationToken,
    ) -> Result<Job, JobError> {
        let started = self.start(trigger).await?;
        self.execute(started, cancel).await
    }

    /// Execute `started` on its own task, tracked until [`JobManager::drain`].
    pub fn spawn(
        self: &Arc<Self>,
        started: StartedJob,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<Job, JobError>> {
        let manager = Arc::clone(self);
        self.tasks.spawn(async move {
            let job_id = started.job.id;
            let result = manager.execute(started, &cancel).await;
            if let Err(e) = &result {
                tracing::error!(job_id = %job_id, error = %e, "job execution failed");
            }
            result
        })
    }

    /// Close the task tracker and wait up to `grace` for spawned jobs to
    /// record their terminal state. Cancel their tokens first so they end
    /// promptly as `cancelled`.
    ///
    /// Returns `false` if jobs were still running when `grace` ran out;
    /// those stay `Running` until the stale sweep fails them.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        let in_flight = self.tasks.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "waiting for in-flight jobs");
        }
        match tokio::time::timeout(grace, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_elapsed) => {
                tracing::warn!(
                    in_flight = self.tasks.len(),
                    grace_secs = grace.as_secs(),
                    "in-flight jobs did not finish before shutdown"
                );
                false
            }
        }
    }

    /// Fail every `Running` job not updated within `older_than`.
    ///
    /// Returns the jobs that were failed.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Store`] if stale jobs cannot be listed.
    pub async fn recover_stale_jobs(&self, older_than: Duration) -> Result<Vec<Job>, JobError> {
        let now = Utc::now();
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let stale = self.store.list_stale_jobs(cutoff).await?;
        let mut recovered = Vec::with_capacity(stale.len());
        for job in stale {
            let failure = JobFailure::new(
                FailureKind::Interrupted,
                format!(
                    "still running after {}s; presumed interrupted",
                    older_than.as_secs()
                ),
            );
            match self.store.fail_job(job.id, &failure).await {
                Ok(failed) => {
                    tracing::warn!(
                        job_id = %failed.id,
                        project_id = %failed.project_id,
                        "recovered stale job"
                    );
                    recovered.push(failed);
                }
                // Finished between the listing and the update.
                Err(StoreError::InvalidTransition { .. }) => {}
                Err(e) => {
                    tracing::warn!(job_id = %job.id, error = %e, "failed to recover stale job");
                }
            }
        }
        Ok(recovered)
    }

    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] for an unknown id.
    pub async fn get(&self, id: Uuid) -> Result<Job, JobError> {
        Ok(self.store.get_job(id).await?)
    }

    /// # Errors
    ///
    /// Returns [`JobError::Store`] if the listing fails.
    pub async fn list(&self, limit: usize) -> Result<Vec<Job>, JobError> {
        Ok(self.store.list_jobs(limit).await?)
    }

    async fn load_transcript(&self, transcript_ref: &str) -> Result<ParsedTranscript, JobError> {
        let raw = self.source.load(transcript_ref).await?;
        Ok(parse_transcript(&raw, &self.speaker_label)?)
    }

    fn started(&self, job: Job, transcript: ParsedTranscript) -> StartedJob {
        tracing::info!(
            job_id = %job.id,
            project_id = %job.project_id,
            chunks = transcript.chunks().len(),
            speaker = %self.speaker_label,
            "job started"
        );
        StartedJob { job, transcript }
    }

    async fn finish(
        &self,
        job: &Job,
        profile: StyleProfile,
        scores: ChunkScores,
    ) -> Result<Job, JobError> {
        let paths = match write_artifacts(&self.output_dir, job.id, &profile, &scores).await {
            Ok(paths) => paths,
            Err(e) => {
                return self
                    .fail(job, JobFailure::new(FailureKind::Persistence, e.to_string()))
                    .await
            }
        };

        let completed = match self.store.complete_job(job.id, &profile, &scores).await {
            Ok(completed) => completed,
            Err(e) => {
                return self
                    .fail(job, JobFailure::new(FailureKind::Persistence, e.to_string()))
                    .await
            }
        };
        tracing::info!(
            job_id = %completed.id,
            project_id = %completed.project_id,
            partial = completed.is_partial(),
            "job completed"
        );

        let Some(notifier) = &self.notifier else {
            return Ok(completed);
        };

        let event = CompletionEvent::completed(
            completed.id,
            &completed.project_id,
            &completed.client_id,
            completed.is_partial(),
            paths.pointers(),
        );
        let delivery = match notifier.deliver(&event).await {
            Ok(_) => NotificationState::Delivered,
            Err(_) => NotificationState::Exhausted,
        };

        match self.store.set_notification_state(completed.id, delivery).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                tracing::warn!(
                    job_id = %completed.id,
                    error = %e,
                    "failed to record notification state"
                );
                Ok(Job {
                    notification_state: delivery,
                    ..completed
                })
            }
        }
    }

    async fn fail(&self, job: &Job, failure: JobFailure) -> Result<Job, JobError> {
        tracing::warn!(
            job_id = %job.id,
            project_id = %job.project_id,
            kind = %failure.kind,
            error = %failure.message,
            "job failed"
        );
        Ok(self.store.fail_job(job.id, &failure).await?)
    }
}

fn describe_missing(missing: &[MissingSection]) -> String {
    let causes: Vec<String> = missing
        .iter()
        .map(|m| format!("{}: {}", m.name, m.reason))
        .collect();
    format!("every capability failed ({})", causes.join("; "))
}
