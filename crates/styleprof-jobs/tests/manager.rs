//! End-to-end tests for `JobManager` over the in-memory store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use styleprof_agents::{default_capabilities, AgentPipeline, AnalysisCapability, AnalysisError};
use styleprof_core::{
    ChunkScores, FailureKind, Job, JobFailure, JobOutcome, JobState, NewJob, NotificationState,
    SectionName, StyleProfile, TriggerRequest,
};
use styleprof_jobs::{
    FileTranscriptSource, JobError, JobManager, JobStore, MemoryJobStore, StoreError,
    PROFILE_FILE, PROFILE_META_FILE, SCORES_FILE,
};
use styleprof_notify::{Notifier, RecordingSleeper, RetryPolicy};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERVIEW: &str = "\
## [Chunk 5]
**Timestamp**: 00:04:00 - 00:05:10
> Speaker 1: Tell me about the early days.
> Speaker 2: When I started, everyone told me it was impossible. I felt lost.

## [Chunk 6]
**Timestamp**: 00:05:10 - 00:06:02
> Speaker 2: I kept going because I refused to quit. Every setback made me stronger.

## [Chunk 7]
**Timestamp**: 00:06:02 - 00:07:15
> Speaker 2: Some days I doubt whether I'm good enough, but I learned to trust the process.

## [Chunk 8]
**Timestamp**: 00:07:15 - 00:07:30
> Speaker 1: Let's take a short break.
";

struct Fixture {
    transcripts: TempDir,
    output: TempDir,
    store: Arc<MemoryJobStore>,
}

impl Fixture {
    fn new() -> Self {
        let transcripts = tempfile::tempdir().unwrap();
        std::fs::write(transcripts.path().join("interview.md"), INTERVIEW).unwrap();
        std::fs::write(transcripts.path().join("no-chunks.md"), "just some notes\n").unwrap();
        Self {
            transcripts,
            output: tempfile::tempdir().unwrap(),
            store: Arc::new(MemoryJobStore::new()),
        }
    }

    fn manager(&self) -> JobManager {
        self.manager_with_store(Arc::clone(&self.store) as Arc<dyn JobStore>)
    }

    fn manager_with_store(&self, store: Arc<dyn JobStore>) -> JobManager {
        JobManager::new(
            store,
            Arc::new(FileTranscriptSource::new(self.transcripts.path())),
            self.output.path(),
        )
    }
}

fn trigger(project_id: &str) -> TriggerRequest {
    TriggerRequest {
        project_id: project_id.to_string(),
        client_id: "client-1".to_string(),
        transcript_ref: "interview.md".to_string(),
        display_name: Some("Jane Doe".to_string()),
    }
}

struct Failing(SectionName);

#[async_trait]
impl AnalysisCapability for Failing {
    fn section(&self) -> SectionName {
        self.0
    }

    async fn analyze(&self, _transcript: &str) -> Result<Vec<String>, AnalysisError> {
        Err(AnalysisError::Failed("model unavailable".to_string()))
    }
}

/// Default registry with `failing` sections replaced by failing stubs.
fn pipeline_failing(failing: &[SectionName]) -> AgentPipeline {
    let capabilities = default_capabilities()
        .into_iter()
        .map(|c| -> Arc<dyn AnalysisCapability> {
            if failing.contains(&c.section()) {
                Arc::new(Failing(c.section()))
            } else {
                c
            }
        })
        .collect();
    AgentPipeline::new(capabilities, Duration::from_secs(5), 5)
}

fn artifact_dir(output: &Path, job: &Job) -> std::path::PathBuf {
    output.join(job.id.to_string())
}

#[tokio::test]
async fn completed_job_writes_artifacts() {
    let fx = Fixture::new();
    let manager = fx.manager();

    let job = manager
        .run(trigger("proj-1"), &CancellationToken::new())
        .await
        .expect("job should run");

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.outcome(), JobOutcome::Succeeded);
    assert_eq!(job.notification_state, NotificationState::NotSent);
    assert_eq!(job.client_id, "client-1");
    assert_eq!(job.attempt, 1);

    let scores = job.scores.as_ref().unwrap();
    let ids: Vec<&str> = scores.chunk_ids().collect();
    assert_eq!(ids, vec!["chunk_05", "chunk_06", "chunk_07", "chunk_08"]);

    let dir = artifact_dir(fx.output.path(), &job);
    let markdown = std::fs::read_to_string(dir.join(PROFILE_FILE)).unwrap();
    assert!(markdown.starts_with("# Style Profile\n"));
    for name in SectionName::ALL {
        assert!(markdown.contains(&format!("## {name}:\n- ")), "missing {name}");
    }
    let meta: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(PROFILE_META_FILE)).unwrap())
            .unwrap();
    assert_eq!(meta["complete"], true);

    let on_disk: ChunkScores =
        serde_json::from_str(&std::fs::read_to_string(dir.join(SCORES_FILE)).unwrap()).unwrap();
    assert_eq!(&on_disk, scores);

    assert_eq!(
        fx.store.history(job.id),
        vec![JobState::Pending, JobState::Running, JobState::Completed]
    );
}

#[tokio::test]
async fn simultaneous_triggers_for_one_project_conflict() {
    let fx = Fixture::new();
    let manager = fx.manager();

    let (a, b) = tokio::join!(manager.start(trigger("proj-1")), manager.start(trigger("proj-1")));

    let (winner, loser) = match (a, b) {
        (Ok(started), Err(e)) | (Err(e), Ok(started)) => (started, e),
        other => panic!("expected exactly one winner, got {other:?}"),
    };
    assert!(matches!(loser, JobError::Conflict { ref project_id } if project_id == "proj-1"));
    assert_eq!(winner.job.state, JobState::Running);

    // A different project is independent.
    manager.start(trigger("proj-2")).await.unwrap();
}

#[tokio::test]
async fn one_failing_capability_completes_partially() {
    let fx = Fixture::new();
    let manager = fx
        .manager()
        .with_pipeline(pipeline_failing(&[SectionName::Values]));

    let job = manager
        .run(trigger("proj-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.outcome(), JobOutcome::SucceededPartial);
    assert!(job.is_partial());
    let missing = job.missing_sections();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].name, SectionName::Values);

    let profile = job.profile.as_ref().unwrap();
    assert_eq!(profile.sections().len(), 4);

    let meta: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(artifact_dir(fx.output.path(), &job).join(PROFILE_META_FILE))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(meta["complete"], false);
    assert_eq!(meta["missing"][0]["name"], "values");
}

#[tokio::test]
async fn every_capability_failing_fails_the_job() {
    let fx = Fixture::new();
    let manager = fx
        .manager()
        .with_pipeline(pipeline_failing(&SectionName::ALL));

    let job = manager
        .run(trigger("proj-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.outcome(), JobOutcome::Failed);
    let error = job.error.as_ref().unwrap();
    assert_eq!(error.kind, FailureKind::PipelineExhausted);
    assert!(error.message.contains("model unavailable"), "{}", error.message);
    assert!(job.profile.is_none());
    assert!(!artifact_dir(fx.output.path(), &job).exists());
    assert_eq!(
        fx.store.history(job.id),
        vec![JobState::Pending, JobState::Running, JobState::Failed]
    );
}

#[tokio::test]
async fn cancelled_job_fails_with_cancelled_kind() {
    let fx = Fixture::new();
    let manager = fx.manager();
    let started = manager.start(trigger("proj-1")).await.unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let job = manager.execute(started, &token).await.unwrap();

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error.unwrap().kind, FailureKind::Cancelled);
}

#[tokio::test]
async fn input_errors_create_no_record() {
    let fx = Fixture::new();
    let manager = fx.manager();

    let blank_project = TriggerRequest {
        project_id: "  ".to_string(),
        ..trigger("x")
    };
    let missing_file = TriggerRequest {
        transcript_ref: "nope.md".to_string(),
        ..trigger("proj-1")
    };
    let no_chunks = TriggerRequest {
        transcript_ref: "no-chunks.md".to_string(),
        ..trigger("proj-1")
    };

    for bad in [blank_project, missing_file, no_chunks] {
        let err = manager.start(bad).await.unwrap_err();
        assert!(err.is_input(), "{err}");
    }
    assert!(manager.list(50).await.unwrap().is_empty());

    // The project slot was never taken.
    manager.start(trigger("proj-1")).await.unwrap();
}

#[tokio::test]
async fn exhausted_notification_leaves_job_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::default());
    let notifier = Notifier::new(
        &format!("{}/hook", server.uri()),
        Some("key".to_string()),
        Duration::from_secs(2),
        RetryPolicy::new(3, Duration::from_millis(500)),
    )
    .unwrap()
    .with_sleeper(Arc::clone(&sleeper) as Arc<dyn styleprof_notify::Sleeper>);

    let fx = Fixture::new();
    let manager = fx.manager().with_notifier(notifier);
    let job = manager
        .run(trigger("proj-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.notification_state, NotificationState::Exhausted);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(500), Duration::from_millis(1000)]
    );

    let stored = manager.get(job.id).await.unwrap();
    assert_eq!(stored.state, JobState::Completed);
    assert_eq!(stored.notification_state, NotificationState::Exhausted);
}

#[tokio::test]
async fn delivered_notification_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Notifier::new(
        &format!("{}/hook", server.uri()),
        None,
        Duration::from_secs(2),
        RetryPolicy::default(),
    )
    .unwrap();

    let fx = Fixture::new();
    let manager = fx
        .manager()
        .with_pipeline(pipeline_failing(&[SectionName::Voice]))
        .with_notifier(notifier);
    let job = manager
        .run(trigger("proj-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(job.notification_state, NotificationState::Delivered);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["jobId"], job.id.to_string());
    assert_eq!(body["projectId"], "proj-1");
    assert_eq!(body["clientId"], "client-1");
    assert_eq!(body["partial"], true);
    assert!(body["artifacts"]["scores"]
        .as_str()
        .unwrap()
        .ends_with(SCORES_FILE));
}

#[tokio::test]
async fn failed_job_can_be_retried() {
    let fx = Fixture::new();
    let failing = fx
        .manager()
        .with_pipeline(pipeline_failing(&SectionName::ALL));
    let first = failing
        .run(trigger("proj-1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.state, JobState::Failed);

    let manager = fx.manager();
    let started = manager.retry_job(first.id, None).await.unwrap();
    assert_eq!(started.job.attempt, 2);
    assert_eq!(started.job.retry_of, Some(first.id));
    assert_eq!(started.job.project_id, "proj-1");

    let second = manager
        .execute(started, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.state, JobState::Completed);

    let err = manager.retry_job(second.id, None).await.unwrap_err();
    assert!(matches!(
        err,
        JobError::NotRetryable {
            state: JobState::Completed,
            ..
        }
    ));
    assert!(matches!(
        manager.retry_job(Uuid::new_v4(), None).await,
        Err(JobError::NotFound(_))
    ));
}

#[tokio::test]
async fn stale_running_jobs_are_interrupted() {
    let fx = Fixture::new();
    let manager = fx.manager();
    let started = manager.start(trigger("proj-1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // A generous threshold leaves the job alone.
    assert!(manager
        .recover_stale_jobs(Duration::from_secs(3600))
        .await
        .unwrap()
        .is_empty());

    let recovered = manager.recover_stale_jobs(Duration::ZERO).await.unwrap();
    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered[0].id, started.job.id);
    assert_eq!(
        recovered[0].error.as_ref().unwrap().kind,
        FailureKind::Interrupted
    );

    // Executing the interrupted job can no longer complete it.
    let err = manager
        .execute(started, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        JobError::Store(StoreError::InvalidTransition { .. })
    ));
}

/// Delegates to a memory store but refuses to record completion.
struct CompletionFails(MemoryJobStore);

#[async_trait]
impl JobStore for CompletionFails {
    async fn create_job(&self, new_job: NewJob) -> Result<Job, StoreError> {
        self.0.create_job(new_job).await
    }
    async fn start_job(&self, id: Uuid) -> Result<Job, StoreError> {
        self.0.start_job(id).await
    }
    async fn create_running_job(&self, new_job: NewJob) -> Result<Job, StoreError> {
        self.0.create_running_job(new_job).await
    }
    async fn complete_job(
        &self,
        _id: Uuid,
        _profile: &StyleProfile,
        _scores: &ChunkScores,
    ) -> Result<Job, StoreError> {
        Err(StoreError::Backend("disk full".to_string()))
    }
    async fn fail_job(&self, id: Uuid, failure: &JobFailure) -> Result<Job, StoreError> {
        self.0.fail_job(id, failure).await
    }
    async fn set_notification_state(
        &self,
        id: Uuid,
        state: NotificationState,
    ) -> Result<Job, StoreError> {
        self.0.set_notification_state(id, state).await
    }
    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError> {
        self.0.get_job(id).await
    }
    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        self.0.list_jobs(limit).await
    }
    async fn list_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>, StoreError> {
        self.0.list_stale_jobs(cutoff).await
    }
}

#[tokio::test]
async fn persistence_failure_fails_the_job() {
    let fx = Fixture::new();
    let manager = fx.manager_with_store(Arc::new(CompletionFails(MemoryJobStore::new())));

    let job = manager
        .run(trigger("proj-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(job.state, JobState::Failed);
    let error = job.error.unwrap();
    assert_eq!(error.kind, FailureKind::Persistence);
    assert!(error.message.contains("disk full"));
}

#[tokio::test]
async fn spawned_jobs_for_different_projects_run_in_parallel() {
    let fx = Fixture::new();
    let manager = Arc::new(fx.manager());

    let mut handles = Vec::new();
    for project in ["a", "b", "c"] {
        let started = manager.start(trigger(project)).await.unwrap();
        handles.push(manager.spawn(started, CancellationToken::new()));
    }
    for handle in handles {
        let job = handle.await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
    }
    assert_eq!(manager.list(10).await.unwrap().len(), 3);
}

/// Rejects the first job insert and refuses the two-step create path.
struct FirstStartFails {
    inner: MemoryJobStore,
    failed_once: AtomicBool,
}

#[async_trait]
impl JobStore for FirstStartFails {
    async fn create_job(&self, _new_job: NewJob) -> Result<Job, StoreError> {
        Err(StoreError::Backend("pending-only insert".to_string()))
    }
    async fn start_job(&self, _id: Uuid) -> Result<Job, StoreError> {
        Err(StoreError::Backend("separate start write".to_string()))
    }
    async fn create_running_job(&self, new_job: NewJob) -> Result<Job, StoreError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Backend("transient".to_string()));
        }
        self.inner.create_running_job(new_job).await
    }
    async fn complete_job(
        &self,
        id: Uuid,
        profile: &StyleProfile,
        scores: &ChunkScores,
    ) -> Result<Job, StoreError> {
        self.inner.complete_job(id, profile, scores).await
    }
    async fn fail_job(&self, id: Uuid, failure: &JobFailure) -> Result<Job, StoreError> {
        self.inner.fail_job(id, failure).await
    }
    async fn set_notification_state(
        &self,
        id: Uuid,
        state: NotificationState,
    ) -> Result<Job, StoreError> {
        self.inner.set_notification_state(id, state).await
    }
    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError> {
        self.inner.get_job(id).await
    }
    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        self.inner.list_jobs(limit).await
    }
    async fn list_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>, StoreError> {
        self.inner.list_stale_jobs(cutoff).await
    }
}

#[tokio::test]
async fn failed_start_write_leaves_project_free() {
    let fx = Fixture::new();
    let store = Arc::new(FirstStartFails {
        inner: MemoryJobStore::new(),
        failed_once: AtomicBool::new(false),
    });
    let manager = fx.manager_with_store(Arc::clone(&store) as Arc<dyn JobStore>);

    let err = manager.start(trigger("p")).await.unwrap_err();
    assert!(matches!(err, JobError::Store(StoreError::Backend(_))), "{err}");
    assert!(manager.list(10).await.unwrap().is_empty());
    assert!(manager
        .recover_stale_jobs(Duration::ZERO)
        .await
        .unwrap()
        .is_empty());

    let started = manager.start(trigger("p")).await.expect("project slot is free");
    assert_eq!(started.job.state, JobState::Running);
    assert_eq!(
        store.inner.history(started.job.id),
        vec![JobState::Pending, JobState::Running]
    );
}

/// Sleeps before answering so a job stays in flight for a while.
struct Slow(SectionName);

#[async_trait]
impl AnalysisCapability for Slow {
    fn section(&self) -> SectionName {
        self.0
    }

    async fn analyze(&self, _transcript: &str) -> Result<Vec<String>, AnalysisError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(vec!["first finding".to_string(), "second finding".to_string()])
    }
}

/// One capability at a time, so cancellation lands between them.
fn slow_pipeline() -> AgentPipeline {
    let capabilities = SectionName::ALL
        .into_iter()
        .map(|name| Arc::new(Slow(name)) as Arc<dyn AnalysisCapability>)
        .collect();
    AgentPipeline::new(capabilities, Duration::from_secs(5), 1)
}

#[tokio::test]
async fn drain_lets_cancelled_jobs_record_failure() {
    let fx = Fixture::new();
    let manager = Arc::new(fx.manager().with_pipeline(slow_pipeline()));
    let token = CancellationToken::new();

    let started = manager.start(trigger("proj-1")).await.unwrap();
    let job_id = started.job.id;
    let _handle = manager.spawn(started, token.child_token());
    tokio::time::sleep(Duration::from_millis(20)).await;

    token.cancel();
    assert!(manager.drain(Duration::from_secs(5)).await);

    let job = manager.get(job_id).await.unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error.unwrap().kind, FailureKind::Cancelled);

    // The project is free again for the next trigger.
    manager.start(trigger("proj-1")).await.unwrap();
}

#[tokio::test]
async fn drain_reports_jobs_still_running_after_grace() {
    let fx = Fixture::new();
    let manager = Arc::new(fx.manager().with_pipeline(slow_pipeline()));

    let started = manager.start(trigger("proj-1")).await.unwrap();
    let job_id = started.job.id;
    let _handle = manager.spawn(started, CancellationToken::new());

    assert!(!manager.drain(Duration::from_millis(10)).await);
    assert_eq!(manager.get(job_id).await.unwrap().state, JobState::Running);
}
