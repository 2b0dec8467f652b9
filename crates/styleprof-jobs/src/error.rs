use std::path::PathBuf;

use styleprof_core::{JobState, TranscriptError, TriggerError};
use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a [`crate::JobStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {id} is not in expected state '{expected}'")]
    InvalidTransition { id: Uuid, expected: &'static str },

    #[error("project '{project_id}' already has an active job")]
    Conflict { project_id: String },

    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job store backend error: {0}")]
    Backend(String),
}

/// Failures writing the profile and score artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by [`crate::JobManager`] to its callers.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid trigger: {0}")]
    Trigger(#[from] TriggerError),

    #[error("invalid transcript: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("project '{project_id}' already has an active job")]
    Conflict { project_id: String },

    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {id} is {state}; only failed jobs can be retried")]
    NotRetryable { id: Uuid, state: JobState },

    #[error(transparent)]
    Store(StoreError),
}

impl JobError {
    /// True for errors caused by the caller's input; no job record exists.
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, JobError::Trigger(_) | JobError::Transcript(_))
    }
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { project_id } => JobError::Conflict { project_id },
            StoreError::NotFound(id) => JobError::NotFound(id),
            other => JobError::Store(other),
        }
    }
}
