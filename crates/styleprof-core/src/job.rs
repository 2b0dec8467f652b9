//! Job lifecycle types shared by the store, the manager, and the API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TriggerError;
use crate::profile::{MissingSection, StyleProfile};
use crate::scores::ChunkScores;

/// Lifecycle state of a job.
///
/// `Pending -> Running -> Completed | Failed`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Pending or running: the states that hold a project's slot.
    #[must_use]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    #[must_use]
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Running, JobState::Completed | JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state '{other}'")),
        }
    }
}

/// Delivery status of the completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationState {
    NotSent,
    Delivered,
    Exhausted,
}

impl NotificationState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationState::NotSent => "not_sent",
            NotificationState::Delivered => "delivered",
            NotificationState::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for NotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_sent" => Ok(NotificationState::NotSent),
            "delivered" => Ok(NotificationState::Delivered),
            "exhausted" => Ok(NotificationState::Exhausted),
            other => Err(format!("unknown notification state '{other}'")),
        }
    }
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Input,
    PipelineExhausted,
    Persistence,
    Cancelled,
    Interrupted,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Input => "input",
            FailureKind::PipelineExhausted => "pipeline_exhausted",
            FailureKind::Persistence => "persistence",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(FailureKind::Input),
            "pipeline_exhausted" => Ok(FailureKind::PipelineExhausted),
            "persistence" => Ok(FailureKind::Persistence),
            "cancelled" => Ok(FailureKind::Cancelled),
            "interrupted" => Ok(FailureKind::Interrupted),
            other => Err(format!("unknown failure kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Caller-facing summary of where a job ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Pending,
    Running,
    Succeeded,
    SucceededPartial,
    Failed,
}

/// A profiling job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub project_id: String,
    pub client_id: String,
    pub display_name: Option<String>,
    pub transcript_ref: String,
    pub state: JobState,
    pub notification_state: NotificationState,
    /// 1 for the first run of a project, incremented on each retry.
    pub attempt: u32,
    pub retry_of: Option<Uuid>,
    /// Present only when `state == Failed`.
    pub error: Option<JobFailure>,
    /// Present only when `state == Completed`.
    pub profile: Option<StyleProfile>,
    /// Present only when `state == Completed`.
    pub scores: Option<ChunkScores>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    #[must_use]
    pub fn outcome(&self) -> JobOutcome {
        match self.state {
            JobState::Pending => JobOutcome::Pending,
            JobState::Running => JobOutcome::Running,
            JobState::Failed => JobOutcome::Failed,
            JobState::Completed => {
                if self.is_partial() {
                    JobOutcome::SucceededPartial
                } else {
                    JobOutcome::Succeeded
                }
            }
        }
    }

    /// True when the job completed with at least one missing section.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| !p.is_complete())
    }

    #[must_use]
    pub fn missing_sections(&self) -> &[MissingSection] {
        self.profile.as_ref().map_or(&[], StyleProfile::missing)
    }
}

/// Fields needed to insert a new `Pending` job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub project_id: String,
    pub client_id: String,
    pub display_name: Option<String>,
    pub transcript_ref: String,
    pub attempt: u32,
    pub retry_of: Option<Uuid>,
}

/// An external request to profile one transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub transcript_ref: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TriggerRequest {
    /// Trim fields, reject blank required ones, and default `client_id` to
    /// `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::MissingField`] when `projectId` or
    /// `transcriptRef` is blank.
    pub fn normalized(self) -> Result<Self, TriggerError> {
        let project_id = self.project_id.trim().to_string();
        if project_id.is_empty() {
            return Err(TriggerError::MissingField("projectId"));
        }
        let transcript_ref = self.transcript_ref.trim().to_string();
        if transcript_ref.is_empty() {
            return Err(TriggerError::MissingField("transcriptRef"));
        }
        let client_id = match self.client_id.trim() {
            "" => project_id.clone(),
            other => other.to_string(),
        };
        let display_name = self
            .display_name
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            project_id,
            client_id,
            transcript_ref,
            display_name,
        })
    }
}
