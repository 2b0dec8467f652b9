//! Shared domain types for the style profiler: configuration, the chunked
//! transcript model, profiles, scores, and job lifecycle records.

pub mod app_config;
pub mod config;
pub mod error;
pub mod job;
pub mod profile;
pub mod scores;
pub mod transcript;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, TranscriptError, TriggerError};
pub use job::{
    FailureKind, Job, JobFailure, JobOutcome, JobState, NewJob, NotificationState, TriggerRequest,
};
pub use profile::{
    format_finding, AnalysisSection, MissingSection, ProfileMetadata, SectionName, StyleProfile,
};
pub use scores::{normalize_score, ChunkScore, ChunkScores};
pub use transcript::{parse_transcript, ParsedTranscript, TimestampRange, TranscriptChunk};
