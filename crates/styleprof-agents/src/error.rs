use std::time::Duration;

use styleprof_core::MissingSection;
use thiserror::Error;

/// Why a single capability produced no section.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("transcript has no analysable speech")]
    EmptyTranscript,

    #[error("analysis failed: {0}")]
    Failed(String),

    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("capability panicked")]
    Panicked,

    #[error("too few usable findings ({found})")]
    TooFewFindings { found: usize },
}

/// Whole-pipeline outcomes that prevent a profile from being produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline cancelled")]
    Cancelled,

    #[error("every capability failed")]
    Exhausted { missing: Vec<MissingSection> },
}
