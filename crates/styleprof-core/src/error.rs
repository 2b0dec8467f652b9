use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors raised while turning a transcript reference into parsed chunks.
///
/// Every variant is an input error: a job whose transcript fails here never
/// reaches `running`.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript reference is empty")]
    EmptyReference,

    #[error("transcript not readable at {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transcript {0} is empty")]
    Empty(String),

    #[error("transcript has no chunk headers")]
    NoChunks,
}

/// A trigger request that is missing a required field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
