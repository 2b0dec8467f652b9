use thiserror::Error;

/// Errors raised while delivering a completion notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Network, TLS, or per-attempt timeout failure from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The configured endpoint is not a usable URL.
    #[error("invalid notification URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Every attempt failed; carries the last failure.
    #[error("notification not delivered after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}
