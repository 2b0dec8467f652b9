//! Completion notifications for finished profiling jobs.
//!
//! A [`Notifier`] POSTs a [`CompletionEvent`] to the downstream webhook and
//! retries failures under an explicit [`RetryPolicy`].

pub mod error;
pub mod notifier;
pub mod retry;

pub use error::NotifyError;
pub use notifier::{ArtifactPointers, CompletionEvent, Notifier, EVENT_SOURCE};
pub use retry::{retry_with_backoff, Attempted, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
