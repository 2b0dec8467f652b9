//! HTTP delivery of job-completion events to the downstream webhook.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NotifyError;
use crate::retry::{retry_with_backoff, RetryPolicy, Sleeper, TokioSleeper};

/// Value of the `source` field on every event.
pub const EVENT_SOURCE: &str = "style_profiler";

/// Locations of the artifacts a completed job wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPointers {
    pub profile: String,
    pub profile_meta: String,
    pub scores: String,
}

/// The JSON body POSTed on job completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub job_id: Uuid,
    pub project_id: String,
    pub client_id: String,
    pub source: String,
    pub status: String,
    /// True when the profile is missing at least one section.
    pub partial: bool,
    pub artifacts: ArtifactPointers,
}

impl CompletionEvent {
    #[must_use]
    pub fn completed(
        job_id: Uuid,
        project_id: &str,
        client_id: &str,
        partial: bool,
        artifacts: ArtifactPointers,
    ) -> Self {
        Self {
            job_id,
            project_id: project_id.to_string(),
            client_id: client_id.to_string(),
            source: EVENT_SOURCE.to_string(),
            status: "completed".to_string(),
            partial,
            artifacts,
        }
    }
}

/// Delivers [`CompletionEvent`]s with bounded retry.
///
/// Every non-2xx status, timeout, or connection failure is retried until the
/// [`RetryPolicy`] is used up.
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    url: Url,
    api_key: Option<String>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Build a notifier for `url`. `timeout` bounds each attempt.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::InvalidUrl`] if `url` does not parse.
    /// - [`NotifyError::Http`] if the HTTP client cannot be constructed.
    pub fn new(
        url: &str,
        api_key: Option<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self, NotifyError> {
        let parsed = Url::parse(url).map_err(|e| NotifyError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("styleprof/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: parsed,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the back-off sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver `event`, retrying per the policy.
    ///
    /// Returns the number of attempts made on success.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Exhausted`] when no attempt succeeded.
    pub async fn deliver(&self, event: &CompletionEvent) -> Result<u32, NotifyError> {
        let outcome = retry_with_backoff(
            &self.policy,
            self.sleeper.as_ref(),
            |_: &NotifyError| true,
            |attempt| self.send_once(event, attempt),
        )
        .await;

        match outcome.result {
            Ok(()) => {
                tracing::info!(
                    job_id = %event.job_id,
                    project_id = %event.project_id,
                    attempts = outcome.attempts,
                    "completion notification delivered"
                );
                Ok(outcome.attempts)
            }
            Err(e) => {
                tracing::error!(
                    job_id = %event.job_id,
                    project_id = %event.project_id,
                    attempts = outcome.attempts,
                    error = %e,
                    "completion notification exhausted retries"
                );
                Err(NotifyError::Exhausted {
                    attempts: outcome.attempts,
                    last_error: e.to_string(),
                })
            }
        }
    }

    async fn send_once(&self, event: &CompletionEvent, attempt: u32) -> Result<(), NotifyError> {
        tracing::debug!(job_id = %event.job_id, attempt, "sending completion notification");

        let mut request = self.client.post(self.url.clone()).json(event);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> CompletionEvent {
        CompletionEvent::completed(
            Uuid::nil(),
            "proj-1",
            "client-1",
            false,
            ArtifactPointers {
                profile: "out/style-profile.md".to_string(),
                profile_meta: "out/style-profile.meta.json".to_string(),
                scores: "out/chunk_scores.json".to_string(),
            },
        )
    }

    #[test]
    fn event_serializes_camel_case() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["projectId"], "proj-1");
        assert_eq!(json["clientId"], "client-1");
        assert_eq!(json["source"], "style_profiler");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["partial"], false);
        assert_eq!(json["artifacts"]["profileMeta"], "out/style-profile.meta.json");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result = Notifier::new(
            "not a url",
            None,
            Duration::from_secs(1),
            RetryPolicy::default(),
        );
        assert!(matches!(result, Err(NotifyError::InvalidUrl { .. })));
    }

    #[test]
    fn debug_redacts_api_key() {
        let notifier = Notifier::new(
            "http://localhost:9/hook",
            Some("super-secret".to_string()),
            Duration::from_secs(1),
            RetryPolicy::default(),
        )
        .unwrap();
        let rendered = format!("{notifier:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
