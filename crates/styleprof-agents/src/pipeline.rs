//! Runs every capability over one transcript and assembles the profile.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, FutureExt, StreamExt};
use styleprof_core::{format_finding, AnalysisSection, MissingSection, SectionName, StyleProfile};
use tokio_util::sync::CancellationToken;

use crate::agents::default_capabilities;
use crate::capability::AnalysisCapability;
use crate::error::{AnalysisError, PipelineError};

/// Result of one capability run, before assembly.
enum SectionOutcome {
    Produced(AnalysisSection),
    Missing(MissingSection),
    Skipped(SectionName),
}

/// Runs a registry of capabilities concurrently with per-capability timeouts.
#[derive(Clone)]
pub struct AgentPipeline {
    capabilities: Vec<Arc<dyn AnalysisCapability>>,
    timeout: Duration,
    concurrency: usize,
}

impl std::fmt::Debug for AgentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sections: Vec<SectionName> = self.capabilities.iter().map(|c| c.section()).collect();
        f.debug_struct("AgentPipeline")
            .field("sections", &sections)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Default for AgentPipeline {
    fn default() -> Self {
        Self::new(default_capabilities(), Duration::from_secs(30), 5)
    }
}

impl AgentPipeline {
    #[must_use]
    pub fn new(
        capabilities: Vec<Arc<dyn AnalysisCapability>>,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            capabilities,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Run every capability against `transcript` and assemble the results
    /// in canonical order.
    ///
    /// A failing capability becomes a [`MissingSection`] and the profile is
    /// marked partial. Cancellation is checked before each capability
    /// starts.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Cancelled`] if `cancel` fired before every
    ///   capability started.
    /// - [`PipelineError::Exhausted`] if no capability produced a section.
    pub async fn run(
        &self,
        transcript: Arc<str>,
        cancel: &CancellationToken,
    ) -> Result<StyleProfile, PipelineError> {
        // Plain futures, not a borrowing closure, so the run stays `Send`.
        let pending: Vec<_> = self
            .capabilities
            .iter()
            .map(|capability| {
                self.outcome(Arc::clone(capability), Arc::clone(&transcript), cancel)
            })
            .collect();
        let outcomes: Vec<SectionOutcome> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut sections = Vec::new();
        let mut missing = Vec::new();
        let mut skipped = 0usize;
        for outcome in outcomes {
            match outcome {
                SectionOutcome::Produced(section) => sections.push(section),
                SectionOutcome::Missing(m) => missing.push(m),
                SectionOutcome::Skipped(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "pipeline cancelled");
            return Err(PipelineError::Cancelled);
        }
        if sections.is_empty() {
            return Err(PipelineError::Exhausted {
                missing: StyleProfile::assemble(Vec::new(), missing)
                    .missing()
                    .to_vec(),
            });
        }

        let profile = StyleProfile::assemble(sections, missing);
        tracing::info!(
            sections = profile.sections().len(),
            complete = profile.is_complete(),
            "profile assembled"
        );
        Ok(profile)
    }

    async fn outcome(
        &self,
        capability: Arc<dyn AnalysisCapability>,
        transcript: Arc<str>,
        cancel: &CancellationToken,
    ) -> SectionOutcome {
        let name = capability.section();
        if cancel.is_cancelled() {
            return SectionOutcome::Skipped(name);
        }
        match self.run_one(capability.as_ref(), &transcript).await {
            Ok(section) => SectionOutcome::Produced(section),
            Err(e) => {
                tracing::warn!(section = %name, error = %e, "capability failed");
                SectionOutcome::Missing(MissingSection {
                    name,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn run_one(
        &self,
        capability: &dyn AnalysisCapability,
        transcript: &str,
    ) -> Result<AnalysisSection, AnalysisError> {
        let name = capability.section();
        let call = AssertUnwindSafe(capability.analyze(transcript)).catch_unwind();
        let findings = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_panic)) => return Err(AnalysisError::Panicked),
            Err(_elapsed) => return Err(AnalysisError::TimedOut(self.timeout)),
        };

        AnalysisSection::from_findings(name, &findings).ok_or_else(|| {
            let usable: HashSet<String> = findings
                .iter()
                .map(|f| format_finding(f))
                .filter(|f| !f.is_empty())
                .collect();
            AnalysisError::TooFewFindings {
                found: usable.len(),
            }
        })
    }
}
