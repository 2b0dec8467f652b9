use async_trait::async_trait;
use styleprof_core::profile::MIN_FINDINGS;
use styleprof_core::SectionName;

use crate::error::AnalysisError;

/// One independent analysis of a speaker-filtered transcript.
///
/// Implementations see only the transcript text (one chunk per line) and never
/// another capability's output. Findings are raw strings; formatting into
/// bullets happens in the pipeline.
#[async_trait]
pub trait AnalysisCapability: Send + Sync {
    /// The profile section this capability produces.
    fn section(&self) -> SectionName;

    /// Produce findings for the whole transcript.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] when no findings can be produced.
    async fn analyze(&self, transcript: &str) -> Result<Vec<String>, AnalysisError>;

    /// Reject input before doing any work.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyTranscript`] for blank text.
    fn validate_input(&self, transcript: &str) -> Result<(), AnalysisError> {
        if transcript.trim().is_empty() {
            Err(AnalysisError::EmptyTranscript)
        } else {
            Ok(())
        }
    }
}

/// Drop repeated findings, then top up from `fallbacks` until at least
/// [`MIN_FINDINGS`] distinct entries remain.
pub(crate) fn with_fallbacks(findings: Vec<String>, fallbacks: &[&str]) -> Vec<String> {
    let mut findings = findings.into_iter().fold(Vec::new(), |mut acc: Vec<String>, f| {
        if !acc.contains(&f) {
            acc.push(f);
        }
        acc
    });
    for fallback in fallbacks {
        if findings.len() >= MIN_FINDINGS {
            break;
        }
        if !findings.iter().any(|f| f == fallback) {
            findings.push((*fallback).to_string());
        }
    }
    findings
}
