//! Connection points: shared experiences, universal phrasing, audience fit.

use async_trait::async_trait;
use styleprof_core::SectionName;

use crate::capability::{with_fallbacks, AnalysisCapability};
use crate::error::AnalysisError;
use crate::text::{contains_any, segments, tokenize, word_set};

const EXPERIENCES: &[(&[&str], &str)] = &[
    (
        &["career", "job", "switch", "transition", "industry"],
        "Career changers navigating transitions",
    ),
    (
        &["business", "startup", "founder", "entrepreneur", "launch"],
        "Entrepreneurs building their vision",
    ),
    (
        &["growth", "journey", "learn", "develop", "improve"],
        "Personal growth seekers",
    ),
    (
        &["lead", "team", "manage", "responsibility", "guide"],
        "Emerging and established leaders",
    ),
    (
        &["create", "art", "design", "express", "creative"],
        "Creative professionals and artists",
    ),
    (
        &["stress", "overwhelm", "overwhelmed", "burnout", "balance", "pressure"],
        "Professionals managing work-life balance",
    ),
    (
        &["doubt", "doubted", "insecure", "imposter", "enough"],
        "Anyone who has questioned whether they belong",
    ),
];

/// Phrases matched anywhere in a segment.
const UNIVERSAL_PHRASES: &[(&str, &str)] = &[
    ("everyone", "Universal human experiences"),
    ("we all", "Shared human challenges"),
    ("like you", "Direct audience connection"),
    ("understand", "Empathetic understanding"),
];

const STRUGGLE: &[&str] = &["difficult", "struggle", "struggled", "challenge", "hard", "setback"];
const SUCCESS: &[&str] = &["overcome", "succeed", "achieve", "accomplish", "stronger", "made"];

const AUDIENCES: &[(&str, &str)] = &[
    ("corporate", "Corporate professionals seeking change"),
    ("startup", "Startup founders and entrepreneurs"),
    ("leader", "Leaders and managers"),
    ("expert", "Subject matter experts"),
    ("career", "Career transition phase"),
    ("change", "Major life changes"),
    ("build", "Building something new"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct RelatabilityAssessor;

impl RelatabilityAssessor {
    fn connection_points(segment: &str) -> Vec<String> {
        let lowered = segment.to_lowercase();
        let tokens = tokenize(segment);
        let words = word_set(&tokens);

        let mut found: Vec<String> = UNIVERSAL_PHRASES
            .iter()
            .filter(|(phrase, _)| lowered.contains(phrase))
            .map(|(_, finding)| (*finding).to_string())
            .collect();

        if contains_any(&words, STRUGGLE) && contains_any(&words, SUCCESS) {
            found.push("Relatable journey from struggle to success".to_string());
        }

        found.extend(
            AUDIENCES
                .iter()
                .filter(|(marker, _)| lowered.contains(marker))
                .map(|(_, finding)| (*finding).to_string()),
        );
        found
    }
}

#[async_trait]
impl AnalysisCapability for RelatabilityAssessor {
    fn section(&self) -> SectionName {
        SectionName::Relatability
    }

    async fn analyze(&self, transcript: &str) -> Result<Vec<String>, AnalysisError> {
        self.validate_input(transcript)?;

        let tokens = tokenize(transcript);
        let words = word_set(&tokens);

        let mut findings: Vec<String> = EXPERIENCES
            .iter()
            .filter(|(indicators, _)| contains_any(&words, indicators))
            .map(|(_, finding)| (*finding).to_string())
            .collect();

        for segment in segments(transcript) {
            findings.extend(Self::connection_points(segment));
        }

        Ok(with_fallbacks(
            findings,
            &[
                "Speaks to listeners navigating similar experiences",
                "Grounded, accessible storytelling",
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn struggle_and_success_in_one_segment_is_a_journey() {
        let findings = RelatabilityAssessor
            .analyze("Every setback made me stronger.")
            .await
            .unwrap();
        assert!(findings.contains(&"Relatable journey from struggle to success".to_string()));
    }

    #[tokio::test]
    async fn universal_phrases_and_audiences_are_found() {
        let findings = RelatabilityAssessor
            .analyze("We all start somewhere.\nI left my corporate career to build a startup.")
            .await
            .unwrap();
        assert!(findings.contains(&"Shared human challenges".to_string()));
        assert!(findings.contains(&"Corporate professionals seeking change".to_string()));
        assert!(findings.contains(&"Entrepreneurs building their vision".to_string()));
    }

    #[tokio::test]
    async fn self_doubt_connects_with_listeners() {
        let findings = RelatabilityAssessor
            .analyze("Some days I doubt whether I'm good enough.")
            .await
            .unwrap();
        assert_eq!(findings[0], "Anyone who has questioned whether they belong");
    }
}
