//! Core principles: explicit value words, decisions, and stated priorities.

use async_trait::async_trait;
use styleprof_core::SectionName;

use crate::capability::{with_fallbacks, AnalysisCapability};
use crate::error::AnalysisError;
use crate::text::{contains_any, segments, sentences, tokenize, word_set};

const VALUE_INDICATORS: &[(&[&str], &str)] = &[
    (
        &["honest", "truth", "integrity", "authentic", "genuine"],
        "Values authenticity and truth",
    ),
    (
        &["learn", "grow", "improve", "develop", "progress"],
        "Commitment to continuous growth",
    ),
    (
        &["brave", "courage", "bold", "risk", "fear"],
        "Embraces courage over comfort",
    ),
    (
        &["create", "innovate", "imagine", "original", "unique"],
        "Prioritizes creative expression",
    ),
    (
        &["connect", "relationship", "community", "together", "share"],
        "Values meaningful connections",
    ),
    (
        &["freedom", "independent", "choice", "decide", "control"],
        "Prizes personal autonomy",
    ),
    (
        &["impact", "difference", "change", "help", "serve"],
        "Driven by meaningful impact",
    ),
    (
        &["quality", "excellence", "best", "standard", "perfect"],
        "Strives for excellence",
    ),
];

const DECISIONS: &[&str] = &["chose", "decided", "picked", "selected", "opted"];
const PRIORITIES: &[&str] = &["important", "matters", "priority", "believe", "must"];

/// `" over "` statements and the finding each topic maps to.
const TRADEOFFS: &[(&[&str], &str)] = &[
    (&["truth", "honest"], "Truth over comfort"),
    (&["quality", "excellence"], "Quality over quantity"),
    (&["purpose", "meaning"], "Purpose over profit"),
    (&["learn", "grow"], "Growth over stability"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ValuesIdentifier;

impl ValuesIdentifier {
    fn implicit_values(segment: &str) -> Vec<String> {
        let tokens = tokenize(segment);
        let words = word_set(&tokens);
        let mut found = Vec::new();

        if contains_any(&words, DECISIONS) {
            if contains_any(&words, &["right", "truth"]) {
                found.push("Chooses integrity over convenience".to_string());
            }
            if contains_any(&words, &["hard", "difficult"]) {
                found.push("Values growth over comfort".to_string());
            }
        }
        if contains_any(&words, PRIORITIES) {
            if contains_any(&words, &["people", "others"]) {
                found.push("Prioritizes human connection".to_string());
            }
            if contains_any(&words, &["quality", "excellence"]) {
                found.push("Values excellence in craft".to_string());
            }
        }
        found
    }

    fn stated_tradeoffs(segment: &str) -> Vec<String> {
        let mut found = Vec::new();
        for sentence in sentences(segment) {
            let lowered = sentence.to_lowercase();
            if !lowered.contains(" over ") {
                continue;
            }
            for (topics, finding) in TRADEOFFS {
                if topics.iter().any(|t| lowered.contains(t)) {
                    found.push((*finding).to_string());
                }
            }
        }
        found
    }
}

#[async_trait]
impl AnalysisCapability for ValuesIdentifier {
    fn section(&self) -> SectionName {
        SectionName::Values
    }

    async fn analyze(&self, transcript: &str) -> Result<Vec<String>, AnalysisError> {
        self.validate_input(transcript)?;

        let tokens = tokenize(transcript);
        let words = word_set(&tokens);

        let mut findings: Vec<String> = VALUE_INDICATORS
            .iter()
            .filter(|(indicators, _)| contains_any(&words, indicators))
            .map(|(_, finding)| (*finding).to_string())
            .collect();

        for segment in segments(transcript) {
            findings.extend(Self::implicit_values(segment));
            findings.extend(Self::stated_tradeoffs(segment));
        }

        Ok(with_fallbacks(
            findings,
            &[
                "Values candor in sharing their story",
                "Guided by personal conviction",
            ],
        ))
    }
}
