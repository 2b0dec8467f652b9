//! Central narratives: recurring themes, sentiment arcs, repeated concepts.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use styleprof_core::SectionName;
use styleprof_scoring::affect;

use crate::capability::{with_fallbacks, AnalysisCapability};
use crate::error::AnalysisError;
use crate::text::{is_content_word, segments, tokenize};

/// Theme indicators and the finding reported when a theme recurs.
const THEME_INDICATORS: &[(&[&str], &str)] = &[
    (
        &["learn", "grow", "develop", "improve", "progress", "journey"],
        "Personal growth and continuous learning",
    ),
    (
        &["difficult", "challenge", "obstacle", "struggle", "overcome", "setback"],
        "Navigating challenges and obstacles",
    ),
    (
        &["change", "transition", "shift", "transform", "adapt"],
        "Embracing change and transformation",
    ),
    (
        &["purpose", "meaning", "mission", "calling", "passion"],
        "Finding purpose and meaning",
    ),
    (
        &["team", "people", "connection", "community", "support"],
        "Building meaningful connections",
    ),
    (
        &["accomplish", "achieve", "success", "goal", "milestone"],
        "Setting and achieving goals",
    ),
    (
        &["persist", "endure", "resilient", "bounce", "recover", "refused", "kept"],
        "Demonstrating resilience and persistence",
    ),
    (
        &["authentic", "genuine", "true", "real", "honest"],
        "Maintaining authenticity and genuineness",
    ),
    (
        &["doubt", "doubted", "unsure", "insecure", "imposter"],
        "Candid about self-doubt",
    ),
];

/// Occurrences needed before a theme counts as recurring.
const RECURRENCE: usize = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct ThemeExtractor;

impl ThemeExtractor {
    fn key_themes(tokens: &[String]) -> Vec<String> {
        THEME_INDICATORS
            .iter()
            .filter(|(indicators, _)| {
                tokens
                    .iter()
                    .filter(|t| indicators.contains(&t.as_str()))
                    .count()
                    >= RECURRENCE
            })
            .map(|(_, finding)| (*finding).to_string())
            .collect()
    }

    fn narrative_arcs(segs: &[&str]) -> Vec<String> {
        let mut findings = Vec::new();
        if segs.len() < 3 {
            return findings;
        }
        let arc: Vec<f64> = segs.iter().map(|s| affect(s).compound).collect();
        let first = arc[0];
        let last = arc[arc.len() - 1];
        if first < 0.0 && last > 0.0 {
            findings.push("Journey from challenge to triumph".to_string());
        }
        let max = arc.iter().copied().fold(f64::MIN, f64::max);
        let min = arc.iter().copied().fold(f64::MAX, f64::min);
        if max - min > 1.0 {
            findings.push("Reflective exploration of highs and lows".to_string());
        }
        findings
    }

    /// Content words that show up in more than one segment, most frequent
    /// first.
    fn recurring_concepts(segs: &[&str]) -> Vec<String> {
        let mut seen_in: HashMap<String, usize> = HashMap::new();
        for seg in segs {
            let unique: HashSet<String> = tokenize(seg)
                .into_iter()
                .filter(|w| is_content_word(w))
                .collect();
            for word in unique {
                *seen_in.entry(word).or_default() += 1;
            }
        }

        let mut recurring: Vec<(String, usize)> = seen_in
            .into_iter()
            .filter(|(_, n)| *n >= RECURRENCE)
            .collect();
        recurring.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        recurring
            .into_iter()
            .take(3)
            .map(|(word, _)| format!("Recurring focus on {word}"))
            .collect()
    }
}

#[async_trait]
impl AnalysisCapability for ThemeExtractor {
    fn section(&self) -> SectionName {
        SectionName::Themes
    }

    async fn analyze(&self, transcript: &str) -> Result<Vec<String>, AnalysisError> {
        self.validate_input(transcript)?;

        let segs = segments(transcript);
        let tokens = tokenize(transcript);

        let mut findings = Self::key_themes(&tokens);
        findings.extend(Self::narrative_arcs(&segs));
        findings.extend(Self::recurring_concepts(&segs));

        Ok(with_fallbacks(
            findings,
            &[
                "Centers the conversation on lived experience",
                "Shares perspective through personal narrative",
            ],
        ))
    }
}
