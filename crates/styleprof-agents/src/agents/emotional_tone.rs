//! Emotional register: overall polarity, dominant emotions, transitions.

use async_trait::async_trait;
use styleprof_core::SectionName;
use styleprof_scoring::{affect, Affect};

use crate::capability::{with_fallbacks, AnalysisCapability};
use crate::error::AnalysisError;
use crate::text::{contains_any, segments, tokenize, word_set};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emotion {
    Joy,
    Optimism,
    Determination,
    Reflection,
    Concern,
    Gratitude,
}

const EMOTION_INDICATORS: &[(Emotion, &[&str])] = &[
    (
        Emotion::Joy,
        &["happy", "excited", "love", "wonderful", "amazing"],
    ),
    (
        Emotion::Optimism,
        &["hope", "believe", "positive", "better", "future"],
    ),
    (
        Emotion::Determination,
        &["will", "must", "determined", "committed", "decided", "refused"],
    ),
    (
        Emotion::Reflection,
        &["think", "realize", "understand", "learned", "know"],
    ),
    (
        Emotion::Concern,
        &["worried", "concerned", "afraid", "fear", "anxious", "doubt"],
    ),
    (
        Emotion::Gratitude,
        &["thankful", "grateful", "appreciate", "blessed", "lucky"],
    ),
];

/// Share of segments an emotion must appear in, as `(numerator, denominator)`,
/// and the finding it produces.
const DOMINANT: &[(Emotion, usize, usize, &str)] = &[
    (Emotion::Optimism, 3, 10, "Consistently optimistic undertone"),
    (Emotion::Reflection, 3, 10, "Deeply reflective and self-aware"),
    (Emotion::Determination, 2, 10, "Strong sense of determination"),
    (Emotion::Gratitude, 1, 10, "Expresses genuine gratitude"),
    (Emotion::Joy, 3, 10, "Finds genuine joy in the work"),
    (Emotion::Concern, 3, 10, "Open about worries and vulnerability"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct EmotionalToneAnalyzer;

impl EmotionalToneAnalyzer {
    fn overall_tone(a: Affect) -> Vec<String> {
        let mut findings = Vec::new();
        let headline = if a.compound > 0.5 {
            "Predominantly optimistic and positive outlook"
        } else if a.compound > 0.2 {
            "Generally hopeful with balanced perspective"
        } else if a.compound > -0.2 {
            "Measured and pragmatic emotional tone"
        } else {
            "Reflective and growth-focused perspective"
        };
        findings.push(headline.to_string());

        if a.neutral > 0.7 {
            findings.push("Maintains composed, even-keeled emotional state".to_string());
        }
        if a.positive > 0.3 && a.negative > 0.1 {
            findings.push("Comfortable expressing full range of emotions".to_string());
        }
        findings
    }

    fn dominant_emotions(segs: &[&str]) -> Vec<String> {
        let per_segment: Vec<Vec<Emotion>> = segs
            .iter()
            .map(|seg| {
                let tokens = tokenize(seg);
                let words = word_set(&tokens);
                EMOTION_INDICATORS
                    .iter()
                    .filter(|(_, indicators)| contains_any(&words, indicators))
                    .map(|(emotion, _)| *emotion)
                    .collect()
            })
            .collect();

        DOMINANT
            .iter()
            .filter(|(emotion, num, den, _)| {
                let count = per_segment.iter().filter(|e| e.contains(emotion)).count();
                count > 0 && count * den > segs.len() * num
            })
            .map(|(_, _, _, finding)| (*finding).to_string())
            .collect()
    }

    fn transitions(segs: &[&str]) -> Vec<String> {
        let mut findings = Vec::new();
        if segs.len() < 3 {
            return findings;
        }
        let arc: Vec<f64> = segs.iter().map(|s| affect(s).compound).collect();
        #[allow(clippy::cast_precision_loss)]
        let avg_change = arc.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>()
            / (arc.len() - 1) as f64;

        let flow = if avg_change > 0.5 {
            "Dynamic emotional range with clear transitions"
        } else if avg_change > 0.3 {
            "Natural emotional flow with gentle transitions"
        } else {
            "Consistent emotional stability throughout"
        };
        findings.push(flow.to_string());

        let lowest = arc.iter().copied().fold(f64::MAX, f64::min);
        if arc[arc.len() - 1] > 0.0 && lowest < 0.0 {
            findings.push("Demonstrates emotional resilience and growth".to_string());
        }
        findings
    }
}

#[async_trait]
impl AnalysisCapability for EmotionalToneAnalyzer {
    fn section(&self) -> SectionName {
        SectionName::EmotionalTone
    }

    async fn analyze(&self, transcript: &str) -> Result<Vec<String>, AnalysisError> {
        self.validate_input(transcript)?;

        let segs = segments(transcript);
        let mut findings = Self::overall_tone(affect(transcript));
        findings.extend(Self::dominant_emotions(&segs));
        findings.extend(Self::transitions(&segs));

        Ok(with_fallbacks(
            findings,
            &["Expresses emotion with restraint"],
        ))
    }
}
