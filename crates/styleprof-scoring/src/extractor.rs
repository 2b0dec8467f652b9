use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;

use crate::error::ScoringError;
use crate::lexicon::{affect, tokenize};
use crate::signals::{relatability, theme_tags};

/// Raw per-chunk features before clamping and rounding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkFeatures {
    pub emotional_tone: f64,
    pub relatability: f64,
    pub theme_tags: BTreeSet<String>,
}

/// Source of affect and relatability signal for one chunk of text.
///
/// Implementations must be deterministic for a given `version()`.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Identifier recorded alongside scores so changes in extraction are
    /// traceable.
    fn version(&self) -> &str;

    /// Extract features from non-empty chunk text.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Extraction`] when the text cannot be scored.
    async fn extract(&self, text: &str) -> Result<ChunkFeatures, ScoringError>;
}

/// Weight of polarity in the emotional tone blend.
const POLARITY_WEIGHT: f64 = 0.7;
/// Weight of intensity in the emotional tone blend.
const INTENSITY_WEIGHT: f64 = 0.3;

/// Default extractor backed by the built-in affect lexicon and keyword tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconExtractor;

impl LexiconExtractor {
    pub const VERSION: &'static str = "lexicon-v1";

    /// Synchronous core of [`FeatureExtractor::extract`].
    #[must_use]
    pub fn features(text: &str) -> ChunkFeatures {
        let a = affect(text);
        let emotional_tone =
            POLARITY_WEIGHT * (a.compound + 1.0) / 2.0 + INTENSITY_WEIGHT * a.intensity();

        let tokens = tokenize(text);
        let words: HashSet<&str> = tokens.iter().map(String::as_str).collect();

        ChunkFeatures {
            emotional_tone,
            relatability: relatability(&words),
            theme_tags: theme_tags(&words),
        }
    }
}

#[async_trait]
impl FeatureExtractor for LexiconExtractor {
    fn version(&self) -> &str {
        Self::VERSION
    }

    async fn extract(&self, text: &str) -> Result<ChunkFeatures, ScoringError> {
        Ok(Self::features(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_text_sits_mid_scale() {
        let f = LexiconExtractor::features("the meeting is on tuesday");
        assert!((f.emotional_tone - 0.35).abs() < 1e-9, "got {}", f.emotional_tone);
    }

    #[test]
    fn charged_positive_text_scores_high() {
        let f = LexiconExtractor::features("I love it, it was amazing and wonderful");
        assert!(f.emotional_tone > 0.7, "got {}", f.emotional_tone);
    }

    #[test]
    fn features_are_deterministic() {
        let text = "When I failed I learned to grow stronger.";
        assert_eq!(
            LexiconExtractor::features(text),
            LexiconExtractor::features(text)
        );
    }

    #[tokio::test]
    async fn trait_impl_delegates_to_features() {
        let text = "We all struggled at first.";
        let via_trait = LexiconExtractor.extract(text).await.unwrap();
        assert_eq!(via_trait, LexiconExtractor::features(text));
        assert_eq!(LexiconExtractor.version(), "lexicon-v1");
    }
}
