//! Per-chunk numeric scores and the `chunk_scores.json` mapping.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Bounded scores for a single chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkScore {
    pub emotional_tone_score: f64,
    pub relatability_score: f64,
    #[serde(default)]
    pub theme_tags: BTreeSet<String>,
}

impl ChunkScore {
    /// The score assigned to a chunk that could not be scored.
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            emotional_tone_score: 0.0,
            relatability_score: 0.0,
            theme_tags: BTreeSet::new(),
        }
    }

    /// Build a score from raw values, clamping to `[0, 1]` and rounding to two
    /// decimal places. Non-finite values become `0.0`.
    #[must_use]
    pub fn bounded(emotional_tone: f64, relatability: f64, theme_tags: BTreeSet<String>) -> Self {
        Self {
            emotional_tone_score: normalize_score(emotional_tone),
            relatability_score: normalize_score(relatability),
            theme_tags,
        }
    }
}

/// Clamp to `[0, 1]` and round to 2 dp.
#[must_use]
pub fn normalize_score(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    (raw.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// `chunk_id -> ChunkScore`, ordered by chunk id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkScores(BTreeMap<String, ChunkScore>);

impl ChunkScores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a score, returning the previous one if the id was already
    /// present.
    pub fn insert(&mut self, chunk_id: impl Into<String>, score: ChunkScore) -> Option<ChunkScore> {
        self.0.insert(chunk_id.into(), score)
    }

    #[must_use]
    pub fn get(&self, chunk_id: &str) -> Option<&ChunkScore> {
        self.0.get(chunk_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn chunk_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChunkScore)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ChunkScore)> for ChunkScores {
    fn from_iter<I: IntoIterator<Item = (String, ChunkScore)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_and_rounds() {
        assert!((normalize_score(1.7) - 1.0).abs() < f64::EPSILON);
        assert!(normalize_score(-0.3).abs() < f64::EPSILON);
        assert!((normalize_score(0.456) - 0.46).abs() < f64::EPSILON);
        assert!(normalize_score(f64::NAN).abs() < f64::EPSILON);
        assert!(normalize_score(f64::INFINITY).abs() < f64::EPSILON);
    }

    #[test]
    fn zeroed_score_has_no_tags() {
        let score = ChunkScore::zeroed();
        assert!(score.emotional_tone_score.abs() < f64::EPSILON);
        assert!(score.relatability_score.abs() < f64::EPSILON);
        assert!(score.theme_tags.is_empty());
    }

    #[test]
    fn scores_serialize_as_flat_mapping() {
        let mut scores = ChunkScores::new();
        scores.insert(
            "chunk_02",
            ChunkScore::bounded(0.5, 0.4, BTreeSet::from(["growth".to_string()])),
        );
        scores.insert("chunk_01", ChunkScore::zeroed());

        let json = serde_json::to_value(&scores).unwrap();
        assert_eq!(json["chunk_02"]["emotional_tone_score"], 0.5);
        assert_eq!(json["chunk_02"]["theme_tags"][0], "growth");
        assert_eq!(json["chunk_01"]["relatability_score"], 0.0);

        let ids: Vec<&str> = scores.chunk_ids().collect();
        assert_eq!(ids, vec!["chunk_01", "chunk_02"]);
    }

    #[test]
    fn scores_artifact_round_trips() {
        let scores: ChunkScores = [
            (
                "chunk_06".to_string(),
                ChunkScore::bounded(
                    0.734_9,
                    0.6,
                    BTreeSet::from(["resilience".to_string(), "growth".to_string()]),
                ),
            ),
            (
                "chunk_07".to_string(),
                ChunkScore::bounded(0.31, 0.8, BTreeSet::from(["self_doubt".to_string()])),
            ),
        ]
        .into_iter()
        .collect();

        let text = serde_json::to_string_pretty(&scores).unwrap();
        let parsed: ChunkScores = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, scores);
        assert_eq!(serde_json::to_string_pretty(&parsed).unwrap(), text);
    }

    #[test]
    fn missing_theme_tags_deserialize_as_empty() {
        let parsed: ChunkScores = serde_json::from_str(
            r#"{"chunk_01":{"emotional_tone_score":0.2,"relatability_score":0.4}}"#,
        )
        .unwrap();
        assert!(parsed.get("chunk_01").unwrap().theme_tags.is_empty());
    }
}
