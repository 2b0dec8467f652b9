use thiserror::Error;

/// Why a [`crate::FeatureExtractor`] could not score a chunk.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("feature extraction failed: {0}")]
    Extraction(String),
}

/// The only way [`crate::ChunkScorer::score_chunks`] fails; extraction
/// problems fall back to zeroed scores instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("scoring cancelled before every chunk was scored")]
pub struct ScoringCancelled;
