//! Per-chunk emotional tone, relatability, and theme scoring.
//!
//! [`ChunkScorer`] drives a pluggable [`FeatureExtractor`] over every chunk of
//! a transcript. The default [`LexiconExtractor`] is deterministic and needs no
//! network access.

pub mod error;
pub mod extractor;
pub mod lexicon;
pub mod scorer;
pub mod signals;

pub use error::{ScoringCancelled, ScoringError};
pub use extractor::{ChunkFeatures, FeatureExtractor, LexiconExtractor};
pub use lexicon::{affect, tokenize, Affect};
pub use scorer::ChunkScorer;
