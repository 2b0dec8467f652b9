//! Concurrent per-chunk scoring with timeouts and zeroed fallbacks.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use styleprof_core::{ChunkScore, ChunkScores, TranscriptChunk};
use tokio_util::sync::CancellationToken;

use crate::error::ScoringCancelled;
use crate::extractor::{FeatureExtractor, LexiconExtractor};

/// Scores every chunk of a transcript through a [`FeatureExtractor`].
#[derive(Clone)]
pub struct ChunkScorer {
    extractor: Arc<dyn FeatureExtractor>,
    timeout: Duration,
    concurrency: usize,
}

impl std::fmt::Debug for ChunkScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkScorer")
            .field("extractor", &self.extractor.version())
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Default for ChunkScorer {
    fn default() -> Self {
        Self::new(Arc::new(LexiconExtractor), Duration::from_secs(10), 8)
    }
}

impl ChunkScorer {
    /// `concurrency` below 1 is treated as 1.
    #[must_use]
    pub fn new(extractor: Arc<dyn FeatureExtractor>, timeout: Duration, concurrency: usize) -> Self {
        Self {
            extractor,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    #[must_use]
    pub fn extractor_version(&self) -> &str {
        self.extractor.version()
    }

    /// Score every chunk, returning one entry per input chunk id.
    ///
    /// Chunks with empty text, failed extraction, or an extraction that
    /// outlives the timeout receive [`ChunkScore::zeroed`]. Cancellation is
    /// checked before each chunk starts; a chunk already in flight runs to
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringCancelled`] if `cancel` fired before every
    /// chunk was started.
    pub async fn score_chunks(
        &self,
        chunks: &[TranscriptChunk],
        cancel: &CancellationToken,
    ) -> Result<ChunkScores, ScoringCancelled> {
        let pending: Vec<_> = chunks
            .iter()
            .map(|chunk| self.score_unless_cancelled(chunk, cancel))
            .collect();
        let results: Vec<Option<(String, ChunkScore)>> = futures::stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let total = chunks.len();
        let scored: Vec<(String, ChunkScore)> = results.into_iter().flatten().collect();
        if scored.len() < total {
            tracing::warn!(
                scored = scored.len(),
                total,
                "chunk scoring cancelled"
            );
            return Err(ScoringCancelled);
        }

        Ok(scored.into_iter().collect())
    }

    async fn score_unless_cancelled(
        &self,
        chunk: &TranscriptChunk,
        cancel: &CancellationToken,
    ) -> Option<(String, ChunkScore)> {
        if cancel.is_cancelled() {
            return None;
        }
        Some((chunk.id.clone(), self.score_chunk(chunk).await))
    }

    async fn score_chunk(&self, chunk: &TranscriptChunk) -> ChunkScore {
        if chunk.text.trim().is_empty() {
            tracing::debug!(chunk_id = %chunk.id, "empty chunk scored as zero");
            return ChunkScore::zeroed();
        }

        let extraction = AssertUnwindSafe(self.extractor.extract(&chunk.text)).catch_unwind();
        match tokio::time::timeout(self.timeout, extraction).await {
            Ok(Ok(Ok(features))) => ChunkScore::bounded(
                features.emotional_tone,
                features.relatability,
                features.theme_tags,
            ),
            Ok(Ok(Err(e))) => {
                tracing::warn!(chunk_id = %chunk.id, error = %e, "feature extraction failed");
                ChunkScore::zeroed()
            }
            Ok(Err(_panic)) => {
                tracing::warn!(chunk_id = %chunk.id, "feature extraction panicked");
                ChunkScore::zeroed()
            }
            Err(_elapsed) => {
                tracing::warn!(
                    chunk_id = %chunk.id,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "feature extraction timed out"
                );
                ChunkScore::zeroed()
            }
        }
    }
}
