//! Resolving a trigger's `transcriptRef` to markdown text.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use styleprof_core::TranscriptError;

/// Loads the raw transcript a trigger refers to.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn load(&self, transcript_ref: &str) -> Result<String, TranscriptError>;
}

/// Reads transcripts from disk. Relative refs resolve against `root`.
#[derive(Debug, Clone)]
pub struct FileTranscriptSource {
    root: PathBuf,
}

impl FileTranscriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn resolve(&self, transcript_ref: &str) -> PathBuf {
        let path = Path::new(transcript_ref);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn load(&self, transcript_ref: &str) -> Result<String, TranscriptError> {
        let transcript_ref = transcript_ref.trim();
        if transcript_ref.is_empty() {
            return Err(TranscriptError::EmptyReference);
        }

        let path = self.resolve(transcript_ref);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TranscriptError::Unreadable {
                path: path.display().to_string(),
                source,
            })?;

        if text.trim().is_empty() {
            return Err(TranscriptError::Empty(transcript_ref.to_string()));
        }
        Ok(text)
    }
}
