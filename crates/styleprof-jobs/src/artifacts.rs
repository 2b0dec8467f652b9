//! Writes a completed job's profile and score artifacts.
//!
//! Layout under the output root:
//!
//! ```text
//! <output_dir>/<job_id>/style-profile.md
//! <output_dir>/<job_id>/style-profile.meta.json
//! <output_dir>/<job_id>/chunk_scores.json
//! ```

use std::path::{Path, PathBuf};

use styleprof_core::{ChunkScores, StyleProfile};
use styleprof_notify::ArtifactPointers;
use uuid::Uuid;

use crate::error::ArtifactError;

pub const PROFILE_FILE: &str = "style-profile.md";
pub const PROFILE_META_FILE: &str = "style-profile.meta.json";
pub const SCORES_FILE: &str = "chunk_scores.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub profile: PathBuf,
    pub profile_meta: PathBuf,
    pub scores: PathBuf,
}

impl ArtifactPaths {
    #[must_use]
    pub fn for_job(output_dir: &Path, job_id: Uuid) -> Self {
        let dir = output_dir.join(job_id.to_string());
        Self {
            profile: dir.join(PROFILE_FILE),
            profile_meta: dir.join(PROFILE_META_FILE),
            scores: dir.join(SCORES_FILE),
            dir,
        }
    }

    #[must_use]
    pub fn pointers(&self) -> ArtifactPointers {
        ArtifactPointers {
            profile: self.profile.display().to_string(),
            profile_meta: self.profile_meta.display().to_string(),
            scores: self.scores.display().to_string(),
        }
    }
}

/// Write all three artifacts for `job_id`.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// reader never observes a half-written artifact.
///
/// # Errors
///
/// Returns [`ArtifactError`] if serialization or any filesystem operation
/// fails.
pub async fn write_artifacts(
    output_dir: &Path,
    job_id: Uuid,
    profile: &StyleProfile,
    scores: &ChunkScores,
) -> Result<ArtifactPaths, ArtifactError> {
    let paths = ArtifactPaths::for_job(output_dir, job_id);

    let meta = serde_json::to_string_pretty(&profile.metadata()).map_err(|source| {
        ArtifactError::Serialize {
            what: "profile metadata",
            source,
        }
    })?;
    let scores_json =
        serde_json::to_string_pretty(scores).map_err(|source| ArtifactError::Serialize {
            what: "chunk scores",
            source,
        })?;

    tokio::fs::create_dir_all(&paths.dir)
        .await
        .map_err(|source| ArtifactError::Io {
            path: paths.dir.clone(),
            source,
        })?;

    write_atomic(&paths.profile, profile.to_markdown().as_bytes()).await?;
    write_atomic(&paths.profile_meta, meta.as_bytes()).await?;
    write_atomic(&paths.scores, scores_json.as_bytes()).await?;

    tracing::debug!(job_id = %job_id, dir = %paths.dir.display(), "artifacts written");
    Ok(paths)
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ArtifactError> {
    let tmp = path.with_extension("tmp");
    let io_err = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, contents).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}
