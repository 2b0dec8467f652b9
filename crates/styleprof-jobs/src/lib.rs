//! Job lifecycle for style-profile runs: persistence, transcript loading,
//! artifact output, and the manager that ties them to the pipeline, the
//! scorer, and the notifier.

pub mod artifacts;
pub mod error;
pub mod manager;
pub mod source;
pub mod store;

pub use artifacts::{write_artifacts, ArtifactPaths, PROFILE_FILE, PROFILE_META_FILE, SCORES_FILE};
pub use error::{ArtifactError, JobError, StoreError};
pub use manager::{notifier_from_config, JobManager, StartedJob};
pub use source::{FileTranscriptSource, TranscriptSource};
pub use store::{JobStore, MemoryJobStore, PgJobStore};
