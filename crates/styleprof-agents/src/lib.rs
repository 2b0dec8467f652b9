//! Analysis capabilities and the pipeline that turns a transcript into a
//! five-section style profile.

pub mod agents;
pub mod capability;
pub mod error;
pub mod pipeline;

mod text;

pub use agents::{
    default_capabilities, EmotionalToneAnalyzer, RelatabilityAssessor, ThemeExtractor,
    ValuesIdentifier, VoiceAnalyzer,
};
pub use capability::AnalysisCapability;
pub use error::{AnalysisError, PipelineError};
pub use pipeline::AgentPipeline;
