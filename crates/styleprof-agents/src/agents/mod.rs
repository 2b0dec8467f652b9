//! The five built-in capabilities, one per profile section.

mod emotional_tone;
mod relatability;
mod themes;
mod values;
mod voice;

use std::sync::Arc;

pub use emotional_tone::EmotionalToneAnalyzer;
pub use relatability::RelatabilityAssessor;
pub use themes::ThemeExtractor;
pub use values::ValuesIdentifier;
pub use voice::VoiceAnalyzer;

use crate::capability::AnalysisCapability;

/// The fixed registry, in canonical section order.
#[must_use]
pub fn default_capabilities() -> Vec<Arc<dyn AnalysisCapability>> {
    vec![
        Arc::new(VoiceAnalyzer),
        Arc::new(ThemeExtractor),
        Arc::new(ValuesIdentifier),
        Arc::new(EmotionalToneAnalyzer),
        Arc::new(RelatabilityAssessor),
    ]
}
