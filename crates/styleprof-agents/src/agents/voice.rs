//! Speaking style: sentence shape, pacing, word choice, delivery.

use async_trait::async_trait;
use styleprof_core::SectionName;

use crate::capability::{with_fallbacks, AnalysisCapability};
use crate::error::AnalysisError;
use crate::text::{contains_any, segments, sentences, tokenize, word_set};

const FIRST_PERSON: &[&str] = &["i", "me", "my", "mine", "myself", "i'm", "i've", "i'd", "i'll"];
const IMAGERY: &[&str] = &["like", "imagine", "picture", "metaphor"];

#[derive(Debug, Default, Clone, Copy)]
pub struct VoiceAnalyzer;

#[async_trait]
impl AnalysisCapability for VoiceAnalyzer {
    fn section(&self) -> SectionName {
        SectionName::Voice
    }

    async fn analyze(&self, transcript: &str) -> Result<Vec<String>, AnalysisError> {
        self.validate_input(transcript)?;

        let segs = segments(transcript);
        let tokens = tokenize(transcript);
        let words = word_set(&tokens);
        let sents = sentences(transcript);
        let mut findings: Vec<String> = Vec::new();

        #[allow(clippy::cast_precision_loss)]
        let avg_sentence_words = tokens.len() as f64 / sents.len().max(1) as f64;
        if avg_sentence_words > 20.0 {
            findings.push("Uses detailed, expansive sentences".to_string());
        } else {
            findings.push("Favors concise, direct communication".to_string());
        }

        let first_person = tokens
            .iter()
            .filter(|t| FIRST_PERSON.contains(&t.as_str()))
            .count();
        if first_person > 10 || first_person * 20 > tokens.len() {
            findings.push("Speaks from personal experience".to_string());
        }

        #[allow(clippy::cast_precision_loss)]
        let sentences_per_segment = segs
            .iter()
            .map(|s| sentences(s).len())
            .sum::<usize>() as f64
            / segs.len().max(1) as f64;
        if sentences_per_segment > 3.0 {
            findings.push("Tends to elaborate with multiple connected thoughts".to_string());
        } else {
            findings.push("Delivers ideas in focused, discrete segments".to_string());
        }

        let lowered = transcript.to_lowercase();
        if contains_any(&words, IMAGERY) || lowered.contains("as if") {
            findings.push("Uses metaphors and imagery to illustrate points".to_string());
        }

        let long_words = tokens
            .iter()
            .filter(|t| t.len() > 8 && t.chars().all(char::is_alphabetic))
            .count();
        if long_words > 5 {
            findings.push("Comfortable with technical or specialized vocabulary".to_string());
        }

        let questions = segs.iter().filter(|s| s.contains('?')).count();
        if questions * 5 > segs.len() {
            findings.push("Engages through rhetorical questions".to_string());
        }

        let emphatic = segs.iter().filter(|s| s.contains('!')).count();
        if emphatic * 10 > segs.len() {
            findings.push("Uses dynamic emphasis for key points".to_string());
        } else {
            findings.push("Maintains measured, even-keeled delivery".to_string());
        }

        Ok(with_fallbacks(
            findings,
            &["Conversational, unscripted speaking style"],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concise_speaker_is_described_as_direct() {
        let findings = VoiceAnalyzer
            .analyze("I did it. Then I moved on.\nWe kept going.")
            .await
            .unwrap();
        assert_eq!(findings[0], "Favors concise, direct communication");
        assert!(findings.iter().any(|f| f.contains("personal experience")));
    }

    #[tokio::test]
    async fn emphasis_and_questions_are_detected() {
        let findings = VoiceAnalyzer
            .analyze("Why would anyone stop?\nIt was incredible!\nImagine that.")
            .await
            .unwrap();
        assert!(findings.iter().any(|f| f.contains("rhetorical questions")));
        assert!(findings.iter().any(|f| f.contains("dynamic emphasis")));
        assert!(findings.iter().any(|f| f.contains("metaphors")));
    }

    #[tokio::test]
    async fn blank_transcript_is_rejected() {
        let result = VoiceAnalyzer.analyze("  \n ").await;
        assert!(matches!(result, Err(AnalysisError::EmptyTranscript)));
    }
}
