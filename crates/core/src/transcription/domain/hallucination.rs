use super::transcription_result::TranscriptionResult;
use crate::shared::config::HallucinationSettings;

/// Counts known spam phrases the engine tends to invent on music.
#[derive(Clone, Debug)]
pub struct HallucinationScorer {
    phrases: Vec<String>,
    threshold: usize,
}

impl HallucinationScorer {
    pub fn new(phrases: Vec<String>, threshold: usize) -> Self {
        Self {
            phrases: phrases.into_iter().filter(|p| !p.is_empty()).collect(),
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Non-overlapping phrase occurrences in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.phrases.iter().map(|p| text.matches(p.as_str()).count()).sum()
    }

    /// Scores the SRT when there is one, else the plain text.
    pub fn score(&self, result: &TranscriptionResult) -> usize {
        if result.srt.is_empty() {
            self.count(&result.text)
        } else {
            self.count(&result.srt)
        }
    }

    pub fn is_acceptable(&self, score: usize) -> bool {
        score <= self.threshold
    }
}

impl From<&HallucinationSettings> for HallucinationScorer {
    fn from(settings: &HallucinationSettings) -> Self {
        Self::new(settings.phrases.clone(), settings.threshold)
    }
}
