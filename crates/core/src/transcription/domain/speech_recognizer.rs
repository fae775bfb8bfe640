use std::path::Path;

use serde::{Deserialize, Serialize};

/// What an ASR backend can produce. Chosen by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCapability {
    /// Segment-level timestamps only.
    SegmentTimestamped,
    /// Segment and word-level timestamps.
    WordTimestamped,
    /// Translated plain text, no timestamps.
    TranslationOnly,
}

/// Beam-search settings forwarded to the recognizer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingOptions {
    pub beam_size: usize,
    pub patience: f32,
    pub temperature: f32,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            beam_size: 5,
            patience: 0.0,
            temperature: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecognitionRequest {
    /// Output language; `None` lets the engine detect it.
    pub language: Option<String>,
    pub initial_prompt: Option<String>,
    pub word_timestamps: bool,
    pub decoding: DecodingOptions,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedWord {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub words: Vec<RecognizedWord>,
}

/// Raw engine output for one pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub segments: Vec<RecognizedSegment>,
}

/// Domain interface for the ASR engine.
///
/// Implementations are not required to be reentrant; callers go through
/// [`InferenceEngine`](super::inference_engine::InferenceEngine), which
/// serializes every call.
pub trait SpeechRecognizer: Send {
    fn capability(&self) -> EngineCapability;

    fn transcribe(
        &self,
        audio: &Path,
        request: &RecognitionRequest,
    ) -> Result<Recognition, Box<dyn std::error::Error>>;
}
