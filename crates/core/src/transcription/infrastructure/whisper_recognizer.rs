use std::path::Path;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_reader::AudioReader;
use crate::shared::constants::SAMPLING_RATE;
use crate::transcription::domain::speech_recognizer::{
    DecodingOptions, EngineCapability, Recognition, RecognitionRequest, RecognizedSegment,
    RecognizedWord, SpeechRecognizer,
};

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// The model is loaded once at construction; a load failure is the one
/// unrecoverable error of a session. Audio files are decoded to 16 kHz mono
/// through the injected reader before inference.
pub struct WhisperRecognizer {
    context: WhisperContext,
    reader: Box<dyn AudioReader>,
    capability: EngineCapability,
}

impl WhisperRecognizer {
    pub fn new(
        model_path: &Path,
        reader: Box<dyn AudioReader>,
        capability: EngineCapability,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        if !model_path.exists() {
            return Err(format!("Whisper model not found at: {}", model_path.display()).into());
        }
        let context = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;
        log::info!("loaded Whisper model {}", model_path.display());

        Ok(Self {
            context,
            reader,
            capability,
        })
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn capability(&self) -> EngineCapability {
        self.capability
    }

    fn transcribe(
        &self,
        audio: &Path,
        request: &RecognitionRequest,
    ) -> Result<Recognition, Box<dyn std::error::Error>> {
        let segment = self
            .reader
            .read_audio(audio, SAMPLING_RATE)?
            .ok_or_else(|| format!("no audio stream in {}", audio.display()))?;

        let translate = self.capability == EngineCapability::TranslationOnly;
        let want_words =
            request.word_timestamps && self.capability == EngineCapability::WordTimestamped;

        let mut params = FullParams::new(sampling_strategy(&request.decoding));
        params.set_language(request.language.as_deref());
        params.set_translate(translate);
        if let Some(prompt) = request.initial_prompt.as_deref() {
            params.set_initial_prompt(prompt);
        }
        if request.decoding.temperature > 0.0 {
            params.set_temperature(request.decoding.temperature);
        }
        params.set_token_timestamps(want_words);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(8) as i32);

        let mut state = self
            .context
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;
        state
            .full(params, segment.samples())
            .map_err(|e| format!("Whisper inference failed: {e}"))?;

        let mut recognition = Recognition::default();
        for seg_idx in 0..state.full_n_segments() {
            let Some(seg) = state.get_segment(seg_idx) else {
                continue;
            };
            let text = seg.to_string();
            recognition.text.push_str(&text);

            if translate {
                continue;
            }

            let mut words = Vec::new();
            if want_words {
                for tok_idx in 0..seg.n_tokens() {
                    let Some(token) = seg.get_token(tok_idx) else {
                        continue;
                    };
                    let Ok(piece) = token.to_str() else {
                        continue;
                    };
                    // Special tokens look like [_BEG_] or <|en|>.
                    let trimmed = piece.trim();
                    if trimmed.is_empty() || trimmed.starts_with('[') || trimmed.starts_with('<') {
                        continue;
                    }
                    // Token timestamps are in centiseconds.
                    let data = token.token_data();
                    push_token(&mut words, piece, data.t0 as f64 / 100.0, data.t1 as f64 / 100.0);
                }
            }

            recognition.segments.push(RecognizedSegment {
                start: seg.start_timestamp() as f64 / 100.0,
                end: seg.end_timestamp() as f64 / 100.0,
                text,
                words,
            });
        }

        Ok(recognition)
    }
}

fn sampling_strategy(decoding: &DecodingOptions) -> SamplingStrategy {
    if decoding.beam_size > 1 {
        SamplingStrategy::BeamSearch {
            beam_size: decoding.beam_size as i32,
            patience: if decoding.patience > 0.0 {
                decoding.patience
            } else {
                -1.0
            },
        }
    } else {
        SamplingStrategy::Greedy { best_of: 1 }
    }
}

/// Whisper tokens are sub-word pieces; a piece starting with a space opens a
/// new word, anything else extends the current one.
fn push_token(words: &mut Vec<RecognizedWord>, piece: &str, start: f64, end: f64) {
    match words.last_mut() {
        Some(last) if !piece.starts_with(' ') => {
            last.text.push_str(piece);
            last.end = last.end.max(end);
        }
        _ => words.push(RecognizedWord {
            start,
            end,
            text: piece.to_string(),
        }),
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
