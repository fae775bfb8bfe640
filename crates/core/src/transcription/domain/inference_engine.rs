use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use thiserror::Error;

use super::speech_recognizer::{EngineCapability, RecognitionRequest, SpeechRecognizer};
use super::transcription_result::TranscriptionResult;
use crate::subtitles::segment_shaper::shape_segments;
use crate::subtitles::subtitle_formatter::{build_srt, SubtitleLayout};

/// Separator placed between the texts of repeated runs.
pub const RUN_SEPARATOR: &str = "=====\n";

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("audio input {0} does not exist")]
    MissingInput(PathBuf),
    #[error("recognizer failed on {path}: {message}")]
    Recognizer { path: PathBuf, message: String },
}

/// How one inference call is run and rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassOptions {
    /// Render SRT cues from segment timestamps.
    pub timed: bool,
    /// Number of repeated runs over the same audio (at least one).
    pub runs: usize,
    pub layout: SubtitleLayout,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            timed: false,
            runs: 1,
            layout: SubtitleLayout::default(),
        }
    }
}

/// The single shared ASR engine of a session.
///
/// The recognizer is not reentrant, so every call holds the engine lock for
/// the whole of its runs. The guard is scoped, which releases the lock on
/// every exit path including recognizer errors.
pub struct InferenceEngine {
    recognizer: Mutex<Box<dyn SpeechRecognizer>>,
    capability: EngineCapability,
}

impl InferenceEngine {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>) -> Self {
        let capability = recognizer.capability();
        Self {
            recognizer: Mutex::new(recognizer),
            capability,
        }
    }

    pub fn capability(&self) -> EngineCapability {
        self.capability
    }

    pub fn transcribe(
        &self,
        audio: &Path,
        request: &RecognitionRequest,
        options: PassOptions,
    ) -> Result<TranscriptionResult, InferenceError> {
        if !audio.exists() {
            return Err(InferenceError::MissingInput(audio.to_path_buf()));
        }

        let recognizer = match self.recognizer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("inference lock poisoned by an earlier panic; continuing");
                poisoned.into_inner()
            }
        };

        let start = Instant::now();
        let mut result = TranscriptionResult::empty();
        let mut texts = Vec::with_capacity(options.runs.max(1));

        for run in 0..options.runs.max(1) {
            log::debug!("RUN {run} on {}", audio.display());
            let recognition =
                recognizer
                    .transcribe(audio, request)
                    .map_err(|e| InferenceError::Recognizer {
                        path: audio.to_path_buf(),
                        message: e.to_string(),
                    })?;

            let segments = shape_segments(&recognition.segments, request.word_timestamps);
            if options.timed {
                let first_index = result.segments.len() + 1;
                result.srt.push_str(&build_srt(&segments, first_index, options.layout));
            }
            result.segments.extend(segments);
            texts.push(recognition.text);
        }
        drop(recognizer);

        result.text = texts.join(RUN_SEPARATOR);
        log::info!(
            "transcribed {} in {:.1}s: {:?}",
            audio.display(),
            start.elapsed().as_secs_f64(),
            result.text
        );
        Ok(result)
    }

    /// Like [`transcribe`](Self::transcribe), but a failed call is logged and
    /// degrades to an empty result.
    pub fn transcribe_or_empty(
        &self,
        audio: &Path,
        request: &RecognitionRequest,
        options: PassOptions,
    ) -> TranscriptionResult {
        self.transcribe(audio, request, options).unwrap_or_else(|e| {
            log::warn!("inference failed: {e}");
            TranscriptionResult::empty()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{recognition, StubRecognizer};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    #[test]
    fn test_single_run_untimed_has_no_srt() {
        let audio = NamedTempFile::new().unwrap();
        let (stub, calls) = StubRecognizer::scripted(&["hello world"]);
        let engine = InferenceEngine::new(Box::new(stub));

        let result = engine
            .transcribe(audio.path(), &RecognitionRequest::default(), PassOptions::default())
            .unwrap();

        assert_eq!(result.text, "hello world");
        assert!(result.srt.is_empty());
        assert_eq!(result.segments.len(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_timed_multi_run_joins_text_and_numbers_cues() {
        let audio = NamedTempFile::new().unwrap();
        let (stub, calls) = StubRecognizer::scripted(&["first", "second"]);
        let engine = InferenceEngine::new(Box::new(stub));
        let options = PassOptions {
            timed: true,
            runs: 2,
            ..PassOptions::default()
        };

        let result = engine
            .transcribe(audio.path(), &RecognitionRequest::default(), options)
            .unwrap();

        assert_eq!(result.text, "first=====\nsecond");
        assert!(result.srt.starts_with("1\n"));
        assert!(result.srt.contains("\n\n2\n"));
        assert_eq!(result.segments.len(), 2);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_words_only_when_requested() {
        let audio = NamedTempFile::new().unwrap();
        let (stub, _) = StubRecognizer::scripted(&["a b", "a b"]);
        let engine = InferenceEngine::new(Box::new(stub));

        let without = engine
            .transcribe(audio.path(), &RecognitionRequest::default(), PassOptions::default())
            .unwrap();
        assert!(without.segments[0].words.is_empty());

        let request = RecognitionRequest {
            word_timestamps: true,
            ..RecognitionRequest::default()
        };
        let with = engine
            .transcribe(audio.path(), &request, PassOptions::default())
            .unwrap();
        assert_eq!(with.segments[0].words.len(), 2);
    }

    #[test]
    fn test_missing_input_is_error_without_recognizer_call() {
        let (stub, calls) = StubRecognizer::scripted(&["never"]);
        let engine = InferenceEngine::new(Box::new(stub));
        let err = engine
            .transcribe(
                Path::new("/nonexistent/clip.wav"),
                &RecognitionRequest::default(),
                PassOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, InferenceError::MissingInput(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recognizer_error_degrades_to_empty() {
        let audio = NamedTempFile::new().unwrap();
        let (stub, _) = StubRecognizer::new(EngineCapability::WordTimestamped, |_| {
            Err("decoder exploded".to_string())
        });
        let engine = InferenceEngine::new(Box::new(stub));

        let err = engine
            .transcribe(audio.path(), &RecognitionRequest::default(), PassOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("decoder exploded"));

        let result =
            engine.transcribe_or_empty(audio.path(), &RecognitionRequest::default(), PassOptions::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_calls_never_overlap() {
        let audio = NamedTempFile::new().unwrap();
        let in_flight = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let (flight, overlap) = (in_flight.clone(), overlapped.clone());
        let (stub, calls) = StubRecognizer::new(EngineCapability::WordTimestamped, move |_| {
            if flight.swap(true, Ordering::SeqCst) {
                overlap.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
            flight.store(false, Ordering::SeqCst);
            Ok(recognition("ok"))
        });
        let engine = Arc::new(InferenceEngine::new(Box::new(stub)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let path = audio.path().to_path_buf();
                std::thread::spawn(move || {
                    for _ in 0..3 {
                        engine
                            .transcribe(&path, &RecognitionRequest::default(), PassOptions::default())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!overlapped.load(Ordering::SeqCst));
        assert_eq!(calls.lock().unwrap().len(), 12);
    }

    #[test]
    fn test_capability_is_cached_from_recognizer() {
        let (stub, _) = StubRecognizer::new(EngineCapability::TranslationOnly, |_| {
            Ok(recognition(""))
        });
        let engine = InferenceEngine::new(Box::new(stub));
        assert_eq!(engine.capability(), EngineCapability::TranslationOnly);
    }
}
