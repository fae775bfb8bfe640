//! Stubs shared by unit tests across contexts.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::domain::audio_tool::{AudioTool, MixInput, SilenceFilter, TrimWindow};
use crate::audio::domain::stage_error::StageError;
use crate::audio::domain::vocal_separator::{SeparatedStems, VocalSeparator};
use crate::transcription::domain::speech_recognizer::{
    EngineCapability, Recognition, RecognitionRequest, RecognizedSegment, RecognizedWord,
    SpeechRecognizer,
};

pub type CallLog = Arc<Mutex<Vec<PathBuf>>>;

type Responder = Box<dyn Fn(&Path) -> Result<Recognition, String> + Send + Sync>;

/// One-segment recognition spanning a second, one word per token.
pub fn recognition(text: &str) -> Recognition {
    let words = text
        .split_whitespace()
        .enumerate()
        .map(|(i, w)| RecognizedWord {
            start: i as f64 * 0.1,
            end: (i + 1) as f64 * 0.1,
            text: format!(" {w}"),
        })
        .collect();
    Recognition {
        text: text.to_string(),
        segments: vec![RecognizedSegment {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
            words,
        }],
    }
}

/// Recognizer whose answers come from a closure over the audio path.
pub struct StubRecognizer {
    capability: EngineCapability,
    respond: Responder,
    calls: CallLog,
}

impl StubRecognizer {
    pub fn new(
        capability: EngineCapability,
        respond: impl Fn(&Path) -> Result<Recognition, String> + Send + Sync + 'static,
    ) -> (Self, CallLog) {
        let calls = CallLog::default();
        let stub = Self {
            capability,
            respond: Box::new(respond),
            calls: calls.clone(),
        };
        (stub, calls)
    }

    /// Answers `texts` in order, then empty text.
    pub fn scripted(texts: &[&str]) -> (Self, CallLog) {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(texts.iter().map(|t| t.to_string()).collect());
        Self::new(EngineCapability::WordTimestamped, move |_| {
            let next = queue.lock().unwrap().pop_front().unwrap_or_default();
            Ok(recognition(&next))
        })
    }
}

impl SpeechRecognizer for StubRecognizer {
    fn capability(&self) -> EngineCapability {
        self.capability
    }

    fn transcribe(
        &self,
        audio: &Path,
        _request: &RecognitionRequest,
    ) -> Result<Recognition, Box<dyn std::error::Error>> {
        self.calls.lock().unwrap().push(audio.to_path_buf());
        (self.respond)(audio).map_err(|e| e.into())
    }
}

/// Audio tool that writes a placeholder file for every output and records
/// which operations ran. Operations named in `failing` return an error.
#[derive(Default)]
pub struct StubTool {
    duration: Option<u64>,
    failing: Vec<&'static str>,
    ops: Mutex<Vec<(String, PathBuf)>>,
}

impl StubTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.push(op);
        self
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().iter().map(|(op, _)| op.clone()).collect()
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        self.ops.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    fn run(&self, op: &'static str, output: Option<&Path>) -> Result<(), StageError> {
        self.ops
            .lock()
            .unwrap()
            .push((op.to_string(), output.map(Path::to_path_buf).unwrap_or_default()));
        if self.failing.contains(&op) {
            return Err(StageError::ExitStatus {
                command: op.to_string(),
                status: 1,
                detail: "stub failure".to_string(),
            });
        }
        if let Some(path) = output {
            std::fs::write(path, b"RIFF").unwrap();
        }
        Ok(())
    }
}

impl AudioTool for StubTool {
    fn normalize(
        &self,
        _input: &Path,
        output: &Path,
        _window: TrimWindow,
        _sample_rate: u32,
    ) -> Result<Option<u64>, StageError> {
        self.run("normalize", Some(output))?;
        Ok(self.duration)
    }

    fn stretch(
        &self,
        _input: &Path,
        output: &Path,
        _factor: f64,
        _max_secs: f64,
        _sample_rate: u32,
    ) -> Result<(), StageError> {
        self.run("stretch", Some(output))
    }

    fn probe_duration(&self, _input: &Path) -> Result<Option<u64>, StageError> {
        self.run("probe_duration", None)?;
        Ok(self.duration)
    }

    fn trim_silence(
        &self,
        _input: &Path,
        output: &Path,
        _filter: SilenceFilter,
        _sample_rate: u32,
    ) -> Result<(), StageError> {
        self.run("trim_silence", Some(output))
    }

    fn speech_norm(&self, _input: &Path, output: &Path, _sample_rate: u32) -> Result<(), StageError> {
        self.run("speech_norm", Some(output))
    }

    fn mix(&self, _inputs: &[MixInput<'_>], output: &Path) -> Result<(), StageError> {
        self.run("mix", Some(output))
    }

    fn concat(&self, _parts: &[&Path], output: &Path, _sample_rate: u32) -> Result<(), StageError> {
        self.run("concat", Some(output))
    }
}

/// Four-stem separator writing placeholder stems next to its input.
pub struct StubSeparator {
    fail: bool,
    calls: AtomicUsize,
}

impl StubSeparator {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VocalSeparator for StubSeparator {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn separate(&self, input: &Path) -> Result<SeparatedStems, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StageError::MissingOutput(input.to_path_buf()));
        }
        let stem = |name: &str| {
            let path = PathBuf::from(format!("{}.{name}.wav", input.display()));
            std::fs::write(&path, b"RIFF").unwrap();
            path
        };
        Ok(SeparatedStems {
            vocals: stem("vocals"),
            accompaniment: vec![stem("drums"), stem("bass"), stem("other")],
        })
    }
}
