//! Marker-based confirmation of engine output.
//!
//! The clip is wrapped between two reference recordings ("Whisper, Ok." and
//! "Ok, Whisper.") before inference. Output that reproduces both markers
//! around some content was genuinely transcribed; output made only of marker
//! words came from a clip with nothing in it.

use std::fmt;
use std::path::{Path, PathBuf};

use super::inference_engine::{InferenceEngine, InferenceError, PassOptions};
use super::phrase_patterns::MarkerPatterns;
use super::speech_recognizer::{EngineCapability, RecognitionRequest};
use super::transcription_result::TranscriptionResult;
use crate::audio::domain::audio_artifact::{AudioArtifact, StageKind};
use crate::audio::domain::audio_tool::AudioTool;
use crate::shared::config::TranscribeConfig;
use crate::subtitles::subtitle_formatter::SubtitleLayout;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Raw engine output, no markers. Terminal.
    NoMark,
    /// Markers in natural order.
    MarkForward,
    /// Markers swapped.
    MarkReversed,
    /// Timestamped output for subtitles; markers would shift every cue. Terminal.
    Timed,
}

impl fmt::Display for ConfirmationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfirmationMode::NoMark => "no_mark",
            ConfirmationMode::MarkForward => "mark_forward",
            ConfirmationMode::MarkReversed => "mark_reversed",
            ConfirmationMode::Timed => "timed",
        };
        f.write_str(name)
    }
}

/// Mode of the next pass and the best candidate text carried into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationState {
    pub mode: ConfirmationMode,
    pub last_candidate: Option<String>,
}

impl ConfirmationState {
    pub fn initial(mode: ConfirmationMode) -> Self {
        Self {
            mode,
            last_candidate: None,
        }
    }

    fn advance(mode: ConfirmationMode, candidate: String) -> Self {
        Self {
            mode,
            last_candidate: Some(candidate),
        }
    }
}

/// Remaining inference passes in one confirmation cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassBudget(u8);

impl PassBudget {
    pub const PASSES: u8 = 3;

    pub fn new() -> Self {
        Self(Self::PASSES)
    }

    /// Spend one pass. `None` once the budget is exhausted.
    pub fn take(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    pub fn remaining(&self) -> u8 {
        self.0
    }
}

impl Default for PassBudget {
    fn default() -> Self {
        Self::new()
    }
}

/// The two marker recordings, in the order they wrap the clip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerFiles {
    pub leading: PathBuf,
    pub trailing: PathBuf,
}

impl MarkerFiles {
    /// `WOK-MRK-<lng>.wav` / `OKW-MRK-<lng>.wav` when present, else the
    /// language-neutral recordings.
    pub fn resolve(dir: &Path, language: &str) -> Self {
        let pick = |stem: &str| {
            let specific = dir.join(format!("{stem}-{language}.wav"));
            if specific.exists() {
                specific
            } else {
                dir.join(format!("{stem}.wav"))
            }
        };
        Self {
            leading: pick("WOK-MRK"),
            trailing: pick("OKW-MRK"),
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            leading: self.trailing,
            trailing: self.leading,
        }
    }
}

/// Session-wide marker settings.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerSettings {
    pub marker_dir: PathBuf,
    pub no_mark_languages: Vec<String>,
    pub compressor: bool,
    pub sample_rate: u32,
}

impl From<&TranscribeConfig> for MarkerSettings {
    fn from(config: &TranscribeConfig) -> Self {
        Self {
            marker_dir: config.marker_dir.clone(),
            no_mark_languages: config.no_mark_languages.clone(),
            compressor: config.compressor,
            sample_rate: config.sample_rate,
        }
    }
}

/// Per-request inputs of a confirmation cycle.
#[derive(Clone, Debug)]
pub struct ConfirmationRequest {
    pub recognition: RecognitionRequest,
    /// Spoken language, used to pick marker recordings.
    pub input_language: String,
    pub is_music: bool,
    pub runs: usize,
    pub layout: SubtitleLayout,
}

pub struct MarkerConfirmer<'a> {
    engine: &'a InferenceEngine,
    tool: &'a dyn AudioTool,
    patterns: &'a MarkerPatterns,
    settings: &'a MarkerSettings,
}

impl<'a> MarkerConfirmer<'a> {
    pub fn new(
        engine: &'a InferenceEngine,
        tool: &'a dyn AudioTool,
        patterns: &'a MarkerPatterns,
        settings: &'a MarkerSettings,
    ) -> Self {
        Self {
            engine,
            tool,
            patterns,
            settings,
        }
    }

    /// Run a full confirmation cycle starting in `mode`.
    ///
    /// Never fails: inference errors count as passes that heard nothing.
    pub fn confirm(
        &self,
        audio: &AudioArtifact,
        mode: ConfirmationMode,
        request: &ConfirmationRequest,
    ) -> TranscriptionResult {
        self.step(audio, ConfirmationState::initial(mode), PassBudget::new(), request)
    }

    /// A single timed pass that reports inference failure instead of hiding it.
    pub fn transcribe_timed(
        &self,
        audio: &AudioArtifact,
        request: &ConfirmationRequest,
    ) -> Result<TranscriptionResult, InferenceError> {
        let clip = self.prepare_clip(audio, ConfirmationMode::Timed, request);
        log::info!("[{}] PATH={}", ConfirmationMode::Timed, clip.display());
        let options = PassOptions {
            timed: true,
            runs: request.runs,
            layout: request.layout,
        };
        self.engine.transcribe(&clip, &request.recognition, options)
    }

    /// Markers are skipped for scripts the recordings don't suit, for music
    /// and for engines that translate. Timed passes are never remapped.
    pub fn effective_mode(
        &self,
        mode: ConfirmationMode,
        request: &ConfirmationRequest,
    ) -> ConfirmationMode {
        if mode == ConfirmationMode::Timed || mode == ConfirmationMode::NoMark {
            return mode;
        }
        let no_mark_language = request.recognition.language.as_deref().is_some_and(|l| {
            self.settings
                .no_mark_languages
                .iter()
                .any(|n| n.eq_ignore_ascii_case(l))
        });
        if no_mark_language
            || request.is_music
            || self.engine.capability() == EngineCapability::TranslationOnly
        {
            ConfirmationMode::NoMark
        } else {
            mode
        }
    }

    fn step(
        &self,
        audio: &AudioArtifact,
        state: ConfirmationState,
        budget: PassBudget,
        request: &ConfirmationRequest,
    ) -> TranscriptionResult {
        let Some(budget) = budget.take() else {
            log::warn!("confirmation pass budget exhausted; keeping best candidate");
            return TranscriptionResult::text_only(state.last_candidate.unwrap_or_default());
        };
        let mode = self.effective_mode(state.mode, request);
        let clip = self.prepare_clip(audio, mode, request);
        log::info!("[{mode}] PATH={}", clip.display());

        let options = PassOptions {
            timed: mode == ConfirmationMode::Timed,
            runs: request.runs,
            layout: request.layout,
        };
        let mut result = self
            .engine
            .transcribe_or_empty(&clip, &request.recognition, options);

        match mode {
            ConfirmationMode::Timed => result,
            ConfirmationMode::NoMark => {
                if result.text.trim().is_empty() {
                    if let Some(candidate) = state.last_candidate.filter(|c| !c.is_empty()) {
                        result.text = candidate;
                    }
                }
                result
            }
            ConfirmationMode::MarkForward => {
                if self.patterns.is_only_markers(&result.text) {
                    log::info!("[{mode}] only markers heard; checking reversed");
                    let next = ConfirmationState::advance(ConfirmationMode::MarkReversed, String::new());
                    return self.step(audio, next, budget, request);
                }
                let cleaned = self.patterns.strip_forward(&result.text);
                if self.patterns.is_forward_bracketed(&result.text) {
                    result.text = cleaned;
                    return result;
                }
                let next = ConfirmationState::advance(ConfirmationMode::MarkReversed, cleaned);
                self.step(audio, next, budget, request)
            }
            ConfirmationMode::MarkReversed => {
                let cleaned = self.patterns.strip_reversed(&result.text);
                if state.last_candidate.as_deref() == Some(cleaned.as_str()) {
                    log::info!("[{mode}] confirmed by both marker orders");
                    result.text = cleaned;
                    return result;
                }
                if self.patterns.is_only_markers(&result.text) {
                    result.text = String::new();
                    return result;
                }
                if self.patterns.is_reversed_bracketed(&result.text) {
                    result.text = cleaned;
                    return result;
                }
                let next = ConfirmationState::advance(ConfirmationMode::NoMark, cleaned);
                self.step(audio, next, budget, request)
            }
        }
    }

    /// The file actually fed to the engine for `mode`. Each processing step
    /// that fails leaves the previous file in place.
    fn prepare_clip(
        &self,
        audio: &AudioArtifact,
        mode: ConfirmationMode,
        request: &ConfirmationRequest,
    ) -> PathBuf {
        let mut clip = audio.clone();

        let markers = MarkerFiles::resolve(&self.settings.marker_dir, &request.input_language);
        let (stage, markers) = match mode {
            ConfirmationMode::NoMark => return clip.path().to_path_buf(),
            ConfirmationMode::Timed => (None, markers),
            ConfirmationMode::MarkForward => (Some(StageKind::Marker), markers),
            ConfirmationMode::MarkReversed => (Some(StageKind::MarkerReversed), markers.swapped()),
        };

        if let Some(stage) = stage {
            let output = clip.derived_path(stage);
            let parts = [markers.leading.as_path(), clip.path(), markers.trailing.as_path()];
            match self.tool.concat(&parts, &output, self.settings.sample_rate) {
                Ok(()) => clip = clip.derive(stage, output),
                Err(e) => log::warn!("can't add markers: {e}"),
            }
        }

        if self.settings.compressor && !request.is_music {
            let output = clip.derived_path(StageKind::Compressor);
            match self
                .tool
                .speech_norm(clip.path(), &output, self.settings.sample_rate)
            {
                Ok(()) => clip = clip.derive(StageKind::Compressor, output),
                Err(e) => log::warn!("can't compress: {e}"),
            }
        }

        clip.path().to_path_buf()
    }
}
