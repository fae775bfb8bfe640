use std::path::Path;
use std::time::Instant;

use super::pipeline_logger::PipelineLogger;
use super::stage_runner::{
    Preparation, PreparationOptions, PreparationPipeline, PreparationSettings, VoiceActivityStage,
};
use crate::audio::domain::audio_artifact::{ArtifactSet, AudioArtifact};
use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_tool::{AudioTool, TrimWindow};
use crate::audio::domain::audio_writer::AudioWriter;
use crate::audio::domain::vocal_separator::VocalSeparator;
use crate::audio::domain::voice_activity::VoiceActivityDetector;
use crate::shared::config::TranscribeConfig;
use crate::shared::constants::too_long_sentinel;
use crate::subtitles::subtitle_formatter::SubtitleLayout;
use crate::transcription::domain::candidate_selector::{
    selection_plan, CandidateRunner, CandidateSelector, CandidateSource, CandidateVariant,
};
use crate::transcription::domain::hallucination::HallucinationScorer;
use crate::transcription::domain::inference_engine::InferenceEngine;
use crate::transcription::domain::marker_confirmation::{
    ConfirmationMode, ConfirmationRequest, MarkerConfirmer, MarkerSettings,
};
use crate::transcription::domain::phrase_patterns::MarkerPatterns;
use crate::transcription::domain::prompts::prompt_for;
use crate::transcription::domain::remote_transcriber::RemoteTranscriber;
use crate::transcription::domain::speech_recognizer::RecognitionRequest;
use crate::transcription::domain::transcription_result::TranscriptionResult;

/// Text placeholder for a confirmed-empty transcription.
pub const EMPTY_TEXT_PLACEHOLDER: &str = "--";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputKind {
    /// Confirmed plain text.
    #[default]
    Text,
    /// Subtitles with their own text, falling back to the confirmed text when blank.
    TextAndSubtitles,
    /// Subtitles only; the text comes from the subtitle pass.
    SubtitlesOnly,
}

impl OutputKind {
    fn wants_text(self) -> bool {
        self != OutputKind::SubtitlesOnly
    }

    fn wants_subtitles(self) -> bool {
        self != OutputKind::Text
    }
}

/// One transcription request. `None` fields fall back to the configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscribeRequest {
    /// Output language.
    pub language: String,
    /// Spoken language; defaults to `language`.
    pub input_language: Option<String>,
    pub prompt: Option<String>,
    pub is_music: bool,
    pub output: OutputKind,
    pub begin_secs: f64,
    pub end_secs: Option<f64>,
    pub stretch: Option<f64>,
    pub max_duration_secs: Option<u64>,
    pub runs: usize,
    pub remix_factor: Option<f64>,
    pub speech_norm: Option<bool>,
    pub max_line_width: Option<usize>,
    pub max_line_count: Option<usize>,
}

impl TranscribeRequest {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            input_language: None,
            prompt: None,
            is_music: false,
            output: OutputKind::Text,
            begin_secs: 0.0,
            end_secs: None,
            stretch: None,
            max_duration_secs: None,
            runs: 1,
            remix_factor: None,
            speech_norm: None,
            max_line_width: None,
            max_line_count: None,
        }
    }

    pub fn input_language(&self) -> &str {
        self.input_language.as_deref().unwrap_or(&self.language)
    }
}

/// End-to-end transcription: preparation, confirmed text, then subtitle
/// selection. Always returns a well-formed result.
pub struct TranscribeUseCase {
    config: TranscribeConfig,
    engine: InferenceEngine,
    tool: Box<dyn AudioTool>,
    reader: Box<dyn AudioReader>,
    writer: Box<dyn AudioWriter>,
    separator: Option<Box<dyn VocalSeparator>>,
    vad: Option<Box<dyn VoiceActivityDetector>>,
    remote: Option<Box<dyn RemoteTranscriber>>,
    scorer: HallucinationScorer,
    marker_settings: MarkerSettings,
    preparation: PreparationSettings,
}

impl TranscribeUseCase {
    pub fn new(
        config: TranscribeConfig,
        engine: InferenceEngine,
        tool: Box<dyn AudioTool>,
        reader: Box<dyn AudioReader>,
        writer: Box<dyn AudioWriter>,
    ) -> Self {
        Self {
            scorer: HallucinationScorer::from(&config.hallucination),
            marker_settings: MarkerSettings::from(&config),
            preparation: PreparationSettings::from(&config),
            config,
            engine,
            tool,
            reader,
            writer,
            separator: None,
            vad: None,
            remote: None,
        }
    }

    pub fn with_separator(mut self, separator: Option<Box<dyn VocalSeparator>>) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_vad(mut self, vad: Box<dyn VoiceActivityDetector>) -> Self {
        self.vad = Some(vad);
        self
    }

    pub fn with_remote(mut self, remote: Box<dyn RemoteTranscriber>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn run(
        &self,
        input: &Path,
        request: &TranscribeRequest,
        logger: &mut dyn PipelineLogger,
    ) -> TranscriptionResult {
        let started = Instant::now();
        logger.info(&format!(
            "transcribing {} (lang={}, input={}, music={})",
            input.display(),
            request.language,
            request.input_language(),
            request.is_music
        ));

        let (artifacts, duration) = match self.prepare(input, request, logger) {
            Preparation::Ready {
                artifacts,
                duration,
            } => (artifacts, duration),
            Preparation::TooLong(secs) => {
                logger.info(&format!("input too long ({secs}s), not transcribing"));
                return TranscriptionResult::text_only(too_long_sentinel(secs));
            }
        };

        let confirmation = self.confirmation_request(request);
        let confirmer = MarkerConfirmer::new(
            &self.engine,
            self.tool.as_ref(),
            MarkerPatterns::standard(),
            &self.marker_settings,
        );

        let mut result = TranscriptionResult::empty();
        if request.output.wants_text() {
            let start = Instant::now();
            let mode = match duration {
                Some(secs) if secs > self.config.marker_max_duration_secs => {
                    log::info!(
                        "not using markers for {secs}s > {}s",
                        self.config.marker_max_duration_secs
                    );
                    ConfirmationMode::NoMark
                }
                _ => ConfirmationMode::MarkForward,
            };
            result = confirmer.confirm(&artifacts.processed, mode, &confirmation);
            if result.text.trim().is_empty() {
                result.text = EMPTY_TEXT_PLACEHOLDER.to_string();
            }
            logger.timing("text_pass", start.elapsed().as_secs_f64() * 1000.0);
        }

        if request.output.wants_subtitles() {
            let start = Instant::now();
            let subtitles = self.subtitles(&artifacts, request, &confirmer, &confirmation, logger);
            logger.timing("subtitle_pass", start.elapsed().as_secs_f64() * 1000.0);
            if request.output.wants_text() {
                if !subtitles.text.trim().is_empty() {
                    result.text = subtitles.text;
                }
                result.srt = subtitles.srt;
                result.segments = subtitles.segments;
            } else {
                result = subtitles;
            }
        } else {
            result.srt.clear();
        }

        let elapsed = started.elapsed().as_secs_f64();
        log::info!("T={elapsed:.2}s");
        if elapsed > 0.0 {
            log::info!("c/s={:.1}", result.text.chars().count() as f64 / elapsed);
        }
        logger.summary();
        result
    }

    fn prepare(
        &self,
        input: &Path,
        request: &TranscribeRequest,
        logger: &mut dyn PipelineLogger,
    ) -> Preparation {
        let options = PreparationOptions {
            window: TrimWindow {
                begin: request.begin_secs,
                end: request.end_secs.unwrap_or(self.config.trunc_duration_secs),
            },
            stretch: request.stretch,
            trunc_duration_secs: self.config.trunc_duration_secs,
            max_duration_secs: request
                .max_duration_secs
                .unwrap_or(self.config.max_duration_secs),
            is_music: request.is_music,
            remix_factor: request.remix_factor.unwrap_or(self.config.remix_factor),
            speech_norm: request.speech_norm.unwrap_or(self.config.speech_norm),
        };
        let vad = self.vad.as_deref().map(|detector| VoiceActivityStage {
            detector,
            reader: self.reader.as_ref(),
            writer: self.writer.as_ref(),
        });
        PreparationPipeline::new(
            self.tool.as_ref(),
            self.separator.as_deref(),
            vad,
            &self.preparation,
        )
        .run(AudioArtifact::source(input), &options, logger)
    }

    fn confirmation_request(&self, request: &TranscribeRequest) -> ConfirmationRequest {
        ConfirmationRequest {
            recognition: RecognitionRequest {
                language: Some(request.language.clone()),
                initial_prompt: prompt_for(
                    &request.language,
                    request.prompt.as_deref(),
                    request.is_music,
                ),
                word_timestamps: true,
                decoding: self.config.decoding,
            },
            input_language: request.input_language().to_string(),
            is_music: request.is_music,
            runs: request.runs.max(1),
            layout: SubtitleLayout {
                max_line_width: request.max_line_width.unwrap_or(self.config.max_line_width),
                max_line_count: request.max_line_count.unwrap_or(self.config.max_line_count),
            },
        }
    }

    /// Speech gets one timed pass over the uncut vocals. Music gets one over
    /// the remix, or the full best-of-N chain for languages prone to spam
    /// hallucinations.
    fn subtitles(
        &self,
        artifacts: &ArtifactSet,
        request: &TranscribeRequest,
        confirmer: &MarkerConfirmer<'_>,
        confirmation: &ConfirmationRequest,
        logger: &mut dyn PipelineLogger,
    ) -> TranscriptionResult {
        if !request.is_music {
            return confirmer.confirm(&artifacts.no_cut, ConfirmationMode::Timed, confirmation);
        }

        let gated = self
            .config
            .hallucination
            .languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(request.input_language()));
        if !gated {
            let artifact = artifacts.remix.as_ref().unwrap_or(&artifacts.clean);
            return confirmer.confirm(artifact, ConfirmationMode::Timed, confirmation);
        }

        let remote = self
            .remote
            .as_deref()
            .filter(|_| self.config.remote.enabled);
        let plan = selection_plan(artifacts, remote.is_some());
        let runner = SubtitleRunner {
            confirmer,
            confirmation,
            remote,
            source_language: request.input_language(),
            target_language: &request.language,
        };
        match CandidateSelector::new(&self.scorer).select(&plan, &runner) {
            Some(selection) => {
                for (label, score) in &selection.attempts {
                    if *score != usize::MAX {
                        logger.metric(&format!("hallucination.{label}"), *score as f64);
                    }
                }
                logger.info(&format!(
                    "selected {} subtitles (score {})",
                    selection.winner.label, selection.winner.hallucination_score
                ));
                selection.winner.result
            }
            None => TranscriptionResult::empty(),
        }
    }
}

struct SubtitleRunner<'a> {
    confirmer: &'a MarkerConfirmer<'a>,
    confirmation: &'a ConfirmationRequest,
    remote: Option<&'a dyn RemoteTranscriber>,
    source_language: &'a str,
    target_language: &'a str,
}

impl CandidateRunner for SubtitleRunner<'_> {
    fn run(&self, variant: &CandidateVariant) -> Option<TranscriptionResult> {
        match variant.source {
            CandidateSource::Local => self
                .confirmer
                .transcribe_timed(&variant.artifact, self.confirmation)
                .map_err(|e| log::warn!("candidate {} failed: {e}", variant.label))
                .ok(),
            CandidateSource::Remote => {
                let remote = self.remote?;
                remote
                    .transcribe(
                        variant.artifact.path(),
                        self.source_language,
                        self.target_language,
                    )
                    .map_err(|e| log::warn!("remote candidate failed: {e}"))
                    .ok()
            }
        }
    }
}
