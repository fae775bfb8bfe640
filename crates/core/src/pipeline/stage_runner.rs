//! Fail-soft audio preparation.
//!
//! Each stage reads the last good artifact and derives a new one. A stage
//! that fails is logged and skipped; only the duration guard ends a request.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::pipeline_logger::PipelineLogger;
use crate::audio::domain::audio_artifact::{ArtifactSet, AudioArtifact, StageKind};
use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_tool::{AudioTool, MixInput, SilenceFilter, TrimWindow};
use crate::audio::domain::audio_writer::AudioWriter;
use crate::audio::domain::stage_error::StageError;
use crate::audio::domain::vocal_separator::VocalSeparator;
use crate::audio::domain::voice_activity::{collect_speech, VoiceActivityDetector};
use crate::shared::config::TranscribeConfig;

/// Session-wide preparation settings.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparationSettings {
    pub sample_rate: u32,
    pub silence: SilenceFilter,
    pub vad_enabled: bool,
}

impl From<&TranscribeConfig> for PreparationSettings {
    fn from(config: &TranscribeConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            silence: SilenceFilter {
                threshold_db: config.silence_threshold_db,
                min_silence_secs: config.silence_min_secs,
            },
            vad_enabled: config.vad_enabled,
        }
    }
}

/// Per-request preparation options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreparationOptions {
    pub window: TrimWindow,
    pub stretch: Option<f64>,
    /// Longest stretched input kept, in seconds.
    pub trunc_duration_secs: f64,
    pub max_duration_secs: u64,
    pub is_music: bool,
    pub remix_factor: f64,
    pub speech_norm: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Preparation {
    Ready {
        artifacts: ArtifactSet,
        /// Whole seconds, when the tool reported a duration.
        duration: Option<u64>,
    },
    /// Measured duration exceeded the limit; nothing was transcribed.
    TooLong(u64),
}

/// Optional collaborators of the voice-activity stage.
pub struct VoiceActivityStage<'a> {
    pub detector: &'a dyn VoiceActivityDetector,
    pub reader: &'a dyn AudioReader,
    pub writer: &'a dyn AudioWriter,
}

pub struct PreparationPipeline<'a> {
    tool: &'a dyn AudioTool,
    separator: Option<&'a dyn VocalSeparator>,
    vad: Option<VoiceActivityStage<'a>>,
    settings: &'a PreparationSettings,
}

impl<'a> PreparationPipeline<'a> {
    pub fn new(
        tool: &'a dyn AudioTool,
        separator: Option<&'a dyn VocalSeparator>,
        vad: Option<VoiceActivityStage<'a>>,
        settings: &'a PreparationSettings,
    ) -> Self {
        Self {
            tool,
            separator,
            vad,
            settings,
        }
    }

    pub fn run(
        &self,
        source: AudioArtifact,
        options: &PreparationOptions,
        logger: &mut dyn PipelineLogger,
    ) -> Preparation {
        let sr = self.settings.sample_rate;

        // 1. Normalize
        let mut clean = source.clone();
        let output = source.derived_path(StageKind::Normalize);
        let mut duration = None;
        let normalized = self.attempt(StageKind::Normalize, logger, || {
            self.tool.normalize(source.path(), &output, options.window, sr)
        });
        if let Some(reported) = normalized {
            clean = source.derive(StageKind::Normalize, output);
            duration = reported;
        }

        // 2. Tempo stretch
        if let Some(factor) = options.stretch {
            let output = clean.derived_path(StageKind::Stretch);
            let stretched = self.attempt(StageKind::Stretch, logger, || {
                self.tool
                    .stretch(clean.path(), &output, factor, options.trunc_duration_secs, sr)
            });
            if stretched.is_some() {
                clean = clean.derive(StageKind::Stretch, output);
            }
        }

        // 3. Duration guard
        let start = Instant::now();
        match self.tool.probe_duration(clean.path()) {
            Ok(Some(secs)) => {
                log::info!("DURATION={secs} max {}", options.max_duration_secs);
                if secs > options.max_duration_secs {
                    return Preparation::TooLong(secs);
                }
                duration = Some(secs);
            }
            Ok(None) => log::warn!("duration of {} unknown", clean.path().display()),
            Err(e) => log::warn!("can't analyze duration: {e}"),
        }
        logger.timing("duration", elapsed_ms(start));

        // 4. Vocal separation
        let mut no_cut = clean.clone();
        let mut vocals = None;
        let mut accompaniment = Vec::new();
        if let Some(separator) = self.separator {
            log::info!("separating vocals with {}", separator.name());
            if let Some(stems) =
                self.attempt(StageKind::Separation, logger, || separator.separate(clean.path()))
            {
                let stem = clean.derive(StageKind::Separation, stems.vocals);
                no_cut = stem.clone();
                vocals = Some(stem);
                accompaniment = stems.accompaniment;
            }
        }

        // 5. Silence trim + loudness
        let mut processed = no_cut.clone();
        let output = processed.derived_path(StageKind::SilenceTrim);
        let trimmed = self.attempt(StageKind::SilenceTrim, logger, || {
            self.tool
                .trim_silence(processed.path(), &output, self.settings.silence, sr)
        });
        if trimmed.is_some() {
            processed = processed.derive(StageKind::SilenceTrim, output);
        }

        // 6. Voice activity
        if !options.is_music && self.settings.vad_enabled {
            if let Some(stage) = &self.vad {
                let output = processed.derived_path(StageKind::VoiceActivity);
                let kept = self.attempt(StageKind::VoiceActivity, logger, || {
                    keep_speech(stage, &processed, &output, sr)
                });
                if kept.is_some() {
                    processed = processed.derive(StageKind::VoiceActivity, output);
                }
            }
        }

        // 7. Remix
        let remix = if options.is_music {
            self.remix(&clean, vocals.as_ref(), &accompaniment, options, logger)
        } else {
            None
        };

        Preparation::Ready {
            artifacts: ArtifactSet {
                clean,
                no_cut,
                vocals,
                processed,
                remix,
            },
            duration,
        }
    }

    /// Vocals recombined with the accompaniment at `remix_factor`. A factor
    /// of 1 or more means the untouched mix, 0 or less the bare vocals.
    fn remix(
        &self,
        clean: &AudioArtifact,
        vocals: Option<&AudioArtifact>,
        accompaniment: &[PathBuf],
        options: &PreparationOptions,
        logger: &mut dyn PipelineLogger,
    ) -> Option<AudioArtifact> {
        let factor = options.remix_factor;
        if factor >= 1.0 {
            return Some(clean.clone());
        }
        let vocals = vocals?;
        if factor <= 0.0 {
            return Some(vocals.clone());
        }
        if accompaniment.is_empty() {
            return None;
        }

        let sr = self.settings.sample_rate;
        let mut lead = vocals.clone();
        if options.speech_norm {
            let output = vocals.derived_path(StageKind::SpeechNorm);
            let normed = self.attempt(StageKind::SpeechNorm, logger, || {
                self.tool.speech_norm(vocals.path(), &output, sr)
            });
            if normed.is_some() {
                lead = vocals.derive(StageKind::SpeechNorm, output);
            }
        }

        let output = lead.derived_path(StageKind::Remix);
        let inputs: Vec<MixInput<'_>> = std::iter::once(MixInput {
            path: lead.path(),
            weight: 1.0,
        })
        .chain(accompaniment.iter().map(|p| MixInput {
            path: p.as_path(),
            weight: factor,
        }))
        .collect();
        self.attempt(StageKind::Remix, logger, || self.tool.mix(&inputs, &output))
            .map(|()| lead.derive(StageKind::Remix, output))
    }

    fn attempt<T>(
        &self,
        stage: StageKind,
        logger: &mut dyn PipelineLogger,
        run: impl FnOnce() -> Result<T, StageError>,
    ) -> Option<T> {
        let start = Instant::now();
        let outcome = run();
        logger.timing(&stage.to_string(), elapsed_ms(start));
        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("{stage} stage failed, keeping previous artifact: {e}");
                None
            }
        }
    }
}

fn keep_speech(
    stage: &VoiceActivityStage<'_>,
    input: &AudioArtifact,
    output: &Path,
    sample_rate: u32,
) -> Result<(), StageError> {
    let audio_io = |path: &Path, e: Box<dyn std::error::Error>| StageError::AudioIo {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let audio = stage
        .reader
        .read_audio(input.path(), sample_rate)
        .map_err(|e| audio_io(input.path(), e))?
        .ok_or_else(|| StageError::NoSpeech(input.path().to_path_buf()))?;
    let spans = stage.detector.speech_spans(&audio);
    if spans.is_empty() {
        return Err(StageError::NoSpeech(input.path().to_path_buf()));
    }
    let speech = collect_speech(&audio, &spans);
    stage
        .writer
        .write_audio(output, &speech)
        .map_err(|e| audio_io(output, e))
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::domain::audio_segment::AudioSegment;
    use crate::audio::domain::voice_activity::SpeechSpan;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::test_support::{StubSeparator, StubTool};
    use tempfile::TempDir;

    struct StubVad(Vec<SpeechSpan>);

    impl VoiceActivityDetector for StubVad {
        fn speech_spans(&self, _audio: &AudioSegment) -> Vec<SpeechSpan> {
            self.0.clone()
        }
    }

    struct StubReader;

    impl AudioReader for StubReader {
        fn read_audio(
            &self,
            _path: &Path,
            sample_rate: u32,
        ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
            Ok(Some(AudioSegment::new(vec![0.1; 1600], sample_rate, 1)))
        }
    }

    struct StubWriter;

    impl AudioWriter for StubWriter {
        fn write_audio(
            &self,
            path: &Path,
            _audio: &AudioSegment,
        ) -> Result<(), Box<dyn std::error::Error>> {
            std::fs::write(path, b"RIFF")?;
            Ok(())
        }
    }

    fn settings() -> PreparationSettings {
        PreparationSettings::from(&TranscribeConfig::default())
    }

    fn options(is_music: bool) -> PreparationOptions {
        PreparationOptions {
            window: TrimWindow {
                begin: 0.0,
                end: 600.0,
            },
            stretch: None,
            trunc_duration_secs: 600.0,
            max_duration_secs: 600,
            is_music,
            remix_factor: 0.3,
            speech_norm: true,
        }
    }

    struct Rig {
        dir: TempDir,
        tool: StubTool,
        separator: StubSeparator,
        vad: StubVad,
        settings: PreparationSettings,
    }

    impl Rig {
        fn new(tool: StubTool) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                tool,
                separator: StubSeparator::new(false),
                vad: StubVad(vec![SpeechSpan { start: 0, end: 800 }]),
                settings: settings(),
            }
        }

        fn source(&self) -> AudioArtifact {
            AudioArtifact::source(self.dir.path().join("in.mp3"))
        }

        fn run(&self, options: &PreparationOptions) -> Preparation {
            let vad = VoiceActivityStage {
                detector: &self.vad,
                reader: &StubReader,
                writer: &StubWriter,
            };
            PreparationPipeline::new(&self.tool, Some(&self.separator), Some(vad), &self.settings)
                .run(self.source(), options, &mut NullPipelineLogger)
        }
    }

    fn ready(prep: Preparation) -> (ArtifactSet, Option<u64>) {
        match prep {
            Preparation::Ready {
                artifacts,
                duration,
            } => (artifacts, duration),
            Preparation::TooLong(secs) => panic!("unexpected abort at {secs}s"),
        }
    }

    fn ends_with(artifact: &AudioArtifact, suffix: &str) -> bool {
        artifact.path().to_string_lossy().ends_with(suffix)
    }

    #[test]
    fn test_all_stages_succeed_for_speech() {
        let rig = Rig::new(StubTool::new().with_duration(42));
        let (set, duration) = ready(rig.run(&options(false)));

        assert_eq!(duration, Some(42));
        assert!(ends_with(&set.clean, "in.mp3.WAV.wav"));
        assert_eq!(set.clean.stage(), StageKind::Normalize);
        assert!(ends_with(&set.no_cut, ".WAV.wav.vocals.wav"));
        assert_eq!(set.vocals.as_ref(), Some(&set.no_cut));
        assert!(ends_with(&set.processed, ".vocals.wav.SILCUT.wav.VAD.wav"));
        assert!(set.remix.is_none());
        assert_eq!(
            rig.tool.ops(),
            ["normalize", "probe_duration", "trim_silence"]
        );
    }

    #[test]
    fn test_failed_normalize_keeps_source() {
        let rig = Rig::new(StubTool::new().failing("normalize"));
        let (set, _) = ready(rig.run(&options(false)));
        assert_eq!(set.clean, rig.source());
    }

    #[test]
    fn test_failed_stretch_keeps_normalized() {
        let rig = Rig::new(StubTool::new().failing("stretch"));
        let mut opts = options(false);
        opts.stretch = Some(1.25);
        let (set, _) = ready(rig.run(&opts));
        assert!(ends_with(&set.clean, "in.mp3.WAV.wav"));
    }

    #[test]
    fn test_stretch_replaces_clean() {
        let rig = Rig::new(StubTool::new());
        let mut opts = options(false);
        opts.stretch = Some(1.25);
        let (set, _) = ready(rig.run(&opts));
        assert!(ends_with(&set.clean, ".WAV.wav.STRETCH.wav"));
    }

    #[test]
    fn test_failed_separation_uses_clean_as_no_cut() {
        let mut rig = Rig::new(StubTool::new());
        rig.separator = StubSeparator::new(true);
        let (set, _) = ready(rig.run(&options(false)));

        assert_eq!(set.no_cut, set.clean);
        assert!(set.vocals.is_none());
    }

    #[test]
    fn test_failed_trim_keeps_no_cut() {
        let mut rig = Rig::new(StubTool::new().failing("trim_silence"));
        rig.vad = StubVad(vec![]);
        let (set, _) = ready(rig.run(&options(false)));
        assert_eq!(set.processed, set.no_cut);
    }

    #[test]
    fn test_no_speech_keeps_trimmed() {
        let mut rig = Rig::new(StubTool::new());
        rig.vad = StubVad(vec![]);
        let (set, _) = ready(rig.run(&options(false)));
        assert!(ends_with(&set.processed, ".SILCUT.wav"));
    }

    #[test]
    fn test_too_long_aborts_before_separation() {
        let rig = Rig::new(StubTool::new().with_duration(700));
        assert_eq!(rig.run(&options(false)), Preparation::TooLong(700));
        assert_eq!(rig.separator.calls(), 0);
    }

    #[test]
    fn test_unknown_duration_never_aborts() {
        let rig = Rig::new(StubTool::new().failing("probe_duration"));
        let (_, duration) = ready(rig.run(&options(false)));
        assert_eq!(duration, None);
    }

    #[test]
    fn test_music_skips_vad_and_builds_remix() {
        let rig = Rig::new(StubTool::new());
        let (set, _) = ready(rig.run(&options(true)));

        assert!(ends_with(&set.processed, ".vocals.wav.SILCUT.wav"));
        let remix = set.remix.unwrap();
        assert!(ends_with(&remix, ".vocals.wav.NORM.wav.REMIX.wav"));
        assert_eq!(remix.stage(), StageKind::Remix);
        assert_eq!(
            rig.tool.ops(),
            ["normalize", "probe_duration", "trim_silence", "speech_norm", "mix"]
        );
    }

    #[test]
    fn test_failed_speech_norm_mixes_raw_vocals() {
        let rig = Rig::new(StubTool::new().failing("speech_norm"));
        let (set, _) = ready(rig.run(&options(true)));
        assert!(ends_with(&set.remix.unwrap(), ".vocals.wav.REMIX.wav"));
    }

    #[test]
    fn test_failed_mix_leaves_remix_unset() {
        let rig = Rig::new(StubTool::new().failing("mix"));
        let (set, _) = ready(rig.run(&options(true)));
        assert!(set.remix.is_none());
    }

    #[rstest::rstest]
    #[case::full_mix(1.0, "in.mp3.WAV.wav")]
    #[case::vocals_only(0.0, ".WAV.wav.vocals.wav")]
    fn test_remix_factor_extremes(#[case] factor: f64, #[case] suffix: &str) {
        let rig = Rig::new(StubTool::new());
        let mut opts = options(true);
        opts.remix_factor = factor;
        let (set, _) = ready(rig.run(&opts));
        assert!(ends_with(&set.remix.unwrap(), suffix));
        assert!(!rig.tool.ops().contains(&"mix".to_string()));
    }

    #[test]
    fn test_stage_timings_are_reported() {
        let rig = Rig::new(StubTool::new());
        let mut logger = StdoutPipelineLogger::new();
        let vad = VoiceActivityStage {
            detector: &rig.vad,
            reader: &StubReader,
            writer: &StubWriter,
        };
        PreparationPipeline::new(&rig.tool, Some(&rig.separator), Some(vad), &rig.settings)
            .run(rig.source(), &options(false), &mut logger);

        for stage in ["normalize", "duration", "separation", "silence_trim", "vad"] {
            assert!(logger.timings_for(stage).is_some(), "{stage}");
        }
    }
}
