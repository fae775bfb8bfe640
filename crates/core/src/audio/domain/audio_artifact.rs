use std::fmt;
use std::path::{Path, PathBuf};

/// Preparation step that produced an artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Source,
    Normalize,
    Stretch,
    Separation,
    SilenceTrim,
    VoiceActivity,
    SpeechNorm,
    Remix,
    Marker,
    MarkerReversed,
    Compressor,
}

impl StageKind {
    /// Suffix appended to the parent path for files this stage writes.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            StageKind::Source => "",
            StageKind::Normalize => ".WAV.wav",
            StageKind::Stretch => ".STRETCH.wav",
            StageKind::Separation => ".vocals.wav",
            StageKind::SilenceTrim => ".SILCUT.wav",
            StageKind::VoiceActivity => ".VAD.wav",
            StageKind::SpeechNorm => ".NORM.wav",
            StageKind::Remix => ".REMIX.wav",
            StageKind::Marker => ".MRK.wav",
            StageKind::MarkerReversed => ".RMRK.wav",
            StageKind::Compressor => ".CPS.wav",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Source => "source",
            StageKind::Normalize => "normalize",
            StageKind::Stretch => "stretch",
            StageKind::Separation => "separation",
            StageKind::SilenceTrim => "silence_trim",
            StageKind::VoiceActivity => "vad",
            StageKind::SpeechNorm => "speech_norm",
            StageKind::Remix => "remix",
            StageKind::Marker => "marker",
            StageKind::MarkerReversed => "marker_reversed",
            StageKind::Compressor => "compressor",
        };
        f.write_str(name)
    }
}

/// Handle to an audio file on disk plus where it came from.
///
/// Artifacts are immutable: a stage derives a new artifact from its input and
/// never rewrites the input file.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioArtifact {
    path: PathBuf,
    stage: StageKind,
    parent: Option<PathBuf>,
}

impl AudioArtifact {
    pub fn source(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stage: StageKind::Source,
            parent: None,
        }
    }

    /// Artifact produced by `stage` from `self`, written at `path`.
    pub fn derive(&self, stage: StageKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stage,
            parent: Some(self.path.clone()),
        }
    }

    /// Conventional output location for `stage` applied to this artifact.
    pub fn derived_path(&self, stage: StageKind) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(stage.file_suffix());
        PathBuf::from(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn parent(&self) -> Option<&Path> {
        self.parent.as_deref()
    }
}

/// Named artifacts handed from preparation to transcription.
///
/// - `clean`: normalized (and optionally stretched) input, minimal processing
/// - `no_cut`: vocals before any trimming, or `clean` if separation failed
/// - `vocals`: raw vocal stem, if separation succeeded
/// - `processed`: `no_cut` after silence and voice-activity trimming
/// - `remix`: vocals recombined with the accompaniment, music only
#[derive(Clone, Debug, PartialEq)]
pub struct ArtifactSet {
    pub clean: AudioArtifact,
    pub no_cut: AudioArtifact,
    pub vocals: Option<AudioArtifact>,
    pub processed: AudioArtifact,
    pub remix: Option<AudioArtifact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_has_no_parent() {
        let a = AudioArtifact::source("/tmp/song.mp3");
        assert_eq!(a.stage(), StageKind::Source);
        assert!(a.parent().is_none());
    }

    #[test]
    fn test_derive_records_provenance() {
        let src = AudioArtifact::source("/tmp/song.mp3");
        let wav = src.derive(StageKind::Normalize, src.derived_path(StageKind::Normalize));
        assert_eq!(wav.path(), Path::new("/tmp/song.mp3.WAV.wav"));
        assert_eq!(wav.stage(), StageKind::Normalize);
        assert_eq!(wav.parent(), Some(Path::new("/tmp/song.mp3")));
    }

    #[test]
    fn test_derive_does_not_touch_parent() {
        let src = AudioArtifact::source("/tmp/a.wav");
        let before = src.clone();
        let _ = src.derive(StageKind::SilenceTrim, src.derived_path(StageKind::SilenceTrim));
        assert_eq!(src, before);
    }

    #[test]
    fn test_derived_paths_chain() {
        let src = AudioArtifact::source("in.wav");
        let wav = src.derive(StageKind::Normalize, src.derived_path(StageKind::Normalize));
        let cut = wav.derived_path(StageKind::SilenceTrim);
        assert_eq!(cut, PathBuf::from("in.wav.WAV.wav.SILCUT.wav"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(StageKind::VoiceActivity.to_string(), "vad");
        assert_eq!(StageKind::SilenceTrim.to_string(), "silence_trim");
    }
}
