use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_MARKER_DIR, DEFAULT_MAX_LINE_COUNT, DEFAULT_MAX_LINE_WIDTH, DEFAULT_REMIX_FACTOR,
    MARKER_MAX_DURATION_SECS, MAX_DURATION_SECS, REMOTE_API_URL, REMOTE_KEY_ENV,
    REMOTE_MAX_POLL_ATTEMPTS, REMOTE_POLL_INTERVAL_SECS, SAMPLING_RATE, TRUNC_DURATION_SECS,
};
use crate::transcription::domain::speech_recognizer::DecodingOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Which vocal-separation engine runs. Never more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparatorKind {
    Demucs,
    Spleeter,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparatorSettings {
    pub kind: SeparatorKind,
    /// Executable to run; defaults to the engine's own name on `PATH`.
    pub command: Option<PathBuf>,
    pub model: Option<String>,
    pub device: Option<String>,
}

impl Default for SeparatorSettings {
    fn default() -> Self {
        Self {
            kind: SeparatorKind::Demucs,
            command: None,
            model: None,
            device: None,
        }
    }
}

/// Spam-phrase scoring used by best-of-N subtitle selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HallucinationSettings {
    pub phrases: Vec<String>,
    /// Candidates scoring at or below this are accepted without further tries.
    pub threshold: usize,
    /// Input languages for which the full selection chain runs.
    pub languages: Vec<String>,
}

impl Default for HallucinationSettings {
    fn default() -> Self {
        Self {
            phrases: vec!["Hãy đăng ký kênh".to_string(), "subscribe cho".to_string()],
            threshold: 2,
            languages: vec!["vi".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: REMOTE_API_URL.to_string(),
            api_key: None,
            poll_interval_secs: REMOTE_POLL_INTERVAL_SECS,
            max_poll_attempts: REMOTE_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Every tunable of the preparation and transcription pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscribeConfig {
    pub ffmpeg: PathBuf,
    pub sample_rate: u32,
    pub max_duration_secs: u64,
    pub trunc_duration_secs: f64,
    pub marker_dir: PathBuf,
    pub marker_max_duration_secs: u64,
    pub no_mark_languages: Vec<String>,
    pub compressor: bool,
    pub separator: SeparatorSettings,
    pub silence_threshold_db: f64,
    pub silence_min_secs: f64,
    pub vad_enabled: bool,
    pub vad_rms_threshold: f32,
    pub vad_min_silence_ms: u32,
    pub remix_factor: f64,
    pub speech_norm: bool,
    pub hallucination: HallucinationSettings,
    pub remote: RemoteSettings,
    pub decoding: DecodingOptions,
    pub max_line_width: usize,
    pub max_line_count: usize,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            sample_rate: SAMPLING_RATE,
            max_duration_secs: MAX_DURATION_SECS,
            trunc_duration_secs: TRUNC_DURATION_SECS,
            marker_dir: PathBuf::from(DEFAULT_MARKER_DIR),
            marker_max_duration_secs: MARKER_MAX_DURATION_SECS,
            no_mark_languages: ["ar", "he", "ru", "zh"].map(String::from).to_vec(),
            compressor: true,
            separator: SeparatorSettings::default(),
            silence_threshold_db: -50.0,
            silence_min_secs: 0.2,
            vad_enabled: true,
            vad_rms_threshold: 0.01,
            vad_min_silence_ms: 500,
            remix_factor: DEFAULT_REMIX_FACTOR,
            speech_norm: true,
            hallucination: HallucinationSettings::default(),
            remote: RemoteSettings::default(),
            decoding: DecodingOptions::default(),
            max_line_width: DEFAULT_MAX_LINE_WIDTH,
            max_line_count: DEFAULT_MAX_LINE_COUNT,
        }
    }
}

impl TranscribeConfig {
    /// `<config_dir>/WhisperGuard/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("WhisperGuard").join("config.json"))
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when it
    /// exists, else defaults. An explicit path that cannot be read is an error.
    ///
    /// The remote API key falls back to the `WHISPERGUARD_REMOTE_KEY`
    /// environment variable.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        if config.remote.api_key.is_none() {
            config.remote.api_key = std::env::var(REMOTE_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_no_mark_language(&self, language: &str) -> bool {
        self.no_mark_languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }
}
