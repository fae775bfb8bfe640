pub const SAMPLING_RATE: u32 = 16000;

/// Inputs longer than this are rejected before inference.
pub const MAX_DURATION_SECS: u64 = 600;
pub const TRUNC_DURATION_SECS: f64 = 600.0;

/// Marker confirmation is skipped for clips longer than this.
pub const MARKER_MAX_DURATION_SECS: u64 = 30;

pub const DEFAULT_MARKER_DIR: &str = "markers";
pub const DEFAULT_REMIX_FACTOR: f64 = 0.3;

pub const DEFAULT_MAX_LINE_WIDTH: usize = 80;
pub const DEFAULT_MAX_LINE_COUNT: usize = 2;

pub const DEFAULT_MODEL_SIZE: &str = "medium";

pub const REMOTE_API_URL: &str = "https://api.gladia.io/v2";
pub const REMOTE_KEY_ENV: &str = "WHISPERGUARD_REMOTE_KEY";
pub const REMOTE_POLL_INTERVAL_SECS: u64 = 5;
pub const REMOTE_MAX_POLL_ATTEMPTS: u32 = 12;

/// Text returned in place of a transcription when the input is too long.
pub fn too_long_sentinel(duration_secs: u64) -> String {
    format!("[Too long ({duration_secs}s)]")
}
