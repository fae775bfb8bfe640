use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;

use super::command_runner::{ensure_output, log_path_for, run_logged};
use crate::audio::domain::audio_tool::{AudioTool, MixInput, SilenceFilter, TrimWindow};
use crate::audio::domain::stage_error::StageError;

static DURATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^ *Duration: ([0-9]{2}):([0-9]{2}):([0-9]{2})\.[0-9]{2},")
        .expect("valid static regex")
});
static PROGRESS_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)time=([0-9]{2}):([0-9]{2}):([0-9]{2})\.[0-9]{2}")
        .expect("valid static regex")
});

const SPEECH_NORM_FILTER: &str = "speechnorm=e=50:r=0.0005:l=1";

/// [`AudioTool`] backed by the `ffmpeg` command-line program.
///
/// Each call spawns one process and writes its stderr next to the output as
/// `<output>.log`.
#[derive(Clone, Debug)]
pub struct FfmpegCli {
    binary: PathBuf,
}

impl FfmpegCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-y").arg("-hide_banner");
        cmd
    }

    fn run_to(&self, cmd: Command, output: &Path) -> Result<String, StageError> {
        let log = run_logged(cmd, &log_path_for(output))?;
        ensure_output(output)?;
        Ok(log)
    }
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl AudioTool for FfmpegCli {
    fn normalize(
        &self,
        input: &Path,
        output: &Path,
        window: TrimWindow,
        sample_rate: u32,
    ) -> Result<Option<u64>, StageError> {
        let mut cmd = self.command();
        cmd.arg("-i")
            .arg(input)
            .args(["-ss", &format_secs(window.begin)])
            .args(["-to", &format_secs(window.end)]);
        pcm_output(&mut cmd, sample_rate, output);
        let log = self.run_to(cmd, output)?;
        Ok(duration_from_log(&log))
    }

    fn stretch(
        &self,
        input: &Path,
        output: &Path,
        factor: f64,
        max_secs: f64,
        sample_rate: u32,
    ) -> Result<(), StageError> {
        let mut cmd = self.command();
        cmd.arg("-i")
            .arg(input)
            .args(["-t", &format_secs(max_secs)])
            .args(["-filter:a", &format!("atempo={factor}")]);
        pcm_output(&mut cmd, sample_rate, output);
        self.run_to(cmd, output).map(|_| ())
    }

    fn probe_duration(&self, input: &Path) -> Result<Option<u64>, StageError> {
        let mut cmd = self.command();
        cmd.arg("-i").arg(input).args(["-f", "null", "-"]);
        let mut log_path = input.as_os_str().to_os_string();
        log_path.push(".dur");
        let log = run_logged(cmd, Path::new(&log_path))?;
        Ok(duration_from_log(&log))
    }

    fn trim_silence(
        &self,
        input: &Path,
        output: &Path,
        filter: SilenceFilter,
        sample_rate: u32,
    ) -> Result<(), StageError> {
        let graph = format!(
            "silenceremove=start_periods=1:stop_periods=-1:\
             start_threshold={db}dB:stop_threshold={db}dB:\
             start_silence={secs}:stop_silence={secs}, loudnorm",
            db = filter.threshold_db,
            secs = filter.min_silence_secs,
        );
        let mut cmd = self.command();
        cmd.arg("-i").arg(input).args(["-af", &graph]);
        pcm_output(&mut cmd, sample_rate, output);
        self.run_to(cmd, output).map(|_| ())
    }

    fn speech_norm(
        &self,
        input: &Path,
        output: &Path,
        sample_rate: u32,
    ) -> Result<(), StageError> {
        let mut cmd = self.command();
        cmd.arg("-i").arg(input).args(["-af", SPEECH_NORM_FILTER]);
        pcm_output(&mut cmd, sample_rate, output);
        self.run_to(cmd, output).map(|_| ())
    }

    fn mix(&self, inputs: &[MixInput<'_>], output: &Path) -> Result<(), StageError> {
        let mut cmd = self.command();
        for input in inputs {
            cmd.arg("-i").arg(input.path);
        }
        let weights: Vec<String> = inputs.iter().map(|i| i.weight.to_string()).collect();
        let graph = format!(
            "amix=inputs={}:duration=longest:dropout_transition=0:weights='{}'",
            inputs.len(),
            weights.join(" ")
        );
        cmd.args(["-filter_complex", &graph]).arg(output);
        self.run_to(cmd, output).map(|_| ())
    }

    fn concat(&self, parts: &[&Path], output: &Path, sample_rate: u32) -> Result<(), StageError> {
        let mut cmd = self.command();
        let mut labels = String::new();
        for (idx, part) in parts.iter().enumerate() {
            cmd.arg("-i").arg(part);
            labels.push_str(&format!("[{idx}:a]"));
        }
        let graph = format!("{labels}concat=n={}:v=0:a=1[a]", parts.len());
        cmd.args(["-filter_complex", &graph]).args(["-map", "[a]"]);
        pcm_output(&mut cmd, sample_rate, output);
        self.run_to(cmd, output).map(|_| ())
    }
}

fn pcm_output(cmd: &mut Command, sample_rate: u32, output: &Path) {
    cmd.args(["-c:a", "pcm_s16le", "-ac", "1"])
        .args(["-ar", &sample_rate.to_string()])
        .arg(output);
}

fn format_secs(secs: f64) -> String {
    format!("{secs:.3}")
}

/// Whole seconds reported in an ffmpeg log.
///
/// Prefers the container `Duration:` header; otherwise the last progress
/// `time=` entry. Returns `None` when neither is present or the time is zero.
pub fn duration_from_log(log: &str) -> Option<u64> {
    if let Some(caps) = DURATION_LINE.captures(log) {
        return Some(hms_to_secs(&caps[1], &caps[2], &caps[3]));
    }
    PROGRESS_TIME
        .captures_iter(log)
        .last()
        .map(|caps| hms_to_secs(&caps[1], &caps[2], &caps[3]))
        .filter(|&secs| secs > 0)
}

fn hms_to_secs(h: &str, m: &str, s: &str) -> u64 {
    let parse = |v: &str| v.parse::<u64>().unwrap_or(0);
    parse(h) * 3600 + parse(m) * 60 + parse(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HEADER_LOG: &str = "Input #0, mp3, from 'song.mp3':\n  \
        Duration: 00:03:25.47, start: 0.025057, bitrate: 320 kb/s\n  \
        Stream #0:0: Audio: mp3\n\
        size=N/A time=00:03:25.44 bitrate=N/A speed= 412x\n";

    #[test]
    fn test_duration_header_wins() {
        assert_eq!(duration_from_log(HEADER_LOG), Some(205));
    }

    #[test]
    fn test_last_progress_time_used_without_header() {
        let log = "size=N/A time=00:00:10.00 bitrate=N/A\rsize=N/A time=00:01:02.50 bitrate=N/A\n";
        assert_eq!(duration_from_log(log), Some(62));
    }

    #[rstest]
    #[case::empty("")]
    #[case::zero_progress("size=N/A time=00:00:00.00 bitrate=N/A\n")]
    #[case::unrelated("Error opening input file missing.wav.\n")]
    fn test_unknown_duration(#[case] log: &str) {
        assert_eq!(duration_from_log(log), None);
    }

    #[test]
    fn test_header_is_case_insensitive() {
        assert_eq!(duration_from_log("  DURATION: 01:00:00.00, start: 0\n"), Some(3600));
    }

    #[test]
    fn test_missing_binary_fails_stage() {
        let tool = FfmpegCli::new("/nonexistent/ffmpeg");
        let tmp = tempfile::TempDir::new().unwrap();
        let result = tool.speech_norm(
            &tmp.path().join("in.wav"),
            &tmp.path().join("out.wav"),
            16000,
        );
        assert!(matches!(result, Err(StageError::Spawn { .. })));
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(600.0), "600.000");
        assert_eq!(format_secs(1.5), "1.500");
    }
}
