use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::audio::domain::stage_error::StageError;

/// Run `cmd` to completion, saving its stderr to `log_path`.
///
/// Returns the captured stderr, which is where ffmpeg-style tools report
/// durations and progress.
pub(crate) fn run_logged(mut cmd: Command, log_path: &Path) -> Result<String, StageError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    log::debug!("CMD: {cmd:?}");

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|source| StageError::Spawn {
            command: program.clone(),
            source,
        })?;

    let log = String::from_utf8_lossy(&output.stderr).into_owned();
    if let Err(e) = fs::write(log_path, &log) {
        log::warn!("Could not write tool log {}: {e}", log_path.display());
    }

    if !output.status.success() {
        return Err(StageError::ExitStatus {
            command: program,
            status: output.status.code().unwrap_or(-1),
            detail: last_line(&log).to_string(),
        });
    }
    Ok(log)
}

/// Fail unless `path` exists and is non-empty.
pub(crate) fn ensure_output(path: &Path) -> Result<(), StageError> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(StageError::MissingOutput(path.to_path_buf())),
    }
}

/// Sibling `.log` file for a tool writing `output`.
pub(crate) fn log_path_for(output: &Path) -> std::path::PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".log");
    name.into()
}

fn last_line(log: &str) -> &str {
    log.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_program_is_spawn_error() {
        let tmp = TempDir::new().unwrap();
        let cmd = Command::new("/nonexistent/tool-that-does-not-exist");
        let err = run_logged(cmd, &tmp.path().join("x.log")).unwrap_err();
        assert!(matches!(err, StageError::Spawn { .. }));
    }

    #[test]
    fn test_ensure_output_rejects_missing_and_empty() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.wav");
        assert!(ensure_output(&missing).is_err());

        let empty = tmp.path().join("empty.wav");
        fs::write(&empty, b"").unwrap();
        assert!(ensure_output(&empty).is_err());

        let full = tmp.path().join("full.wav");
        fs::write(&full, b"RIFF").unwrap();
        assert!(ensure_output(&full).is_ok());
    }

    #[test]
    fn test_log_path_for_appends_suffix() {
        assert_eq!(
            log_path_for(Path::new("/tmp/a.wav.SILCUT.wav")),
            Path::new("/tmp/a.wav.SILCUT.wav.log")
        );
    }

    #[test]
    fn test_last_line_skips_trailing_blank_lines() {
        assert_eq!(last_line("first\nsecond\n\n  \n"), "second");
        assert_eq!(last_line(""), "");
    }
}
