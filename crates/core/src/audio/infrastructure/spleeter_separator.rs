use std::path::{Path, PathBuf};
use std::process::Command;

use super::command_runner::{ensure_output, log_path_for, run_logged};
use crate::audio::domain::stage_error::StageError;
use crate::audio::domain::vocal_separator::{SeparatedStems, VocalSeparator};

pub const DEFAULT_SPLEETER_MODEL: &str = "spleeter:2stems-16kHz";

/// Two-stem separation through the `spleeter` command-line tool.
///
/// Produces `<input>.spleeter/<input stem>/{vocals,accompaniment}.wav`.
#[derive(Clone, Debug)]
pub struct SpleeterSeparator {
    command: PathBuf,
    model: String,
}

impl SpleeterSeparator {
    pub fn new(command: impl Into<PathBuf>, model: &str) -> Self {
        Self {
            command: command.into(),
            model: model.to_string(),
        }
    }
}

impl VocalSeparator for SpleeterSeparator {
    fn name(&self) -> &'static str {
        "spleeter"
    }

    fn separate(&self, input: &Path) -> Result<SeparatedStems, StageError> {
        let mut out_root = input.as_os_str().to_os_string();
        out_root.push(".spleeter");
        let out_root = PathBuf::from(out_root);

        let mut cmd = Command::new(&self.command);
        cmd.arg("separate")
            .args(["-p", &self.model])
            .arg("-o")
            .arg(&out_root)
            .arg(input);
        run_logged(cmd, &log_path_for(&out_root))?;

        let track = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        let stem_dir = out_root.join(track);
        let vocals = stem_dir.join("vocals.wav");
        let accompaniment = stem_dir.join("accompaniment.wav");
        ensure_output(&vocals)?;
        ensure_output(&accompaniment)?;

        Ok(SeparatedStems {
            vocals,
            accompaniment: vec![accompaniment],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_command_fails() {
        let sep = SpleeterSeparator::new("/nonexistent/spleeter", DEFAULT_SPLEETER_MODEL);
        let tmp = tempfile::TempDir::new().unwrap();
        let result = sep.separate(&tmp.path().join("in.wav"));
        assert!(result.is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(SpleeterSeparator::new("spleeter", DEFAULT_SPLEETER_MODEL).name(), "spleeter");
    }
}
