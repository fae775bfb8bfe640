use std::path::{Path, PathBuf};
use std::process::Command;

use super::command_runner::{ensure_output, log_path_for, run_logged};
use crate::audio::domain::stage_error::StageError;
use crate::audio::domain::vocal_separator::{SeparatedStems, VocalSeparator};

pub const DEFAULT_DEMUCS_MODEL: &str = "htdemucs";

const ACCOMPANIMENT_STEMS: [&str; 3] = ["drums", "bass", "other"];

/// Four-stem separation through the `demucs` command-line tool.
///
/// Stems land in `<input>.demucs/<model>/<input stem>/{vocals,drums,bass,other}.wav`.
#[derive(Clone, Debug)]
pub struct DemucsSeparator {
    command: PathBuf,
    model: String,
    device: Option<String>,
}

impl DemucsSeparator {
    pub fn new(command: impl Into<PathBuf>, model: &str, device: Option<String>) -> Self {
        Self {
            command: command.into(),
            model: model.to_string(),
            device,
        }
    }

    fn stem_dir(&self, input: &Path) -> PathBuf {
        let mut out = input.as_os_str().to_os_string();
        out.push(".demucs");
        let track = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        PathBuf::from(out).join(&self.model).join(track)
    }
}

impl VocalSeparator for DemucsSeparator {
    fn name(&self) -> &'static str {
        "demucs"
    }

    fn separate(&self, input: &Path) -> Result<SeparatedStems, StageError> {
        let mut out_root = input.as_os_str().to_os_string();
        out_root.push(".demucs");

        let mut cmd = Command::new(&self.command);
        cmd.args(["-n", &self.model]);
        if let Some(ref device) = self.device {
            cmd.args(["-d", device]);
        }
        cmd.arg("-o").arg(&out_root).arg(input);

        run_logged(cmd, &log_path_for(Path::new(&out_root)))?;

        let stem_dir = self.stem_dir(input);

        let vocals = stem_dir.join("vocals.wav");
        ensure_output(&vocals)?;
        let accompaniment = ACCOMPANIMENT_STEMS
            .iter()
            .map(|stem| stem_dir.join(format!("{stem}.wav")))
            .collect::<Vec<_>>();
        for stem in &accompaniment {
            ensure_output(stem)?;
        }

        Ok(SeparatedStems {
            vocals,
            accompaniment,
        })
    }
}
