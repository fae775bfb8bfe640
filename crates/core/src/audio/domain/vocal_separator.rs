use std::path::{Path, PathBuf};

use super::stage_error::StageError;

/// Output of a separation run.
///
/// `accompaniment` holds the non-vocal stems: drums, bass and other for a
/// four-stem model, a single accompaniment track for a two-stem model.
#[derive(Clone, Debug, PartialEq)]
pub struct SeparatedStems {
    pub vocals: PathBuf,
    pub accompaniment: Vec<PathBuf>,
}

/// Domain interface for a vocal-separation engine.
pub trait VocalSeparator: Send + Sync {
    fn name(&self) -> &'static str;

    fn separate(&self, input: &Path) -> Result<SeparatedStems, StageError>;
}
