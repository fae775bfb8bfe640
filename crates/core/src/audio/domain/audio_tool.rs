use std::path::Path;

use super::stage_error::StageError;

/// Start/end offsets, in seconds, kept when re-encoding the input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimWindow {
    pub begin: f64,
    pub end: f64,
}

/// Parameters of the silence-removal filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SilenceFilter {
    pub threshold_db: f64,
    pub min_silence_secs: f64,
}

/// One input of a weighted mix.
#[derive(Clone, Copy, Debug)]
pub struct MixInput<'a> {
    pub path: &'a Path,
    pub weight: f64,
}

/// Domain interface for the external audio format/filter tool.
///
/// Every operation reads its inputs and writes a new file at `output`. Inputs
/// are never modified. All calls block until the tool exits.
pub trait AudioTool: Send + Sync {
    /// Re-encode to mono PCM at `sample_rate`, keeping only `window`.
    ///
    /// Returns the input duration in whole seconds if the tool reported one.
    fn normalize(
        &self,
        input: &Path,
        output: &Path,
        window: TrimWindow,
        sample_rate: u32,
    ) -> Result<Option<u64>, StageError>;

    /// Time-stretch by `factor`, keeping at most `max_secs` of input.
    fn stretch(
        &self,
        input: &Path,
        output: &Path,
        factor: f64,
        max_secs: f64,
        sample_rate: u32,
    ) -> Result<(), StageError>;

    /// Decode the whole file and report its duration in whole seconds.
    ///
    /// `Ok(None)` means the tool ran but reported no usable duration.
    fn probe_duration(&self, input: &Path) -> Result<Option<u64>, StageError>;

    /// Remove silences and normalize loudness.
    fn trim_silence(
        &self,
        input: &Path,
        output: &Path,
        filter: SilenceFilter,
        sample_rate: u32,
    ) -> Result<(), StageError>;

    /// Dynamic speech normalization.
    fn speech_norm(&self, input: &Path, output: &Path, sample_rate: u32)
        -> Result<(), StageError>;

    /// Weighted mix of several inputs; the output lasts as long as the longest.
    fn mix(&self, inputs: &[MixInput<'_>], output: &Path) -> Result<(), StageError>;

    /// Concatenate `parts` back to back.
    fn concat(&self, parts: &[&Path], output: &Path, sample_rate: u32)
        -> Result<(), StageError>;
}
