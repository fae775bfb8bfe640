use std::path::Path;

use super::audio_segment::AudioSegment;

/// Domain interface for encoding PCM samples into a new audio file.
pub trait AudioWriter: Send + Sync {
    fn write_audio(
        &self,
        path: &Path,
        audio: &AudioSegment,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
