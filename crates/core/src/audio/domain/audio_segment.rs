/// Decoded PCM audio: interleaved samples normalized to [-1.0, 1.0].
///
/// The recognizer and the voice-activity stage both work on 16 kHz mono
/// segments decoded from an [`AudioArtifact`](super::audio_artifact::AudioArtifact).
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Number of interleaved samples covering `millis` milliseconds.
    pub fn samples_for_millis(&self, millis: u32) -> usize {
        (millis as u64 * self.sample_rate as u64 * self.channels as u64 / 1000) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_creates_segment_with_correct_fields() {
        let samples = vec![0.0f32; 16000];
        let seg = AudioSegment::new(samples.clone(), 16000, 1);
        assert_eq!(seg.samples(), &samples[..]);
        assert_eq!(seg.sample_rate(), 16000);
        assert_eq!(seg.channels(), 1);
    }

    #[test]
    fn test_duration_mono() {
        let seg = AudioSegment::new(vec![0.0; 48000], 16000, 1);
        assert_relative_eq!(seg.duration(), 3.0);
    }

    #[test]
    fn test_duration_of_degenerate_segment_is_zero() {
        let seg = AudioSegment::new(vec![0.0; 10], 0, 1);
        assert_relative_eq!(seg.duration(), 0.0);
    }

    #[test]
    fn test_samples_for_millis() {
        let seg = AudioSegment::new(Vec::new(), 16000, 1);
        assert_eq!(seg.samples_for_millis(30), 480);
        assert_eq!(seg.samples_for_millis(500), 8000);
        assert!(seg.is_empty());
    }
}
