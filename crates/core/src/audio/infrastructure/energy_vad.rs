//! Energy-based voice activity detection.
//!
//! Audio is split into 30 ms frames; a frame counts as speech when its RMS
//! exceeds the threshold. Speech frames separated by less than the minimum
//! silence are merged into one span, and each span is padded on both sides
//! so word onsets are not clipped.

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::voice_activity::{SpeechSpan, VoiceActivityDetector};

pub const DEFAULT_RMS_THRESHOLD: f32 = 0.01;
pub const DEFAULT_MIN_SILENCE_MS: u32 = 500;
const FRAME_MS: u32 = 30;
const SPEECH_PAD_MS: u32 = 30;

pub struct EnergyVad {
    rms_threshold: f32,
    min_silence_ms: u32,
}

impl EnergyVad {
    pub fn new(rms_threshold: f32, min_silence_ms: u32) -> Self {
        Self {
            rms_threshold,
            min_silence_ms,
        }
    }

    fn is_voice_frame(&self, chunk: &[f32]) -> bool {
        if chunk.is_empty() {
            return false;
        }
        let mean_sq: f32 = chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32;
        mean_sq.sqrt() > self.rms_threshold
    }
}

impl Default for EnergyVad {
    fn default() -> Self {
        Self::new(DEFAULT_RMS_THRESHOLD, DEFAULT_MIN_SILENCE_MS)
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn speech_spans(&self, audio: &AudioSegment) -> Vec<SpeechSpan> {
        let samples = audio.samples();
        let frame = audio.samples_for_millis(FRAME_MS).max(1);
        let min_gap = audio.samples_for_millis(self.min_silence_ms);
        let pad = audio.samples_for_millis(SPEECH_PAD_MS);

        let mut spans: Vec<SpeechSpan> = Vec::new();
        for (idx, chunk) in samples.chunks(frame).enumerate() {
            if !self.is_voice_frame(chunk) {
                continue;
            }
            let start = idx * frame;
            let end = start + chunk.len();
            match spans.last_mut() {
                Some(last) if start - last.end < min_gap => last.end = end,
                _ => spans.push(SpeechSpan { start, end }),
            }
        }

        for span in &mut spans {
            span.start = span.start.saturating_sub(pad);
            span.end = (span.end + pad).min(samples.len());
        }
        // Padding may make neighbours touch.
        let mut merged: Vec<SpeechSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
                _ => merged.push(span),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;

    fn signal(parts: &[(usize, f32)]) -> AudioSegment {
        let mut samples = Vec::new();
        for &(len, level) in parts {
            samples.extend(std::iter::repeat(level).take(len));
        }
        AudioSegment::new(samples, RATE, 1)
    }

    #[test]
    fn test_all_silence_has_no_spans() {
        let audio = signal(&[(16000, 0.0)]);
        assert!(EnergyVad::default().speech_spans(&audio).is_empty());
    }

    #[test]
    fn test_single_burst_is_padded() {
        // 0.96 s silence, 0.48 s speech, 0.96 s silence (frames are 480 samples)
        let audio = signal(&[(15360, 0.0), (7680, 0.5), (15360, 0.0)]);
        let spans = EnergyVad::default().speech_spans(&audio);
        assert_eq!(spans, vec![SpeechSpan { start: 15360 - 480, end: 23040 + 480 }]);
    }

    #[test]
    fn test_short_gap_is_merged() {
        // 0.24 s gap < 0.5 s minimum silence
        let audio = signal(&[(4800, 0.5), (3840, 0.0), (4800, 0.5)]);
        let spans = EnergyVad::default().speech_spans(&audio);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 13440);
    }

    #[test]
    fn test_long_gap_splits_spans() {
        // 1.2 s gap > 0.5 s minimum silence
        let audio = signal(&[(4800, 0.5), (19200, 0.0), (4800, 0.5)]);
        let spans = EnergyVad::default().speech_spans(&audio);
        assert_eq!(spans.len(), 2);
        assert!(spans[0].end < spans[1].start);
    }

    #[test]
    fn test_threshold_respected() {
        let audio = signal(&[(4800, 0.005)]);
        assert!(EnergyVad::new(0.01, 500).speech_spans(&audio).is_empty());
        assert_eq!(EnergyVad::new(0.001, 500).speech_spans(&audio).len(), 1);
    }
}
