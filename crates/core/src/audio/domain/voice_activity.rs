use super::audio_segment::AudioSegment;

/// A span of detected speech, in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeechSpan {
    pub start: usize,
    pub end: usize,
}

impl SpeechSpan {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Domain interface for voice-activity detection.
pub trait VoiceActivityDetector: Send + Sync {
    /// Speech spans of `audio`, ordered and non-overlapping.
    fn speech_spans(&self, audio: &AudioSegment) -> Vec<SpeechSpan>;
}

/// Keep only the samples inside `spans`, concatenated in order.
pub fn collect_speech(audio: &AudioSegment, spans: &[SpeechSpan]) -> AudioSegment {
    let samples = audio.samples();
    let mut kept = Vec::with_capacity(spans.iter().map(SpeechSpan::len).sum());
    for span in spans {
        let end = span.end.min(samples.len());
        if span.start < end {
            kept.extend_from_slice(&samples[span.start..end]);
        }
    }
    AudioSegment::new(kept, audio.sample_rate(), audio.channels())
}
