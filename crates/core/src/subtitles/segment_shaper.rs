use crate::transcription::domain::speech_recognizer::RecognizedSegment;
use crate::transcription::domain::transcription_result::{Segment, Word};

/// Engine segments in payload shape: trimmed sentences, and word timings
/// only when they were requested.
pub fn shape_segments(recognized: &[RecognizedSegment], include_words: bool) -> Vec<Segment> {
    recognized
        .iter()
        .map(|seg| Segment {
            start: seg.start,
            end: seg.end,
            sentence: seg.text.trim().to_string(),
            words: if include_words {
                seg.words
                    .iter()
                    .map(|w| Word {
                        start: w.start,
                        end: w.end,
                        text: w.text.trim().to_string(),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect()
}
