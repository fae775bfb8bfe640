//! SRT rendering: timestamps, greedy line wrapping and cue assembly.

use crate::shared::constants::{DEFAULT_MAX_LINE_COUNT, DEFAULT_MAX_LINE_WIDTH};
use crate::transcription::domain::transcription_result::Segment;

/// Line limits applied to each cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubtitleLayout {
    pub max_line_width: usize,
    pub max_line_count: usize,
}

impl Default for SubtitleLayout {
    fn default() -> Self {
        Self {
            max_line_width: DEFAULT_MAX_LINE_WIDTH,
            max_line_count: DEFAULT_MAX_LINE_COUNT,
        }
    }
}

/// Seconds as `HH:MM:SS.mmm`. Negative input clamps to zero.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

/// Greedy word wrap, keeping at most `layout.max_line_count` lines.
///
/// Words that do not fit in the kept lines are dropped. A word longer than
/// the width (unspaced CJK, URLs) is hard-split into width-sized chunks, so
/// no line ever exceeds `layout.max_line_width` characters.
pub fn wrap_text(text: &str, layout: SubtitleLayout) -> String {
    let width = layout.max_line_width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace().flat_map(|w| chunks(w, width)) {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + word_len + 1 > width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += word_len + 1;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.truncate(layout.max_line_count);
    lines.join("\n")
}

fn chunks(word: &str, width: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = word;
    while let Some((cut, _)) = rest.char_indices().nth(width) {
        parts.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    parts.push(rest);
    parts
}

/// One cue: index, time range, wrapped text and a blank separator line.
pub fn srt_cue(index: usize, start: f64, end: f64, text: &str, layout: SubtitleLayout) -> String {
    format!(
        "{index}\n{} --> {}\n{}\n\n",
        format_timestamp(start),
        format_timestamp(end),
        wrap_text(text.trim(), layout)
    )
}

/// Cues for `segments`, numbered consecutively from `first_index`.
pub fn build_srt(segments: &[Segment], first_index: usize, layout: SubtitleLayout) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(offset, seg)| srt_cue(first_index + offset, seg.start, seg.end, &seg.sentence, layout))
        .collect()
}
