pub mod segment_shaper;
pub mod subtitle_formatter;
