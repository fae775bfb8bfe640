pub mod audio;
pub mod pipeline;
pub mod shared;
pub mod subtitles;
pub mod transcription;

#[cfg(test)]
mod test_support;
