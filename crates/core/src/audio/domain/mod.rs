pub mod audio_artifact;
pub mod audio_reader;
pub mod audio_segment;
pub mod audio_tool;
pub mod audio_writer;
pub mod stage_error;
pub mod vocal_separator;
pub mod voice_activity;
