mod command_runner;
pub mod demucs_separator;
pub mod energy_vad;
pub mod ffmpeg_audio_reader;
pub mod ffmpeg_cli;
pub mod separator_factory;
pub mod spleeter_separator;
pub mod wav_file_writer;
