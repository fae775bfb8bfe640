pub mod gladia_transcriber;
pub mod whisper_recognizer;
