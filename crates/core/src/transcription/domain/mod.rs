pub mod candidate_selector;
pub mod hallucination;
pub mod inference_engine;
pub mod marker_confirmation;
pub mod phrase_patterns;
pub mod prompts;
pub mod remote_transcriber;
pub mod speech_recognizer;
pub mod transcription_result;
