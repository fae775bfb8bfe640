use std::path::{Path, PathBuf};

use thiserror::Error;

use super::transcription_result::TranscriptionResult;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("no API key configured for the remote transcription service")]
    MissingKey,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("unexpected payload from {url}: {message}")]
    Payload { url: String, message: String },
    #[error("result not ready after {attempts} polls")]
    NotReady { attempts: u32 },
}

/// Domain interface for the cloud transcription fallback.
pub trait RemoteTranscriber: Send + Sync {
    /// Transcribe `audio` spoken in `source_language`, translated to
    /// `target_language` when they differ.
    fn transcribe(
        &self,
        audio: &Path,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranscriptionResult, RemoteError>;
}
