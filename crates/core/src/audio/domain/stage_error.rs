use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single preparation step. Always recovered by the caller.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with status {status}: {detail}")]
    ExitStatus {
        command: String,
        status: i32,
        detail: String,
    },
    #[error("expected output not produced: {0}")]
    MissingOutput(PathBuf),
    #[error("audio I/O failed for {path}: {message}")]
    AudioIo { path: PathBuf, message: String },
    #[error("no speech detected in {0}")]
    NoSpeech(PathBuf),
}
