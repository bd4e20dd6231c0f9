use thiserror::Error;

/// Errors produced by the sonification core.
#[derive(Error, Debug)]
pub enum SonifyError {
    #[error("Sequence numbers must strictly increase: index {index} has {current} after {previous}")]
    NonMonotonicSequence {
        index: usize,
        previous: u64,
        current: u64,
    },

    #[error("Tempo must be a finite number of seconds greater than zero, got {0}")]
    InvalidTempo(f64),

    #[error("Unknown style: {0}")]
    UnknownStyle(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid WAV data: {0}")]
    InvalidWav(String),

    #[error("Sample buffer of {bytes} bytes does not fit a RIFF container")]
    BufferTooLarge { bytes: u64 },

    #[error("Output device error: {0}")]
    Device(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SonifyError>;
