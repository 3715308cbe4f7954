use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Corrupt frame: {0}")]
    CorruptFrame(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}
