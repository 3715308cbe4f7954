use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid kernel size {0}: must be odd and at least 1")]
    InvalidKernel(u32),

    #[error("Resize failed: {0}")]
    Resize(String),

    #[error("Unknown filter kind: {0}")]
    UnknownFilter(String),
}
