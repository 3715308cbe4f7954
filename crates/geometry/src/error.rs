use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Malformed input: expected {expected} components, got {actual}")]
    MalformedInput { expected: usize, actual: usize },

    #[error("Point projects to zero depth")]
    DegenerateDepth,

    #[error("Rotation block is not invertible")]
    SingularRotation,

    #[error("Intrinsic matrix is not invertible")]
    SingularIntrinsic,

    #[error("Bottom row of a homogeneous transform must be [0, 0, 0, 1], got {0:?}")]
    NotHomogeneous([f32; 4]),
}
