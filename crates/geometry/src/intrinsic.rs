use crate::TransformError;
use nalgebra::Matrix3;

/// Pinhole camera matrix. Invertibility is checked once at construction and
/// the inverse is kept alongside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntrinsicMatrix {
    matrix: Matrix3<f32>,
    inverse: Matrix3<f32>,
}

impl IntrinsicMatrix {
    pub fn new(matrix: Matrix3<f32>) -> Result<Self, TransformError> {
        let inverse = matrix
            .try_inverse()
            .ok_or(TransformError::SingularIntrinsic)?;
        Ok(Self { matrix, inverse })
    }

    /// 9 values, row-major.
    pub fn from_row_slice(values: &[f32]) -> Result<Self, TransformError> {
        if values.len() != 9 {
            return Err(TransformError::MalformedInput {
                expected: 9,
                actual: values.len(),
            });
        }
        Self::new(Matrix3::from_row_slice(values))
    }

    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
            inverse: Matrix3::identity(),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f32> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix3<f32> {
        &self.inverse
    }
}

impl Default for IntrinsicMatrix {
    fn default() -> Self {
        Self::identity()
    }
}
