use crate::TransformError;
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// Rigid frame in the global coordinate system: a 3x3 rotation and a
/// translation, held as separate values.
///
/// The rotation block is always invertible; its inverse is cached so
/// [`RigidFrame::inverse`] cannot fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidFrame {
    rotation: Matrix3<f32>,
    rotation_inv: Matrix3<f32>,
    translation: Vector3<f32>,
}

impl RigidFrame {
    pub fn new(rotation: Matrix3<f32>, translation: Vector3<f32>) -> Result<Self, TransformError> {
        let rotation_inv = rotation
            .try_inverse()
            .ok_or(TransformError::SingularRotation)?;
        Ok(Self {
            rotation,
            rotation_inv,
            translation,
        })
    }

    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            rotation_inv: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Copy the rotation and translation blocks out of a 4x4 homogeneous
    /// transform. The bottom row must be `[0, 0, 0, 1]`.
    pub fn from_homogeneous(matrix: &Matrix4<f32>) -> Result<Self, TransformError> {
        let bottom = [matrix[(3, 0)], matrix[(3, 1)], matrix[(3, 2)], matrix[(3, 3)]];
        if bottom != [0.0, 0.0, 0.0, 1.0] {
            return Err(TransformError::NotHomogeneous(bottom));
        }

        let rotation: Matrix3<f32> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let translation: Vector3<f32> = matrix.fixed_view::<3, 1>(0, 3).into_owned();
        Self::new(rotation, translation)
    }

    /// 16 values, row-major.
    pub fn from_row_slice(values: &[f32]) -> Result<Self, TransformError> {
        if values.len() != 16 {
            return Err(TransformError::MalformedInput {
                expected: 16,
                actual: values.len(),
            });
        }
        Self::from_homogeneous(&Matrix4::from_row_slice(values))
    }

    pub fn rotation(&self) -> &Matrix3<f32> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<f32> {
        &self.translation
    }

    pub fn to_homogeneous(&self) -> Matrix4<f32> {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        matrix
    }

    /// `[R^-1 | -R^-1 T]`, built from the rotation block.
    pub fn inverse(&self) -> Self {
        Self {
            rotation: self.rotation_inv,
            rotation_inv: self.rotation,
            translation: -(self.rotation_inv * self.translation),
        }
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &RigidFrame) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            rotation_inv: other.rotation_inv * self.rotation_inv,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Apply to a homogeneous point.
    pub fn transform(&self, point: &Vector4<f32>) -> Vector4<f32> {
        self.to_homogeneous() * point
    }
}

impl Default for RigidFrame {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rz90_translated() -> RigidFrame {
        RigidFrame::new(
            Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            Vector3::new(1.0, 2.0, 3.0),
        )
        .unwrap()
    }

    #[test]
    fn test_homogeneous_round_trip() {
        let frame = rz90_translated();
        let back = RigidFrame::from_homogeneous(&frame.to_homogeneous()).unwrap();
        assert_eq!(frame, back);
    }

    #[test]
    fn test_blocks_are_copied() {
        let mut matrix = rz90_translated().to_homogeneous();
        let frame = RigidFrame::from_homogeneous(&matrix).unwrap();

        matrix[(0, 3)] = 100.0;
        matrix[(0, 0)] = 5.0;

        assert_eq!(frame.translation()[0], 1.0);
        assert_eq!(frame.rotation()[(0, 0)], 0.0);
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let frame = rz90_translated();
        let product = frame.compose(&frame.inverse()).to_homogeneous();

        assert!(
            (product - Matrix4::identity()).abs().max() < 1e-6,
            "T * T^-1 should be identity, got {}",
            product
        );
    }

    #[test]
    fn test_inverse_matches_generic_inverse() {
        let frame = rz90_translated();
        let generic = frame.to_homogeneous().try_inverse().unwrap();
        let rigid = frame.inverse().to_homogeneous();

        assert!((generic - rigid).abs().max() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_bottom_row() {
        let mut matrix = Matrix4::<f32>::identity();
        matrix[(3, 0)] = 1.0;

        assert!(matches!(
            RigidFrame::from_homogeneous(&matrix),
            Err(TransformError::NotHomogeneous(_))
        ));
    }

    #[test]
    fn test_rejects_singular_rotation() {
        let mut matrix = Matrix4::<f32>::identity();
        matrix[(2, 2)] = 0.0;

        assert_eq!(
            RigidFrame::from_homogeneous(&matrix),
            Err(TransformError::SingularRotation)
        );
    }

    #[test]
    fn test_from_row_slice_checks_length() {
        assert_eq!(
            RigidFrame::from_row_slice(&[1.0; 9]),
            Err(TransformError::MalformedInput {
                expected: 16,
                actual: 9
            })
        );

        let values = [
            1.0, 0.0, 0.0, 4.0, //
            0.0, 1.0, 0.0, 5.0, //
            0.0, 0.0, 1.0, 6.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let frame = RigidFrame::from_row_slice(&values).unwrap();
        assert_eq!(frame.translation(), &Vector3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_transform_point() {
        let frame = rz90_translated();
        let p = frame.transform(&Vector4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(p, Vector4::new(1.0, 3.0, 3.0, 1.0));
    }
}
