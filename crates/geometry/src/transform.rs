use crate::{IntrinsicMatrix, RigidFrame, TransformError};
use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

fn check_len(point: &[f32], expected: usize) -> Result<(), TransformError> {
    if point.len() != expected {
        return Err(TransformError::MalformedInput {
            expected,
            actual: point.len(),
        });
    }
    Ok(())
}

/// Back-project an image point `[x, y]` onto the normalized camera plane.
///
/// Returns the homogeneous camera point `(X, Y, 1, 1)`.
pub fn image_to_camera(
    intrinsic: &IntrinsicMatrix,
    point: &[f32],
) -> Result<Vector4<f32>, TransformError> {
    check_len(point, 2)?;

    let camera = intrinsic.inverse() * Vector3::new(point[0], point[1], 1.0);
    if camera.z == 0.0 {
        return Err(TransformError::DegenerateDepth);
    }
    let camera = camera / camera.z;

    Ok(Vector4::new(camera.x, camera.y, camera.z, 1.0))
}

/// Project a homogeneous camera point `[X, Y, Z, 1]` into the image.
pub fn camera_to_image(
    intrinsic: &IntrinsicMatrix,
    point: &[f32],
) -> Result<Vector2<f32>, TransformError> {
    check_len(point, 4)?;

    let image = intrinsic.matrix() * Vector3::new(point[0], point[1], point[2]);
    if image.z == 0.0 {
        return Err(TransformError::DegenerateDepth);
    }

    Ok(Vector2::new(image.x / image.z, image.y / image.z))
}

/// Conversions between the robot base frame and the end-effector frame.
///
/// Both composites are computed once when the transform is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    base: RigidFrame,
    end: RigidFrame,
    end_to_base: Matrix4<f32>,
    base_to_end: Matrix4<f32>,
}

impl FrameTransform {
    pub fn new(base: RigidFrame, end: RigidFrame) -> Self {
        Self {
            base,
            end,
            end_to_base: base.inverse().compose(&end).to_homogeneous(),
            base_to_end: end.inverse().compose(&base).to_homogeneous(),
        }
    }

    pub fn base(&self) -> &RigidFrame {
        &self.base
    }

    pub fn end(&self) -> &RigidFrame {
        &self.end
    }

    /// `inverse(base) * end * v` for a homogeneous 4-vector.
    pub fn end_to_base(&self, point: &[f32]) -> Result<Vector4<f32>, TransformError> {
        check_len(point, 4)?;
        Ok(self.end_to_base * Vector4::from_column_slice(point))
    }

    /// `inverse(end) * base * v` for a homogeneous 4-vector.
    pub fn base_to_end(&self, point: &[f32]) -> Result<Vector4<f32>, TransformError> {
        check_len(point, 4)?;
        Ok(self.base_to_end * Vector4::from_column_slice(point))
    }

    /// Map an image point through camera and end-effector coordinates into
    /// the base frame, then back to image coordinates.
    pub fn image_point_to_base(
        &self,
        intrinsic: &IntrinsicMatrix,
        x: f32,
        y: f32,
    ) -> Result<Vector2<f32>, TransformError> {
        let camera = image_to_camera(intrinsic, &[x, y])?;
        let base = self.end_to_base(camera.as_slice())?;
        camera_to_image(intrinsic, base.as_slice())
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::new(RigidFrame::identity(), RigidFrame::identity())
    }
}
