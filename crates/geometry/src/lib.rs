pub mod error;
pub mod intrinsic;
pub mod rigid;
pub mod transform;

pub use error::TransformError;
pub use intrinsic::IntrinsicMatrix;
pub use rigid::RigidFrame;
pub use transform::{FrameTransform, camera_to_image, image_to_camera};
