pub mod bbox;
pub mod detection;

pub use bbox::BoundingBox;
pub use detection::{Detection, RawDetection, TransformedDetection};

/// A decoded RGB frame. Owned by the pipeline for one iteration.
pub type Frame = image::RgbImage;

/// Side length of the square image handed to the detector.
pub const DETECTION_RESOLUTION: u32 = 416;

/// COCO class id for "person".
pub const PERSON_CLASS_ID: usize = 0;
