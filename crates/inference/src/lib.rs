pub mod backend;
pub mod nms;
pub mod postprocessing;
pub mod yolo;

pub use backend::Detector;
#[cfg(feature = "ort-backend")]
pub use backend::ort::{ExecutionProvider, OrtDetector};
pub use nms::non_maximal_suppression;
pub use postprocessing::DetectionFilter;
pub use yolo::ModelLayout;
