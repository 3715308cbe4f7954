pub mod config;
pub mod error;
pub mod overlay;
pub mod report;
pub mod service;
pub mod state_machine;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use report::{DETECTIONS_FILE_NAME, DetectionLog, RunReport};
pub use service::DetectionPipeline;
pub use state_machine::{PipelineEvent, PipelineState, StateContext};
