use crate::state_machine::{PipelineEvent, PipelineState};
use capture::CaptureError;
use preprocess::PreprocessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Frame {frame_id} could not be filtered: {source}")]
    InvalidFrame {
        frame_id: u64,
        #[source]
        source: PreprocessError,
    },

    #[error("Detector failed on frame {frame_id}: {message}")]
    Detector { frame_id: u64, message: String },

    #[error("Failed to write frame {frame_id}: {source}")]
    Sink {
        frame_id: u64,
        #[source]
        source: CaptureError,
    },

    #[error("Invalid transition: {event:?} while {state:?}")]
    InvalidTransition {
        state: PipelineState,
        event: PipelineEvent,
    },

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl PipelineError {
    /// Errors that only spoil the current frame of a stream.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidFrame { .. }
                | PipelineError::Detector { .. }
                | PipelineError::Capture(CaptureError::CorruptFrame(_))
        )
    }
}
