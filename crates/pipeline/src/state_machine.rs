use crate::PipelineError;

/// Where the run is. `Idle` is the between-frames state: nothing in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    PreProcessing,
    Detecting,
    PostProcessing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    FrameRead,
    FrameFiltered,
    FrameRejected,
    NoDetections,
    DetectionsFound,
    PostProcessed,
    SourceExhausted,
    Cancelled,
}

/// Drives the per-frame stages and owns the frame counter.
///
/// The frame id advances when a frame leaves the pipeline through
/// `NoDetections` or `PostProcessed`. A frame rejected by the filter or the
/// detector does not consume an id.
pub struct StateContext {
    current_state: PipelineState,
    frame_id: u64,
}

impl StateContext {
    pub fn new() -> Self {
        Self {
            current_state: PipelineState::Idle,
            frame_id: 0,
        }
    }

    pub fn update(&mut self, event: PipelineEvent) -> Result<Option<PipelineState>, PipelineError> {
        use PipelineEvent as E;
        use PipelineState as S;

        let old_state = self.current_state;

        self.current_state = match (self.current_state, event) {
            (S::Idle, E::FrameRead) => S::PreProcessing,
            (S::Idle, E::SourceExhausted | E::Cancelled) => S::Done,

            (S::PreProcessing, E::FrameFiltered) => S::Detecting,
            (S::PreProcessing | S::Detecting, E::FrameRejected) => S::Idle,

            (S::Detecting, E::DetectionsFound) => S::PostProcessing,
            (S::Detecting, E::NoDetections) => {
                self.frame_id += 1;
                S::Idle
            }

            (S::PostProcessing, E::PostProcessed) => {
                self.frame_id += 1;
                S::Idle
            }

            (state, event) => return Err(PipelineError::InvalidTransition { state, event }),
        };

        if old_state != self.current_state {
            Ok(Some(self.current_state))
        } else {
            Ok(None)
        }
    }

    pub fn current_state(&self) -> PipelineState {
        self.current_state
    }

    /// Id of the frame in flight, or of the next one when idle.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn is_done(&self) -> bool {
        self.current_state == PipelineState::Done
    }
}

impl Default for StateContext {
    fn default() -> Self {
        Self::new()
    }
}
