use crate::bbox::BoundingBox;

/// One candidate record straight out of the detector.
///
/// Box parameters are normalized to `[0, 1]` relative to the detector input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetection {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub class_scores: Vec<f32>,
}

impl RawDetection {
    pub fn new(cx: f32, cy: f32, width: f32, height: f32, class_scores: Vec<f32>) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
            class_scores,
        }
    }

    /// Arg-max over the whole score vector. `None` when there are no scores.
    /// The first index wins on ties.
    pub fn best_class(&self) -> Option<(usize, f32)> {
        self.class_scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            .fold(None, |best, (idx, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((idx, score)),
            })
    }
}

/// A detection that survived thresholding, NMS and class filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub frame_id: u64,
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A detection with both box corners mapped into the robot base frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformedDetection {
    pub frame_id: u64,
    pub top_left: (i32, i32),
    pub bottom_right: (i32, i32),
}
