use crate::nms::non_maximal_suppression;
use schema::{BoundingBox, DETECTION_RESOLUTION, Detection, PERSON_CLASS_ID, RawDetection};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.9;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.9;

/// Turns raw detector records into the final per-frame detections:
/// threshold, NMS, target-class selection and resolution clamping.
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub target_class: usize,
    pub resolution: u32,
}

impl DetectionFilter {
    pub fn new(confidence_threshold: f32, nms_threshold: f32, target_class: usize) -> Self {
        Self {
            confidence_threshold,
            nms_threshold,
            target_class,
            resolution: DETECTION_RESOLUTION,
        }
    }

    /// Filter the raw records of one frame.
    ///
    /// `frame_size` is the (width, height) of the frame the records refer to.
    /// Empty input or nothing above threshold yields an empty list. Boxes left
    /// with no width or height after clamping are dropped.
    #[tracing::instrument(skip(self, raw), fields(candidates = raw.len()))]
    pub fn filter(
        &self,
        raw: &[RawDetection],
        frame_size: (u32, u32),
        frame_id: u64,
    ) -> Vec<Detection> {
        let (frame_width, frame_height) = frame_size;

        let mut class_ids = Vec::new();
        let mut confidences = Vec::new();
        let mut boxes = Vec::new();

        for record in raw {
            let Some((class_id, confidence)) = record.best_class() else {
                continue;
            };
            if confidence <= self.confidence_threshold {
                continue;
            }

            class_ids.push(class_id);
            confidences.push(confidence);
            boxes.push(BoundingBox::from_normalized_center(
                record.cx,
                record.cy,
                record.width,
                record.height,
                frame_width,
                frame_height,
            ));
        }

        let kept = non_maximal_suppression(
            &boxes,
            &confidences,
            self.confidence_threshold,
            self.nms_threshold,
        );

        let detections: Vec<Detection> = kept
            .into_iter()
            .filter(|&i| class_ids[i] == self.target_class)
            .map(|i| Detection {
                frame_id,
                class_id: class_ids[i],
                confidence: confidences[i],
                bbox: boxes[i].clamp_bottom_right(self.resolution),
            })
            .filter(|d| d.bbox.width > 0 && d.bbox.height > 0)
            .collect();

        tracing::debug!(
            above_threshold = boxes.len(),
            kept = detections.len(),
            "Filtered detections"
        );

        detections
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONFIDENCE_THRESHOLD,
            DEFAULT_NMS_THRESHOLD,
            PERSON_CLASS_ID,
        )
    }
}
