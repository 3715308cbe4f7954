use crate::{
    PipelineError,
    overlay::draw_detection,
    report::{DetectionLog, RunReport},
    state_machine::{PipelineEvent, StateContext},
};
use capture::{FrameSink, FrameSource};
use common::{PipelineMetrics, span};
use geometry::{FrameTransform, IntrinsicMatrix};
use inference::{DetectionFilter, Detector};
use preprocess::{FilterKind, FrameFilter, to_blob};
use schema::{Detection, Frame, TransformedDetection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 8;

/// Runs frames from a source through filter, detector and post-processing,
/// one at a time, and writes the annotated frames to a sink.
pub struct DetectionPipeline<F, D> {
    filter: F,
    filter_kind: FilterKind,
    detector: D,
    detection_filter: DetectionFilter,
    intrinsic: IntrinsicMatrix,
    transform: FrameTransform,
    max_consecutive_errors: u32,
    metrics: PipelineMetrics,
}

impl<F: FrameFilter, D: Detector> DetectionPipeline<F, D> {
    pub fn new(filter: F, detector: D) -> Self {
        Self {
            filter,
            filter_kind: FilterKind::default(),
            detector,
            detection_filter: DetectionFilter::default(),
            intrinsic: IntrinsicMatrix::identity(),
            transform: FrameTransform::default(),
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            metrics: PipelineMetrics::new("pipeline"),
        }
    }

    pub fn with_filter_kind(mut self, kind: FilterKind) -> Self {
        self.filter_kind = kind;
        self
    }

    pub fn with_detection_filter(mut self, detection_filter: DetectionFilter) -> Self {
        self.detection_filter = detection_filter;
        self
    }

    pub fn with_geometry(mut self, intrinsic: IntrinsicMatrix, transform: FrameTransform) -> Self {
        self.intrinsic = intrinsic;
        self.transform = transform;
        self
    }

    /// A value of 0 is treated as 1.
    pub fn with_max_consecutive_errors(mut self, limit: u32) -> Self {
        self.max_consecutive_errors = limit.max(1);
        self
    }

    /// Process `source` until it is exhausted or `cancel` is set.
    ///
    /// `cancel` is checked between frames only. On a single image every
    /// failure is returned; on a stream, frames that cannot be read, filtered
    /// or detected are skipped until too many fail in a row.
    pub fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        cancel: &AtomicBool,
    ) -> Result<RunReport, PipelineError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let kind = source.kind();
        let mut ctx = StateContext::new();
        let mut report = RunReport::default();
        let mut consecutive_errors = 0u32;

        tracing::info!(
            source = %kind,
            filter = %self.filter_kind,
            confidence_threshold = self.detection_filter.confidence_threshold,
            nms_threshold = self.detection_filter.nms_threshold,
            "Detection pipeline starting"
        );

        while !ctx.is_done() {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(frames = ctx.frame_id(), "Stop requested");
                ctx.update(PipelineEvent::Cancelled)?;
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    ctx.update(PipelineEvent::SourceExhausted)?;
                    break;
                }
                Err(e) => {
                    self.skip_frame(e.into(), kind.is_stream(), &mut consecutive_errors, &mut report)?;
                    continue;
                }
            };
            ctx.update(PipelineEvent::FrameRead)?;

            let start = Instant::now();
            match self.process_frame(&mut ctx, &frame, sink, &mut report.detections) {
                Ok(found) => {
                    consecutive_errors = 0;
                    report.frames_processed += 1;
                    self.metrics.frames_processed.add(1, &[]);
                    self.metrics.detections.add(found as u64, &[]);
                    self.metrics
                        .frame_duration
                        .record(start.elapsed().as_secs_f64(), &[]);
                }
                Err(e) => {
                    self.skip_frame(e, kind.is_stream(), &mut consecutive_errors, &mut report)?;
                }
            }

            if report.frames_processed > 0 && report.frames_processed.is_multiple_of(30) {
                tracing::debug!(
                    frames_processed = report.frames_processed,
                    frames_skipped = report.frames_skipped,
                    detections = report.detections.len(),
                    "Pipeline status"
                );
            }
        }

        sink.finish();

        tracing::info!(
            frames_processed = report.frames_processed,
            frames_skipped = report.frames_skipped,
            detections = report.detections.len(),
            "Detection pipeline finished"
        );
        Ok(report)
    }

    /// Returns the number of detections appended to `log`.
    fn process_frame<K: FrameSink + ?Sized>(
        &mut self,
        ctx: &mut StateContext,
        frame: &Frame,
        sink: &mut K,
        log: &mut DetectionLog,
    ) -> Result<usize, PipelineError> {
        let frame_id = ctx.frame_id();
        let _span = tracing::info_span!("process_frame", frame_id).entered();

        let filtered = {
            let _s = span!("preprocess");
            self.filter.apply(frame, self.filter_kind)
        };
        let mut filtered = match filtered {
            Ok(filtered) => filtered,
            Err(source) => {
                ctx.update(PipelineEvent::FrameRejected)?;
                return Err(PipelineError::InvalidFrame { frame_id, source });
            }
        };
        ctx.update(PipelineEvent::FrameFiltered)?;

        let raw = {
            let _s = span!("detect");
            self.detector.infer(&to_blob(&filtered))
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                ctx.update(PipelineEvent::FrameRejected)?;
                return Err(PipelineError::Detector {
                    frame_id,
                    message: format!("{:#}", e),
                });
            }
        };

        if raw.is_empty() {
            emit(sink, &filtered, frame_id)?;
            ctx.update(PipelineEvent::NoDetections)?;
            return Ok(0);
        }
        ctx.update(PipelineEvent::DetectionsFound)?;

        let _s = span!("postprocess");
        let detections = self
            .detection_filter
            .filter(&raw, filtered.dimensions(), frame_id);

        for detection in &detections {
            draw_detection(&mut filtered, &detection.bbox);
            let object_id = log.push(self.transform_detection(detection));
            tracing::debug!(
                object_id,
                confidence = detection.confidence,
                x = detection.bbox.x,
                y = detection.bbox.y,
                "Person detected"
            );
        }

        emit(sink, &filtered, frame_id)?;
        ctx.update(PipelineEvent::PostProcessed)?;
        Ok(detections.len())
    }

    fn transform_detection(&self, detection: &Detection) -> TransformedDetection {
        let (x2, y2) = detection.bbox.bottom_right();
        TransformedDetection {
            frame_id: detection.frame_id,
            top_left: self.map_corner(detection.bbox.x, detection.bbox.y),
            bottom_right: self.map_corner(x2, y2),
        }
    }

    /// Image corner to base frame; a failed transform maps to the origin.
    fn map_corner(&self, x: i32, y: i32) -> (i32, i32) {
        match self
            .transform
            .image_point_to_base(&self.intrinsic, x as f32, y as f32)
        {
            Ok(point) => (point.x.round() as i32, point.y.round() as i32),
            Err(e) => {
                tracing::warn!(error = %e, x, y, "Corner transform failed, recording zeros");
                (0, 0)
            }
        }
    }

    fn skip_frame(
        &self,
        error: PipelineError,
        is_stream: bool,
        consecutive_errors: &mut u32,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        if !is_stream || !error.is_frame_local() {
            tracing::error!(error = %error, "Detection pipeline failed");
            return Err(error);
        }

        *consecutive_errors += 1;
        report.frames_skipped += 1;
        self.metrics.frames_skipped.add(1, &[]);

        if *consecutive_errors >= self.max_consecutive_errors {
            tracing::error!(
                error = %error,
                consecutive_errors = *consecutive_errors,
                "Too many consecutive frame errors, giving up"
            );
            return Err(error);
        }

        tracing::warn!(error = %error, consecutive_errors = *consecutive_errors, "Skipping frame");
        Ok(())
    }
}

fn emit<K: FrameSink + ?Sized>(sink: &mut K, frame: &Frame, frame_id: u64) -> Result<(), PipelineError> {
    sink.write_frame(frame, frame_id)
        .map_err(|source| PipelineError::Sink { frame_id, source })
}
