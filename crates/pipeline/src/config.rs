use anyhow::{Context, Result, bail};
use capture::SourceKind;
use clap::Parser;
use geometry::{FrameTransform, IntrinsicMatrix, RigidFrame};
use inference::{DetectionFilter, ModelLayout};
use preprocess::{DEFAULT_KERNEL_SIZE, FilterKind, FilterParams};
use schema::PERSON_CLASS_ID;
use std::path::{Path, PathBuf};

/// Every flag can also be set through the environment variable shown in
/// `--help`.
#[derive(Debug, Clone, Parser)]
#[command(name = "human-detector", version, about = "Detect people and map them into the robot base frame")]
pub struct PipelineConfig {
    /// image, video or camera
    #[arg(long, env = "INPUT_KIND")]
    pub input: SourceKind,

    /// Image file, or video file / frame directory
    #[arg(long, env = "INPUT_PATH")]
    pub path: Option<PathBuf>,

    #[arg(long, env = "CAMERA_ID", default_value_t = 0, allow_negative_numbers = true)]
    pub camera_id: i32,

    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long, env = "MODEL_PATH", default_value = "models/yolov3.onnx")]
    pub model_path: String,

    #[arg(long, env = "MODEL_LAYOUT", default_value_t = ModelLayout::Darknet)]
    pub model_layout: ModelLayout,

    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = inference::postprocessing::DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence_threshold: f32,

    #[arg(long, env = "NMS_THRESHOLD", default_value_t = inference::postprocessing::DEFAULT_NMS_THRESHOLD)]
    pub nms_threshold: f32,

    #[arg(long, env = "TARGET_CLASS", default_value_t = PERSON_CLASS_ID)]
    pub target_class: usize,

    #[arg(long = "filter", env = "FILTER_KIND", default_value_t = FilterKind::Gaussian)]
    pub filter_kind: FilterKind,

    #[arg(long, env = "KERNEL_SIZE", default_value_t = DEFAULT_KERNEL_SIZE)]
    pub kernel_size: u32,

    /// Gaussian sigma; 0 derives it from the kernel size
    #[arg(long, env = "FILTER_SIGMA", default_value_t = 0.0)]
    pub sigma: f32,

    /// Camera intrinsics, 9 comma-separated values, row-major
    #[arg(long, env = "INTRINSIC_MATRIX", value_delimiter = ',', allow_negative_numbers = true)]
    pub intrinsic: Option<Vec<f32>>,

    /// Robot base pose, 16 comma-separated values, row-major
    #[arg(long, env = "BASE_FRAME", value_delimiter = ',', allow_negative_numbers = true)]
    pub base_frame: Option<Vec<f32>>,

    /// End-effector pose, 16 comma-separated values, row-major
    #[arg(long, env = "END_FRAME", value_delimiter = ',', allow_negative_numbers = true)]
    pub end_frame: Option<Vec<f32>>,

    /// Write annotated camera frames to the output directory
    #[arg(long, env = "SAVE_FRAMES")]
    pub save_frames: bool,

    #[arg(long, env = "MAX_CONSECUTIVE_ERRORS", default_value_t = crate::service::DEFAULT_MAX_CONSECUTIVE_ERRORS)]
    pub max_consecutive_errors: u32,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        check_threshold("confidence threshold", self.confidence_threshold)?;
        check_threshold("NMS threshold", self.nms_threshold)?;
        self.filter_params()?;

        if matches!(self.input, SourceKind::Image | SourceKind::Video) {
            self.input_path()?;
        }
        Ok(())
    }

    pub fn input_path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .with_context(|| format!("--path is required for {} input", self.input))
    }

    pub fn filter_params(&self) -> Result<FilterParams> {
        FilterParams::new(self.kernel_size, self.sigma).context("Invalid filter parameters")
    }

    pub fn detection_filter(&self) -> DetectionFilter {
        DetectionFilter::new(
            self.confidence_threshold,
            self.nms_threshold,
            self.target_class,
        )
    }

    pub fn intrinsic_matrix(&self) -> Result<IntrinsicMatrix> {
        match &self.intrinsic {
            Some(values) => {
                IntrinsicMatrix::from_row_slice(values).context("Invalid intrinsic matrix")
            }
            None => Ok(IntrinsicMatrix::identity()),
        }
    }

    pub fn frame_transform(&self) -> Result<FrameTransform> {
        let base = rigid_frame(self.base_frame.as_deref()).context("Invalid base frame")?;
        let end = rigid_frame(self.end_frame.as_deref()).context("Invalid end frame")?;
        Ok(FrameTransform::new(base, end))
    }
}

fn check_threshold(name: &str, value: f32) -> Result<()> {
    if !(value > 0.0 && value <= 1.0) {
        bail!("{} must be in (0, 1], got {}", name, value);
    }
    Ok(())
}

fn rigid_frame(values: Option<&[f32]>) -> Result<RigidFrame> {
    match values {
        Some(values) => Ok(RigidFrame::from_row_slice(values)?),
        None => Ok(RigidFrame::identity()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> PipelineConfig {
        let mut argv = vec!["human-detector"];
        argv.extend_from_slice(args);
        PipelineConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--input", "camera"]);

        assert_eq!(config.input, SourceKind::Camera);
        assert_eq!(config.camera_id, 0);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.filter_kind, FilterKind::Gaussian);
        assert_eq!(config.kernel_size, 3);
        assert_eq!(config.confidence_threshold, 0.9);
        assert_eq!(config.nms_threshold, 0.9);
        assert_eq!(config.target_class, 0);
        assert_eq!(config.max_consecutive_errors, 8);
        assert!(!config.save_frames);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_image_requires_path() {
        let config = parse(&["--input", "image"]);
        assert!(config.validate().is_err());

        let config = parse(&["--input", "image", "--path", "person.jpg"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.input_path().unwrap(), Path::new("person.jpg"));
    }

    #[test]
    fn test_negative_camera_id_parses() {
        let config = parse(&["--input", "camera", "--camera-id", "-1"]);
        assert_eq!(config.camera_id, -1);
    }

    #[test]
    fn test_threshold_range() {
        let config = parse(&["--input", "camera", "--confidence-threshold", "0"]);
        assert!(config.validate().is_err());

        let config = parse(&["--input", "camera", "--nms-threshold", "1.5"]);
        assert!(config.validate().is_err());

        let config = parse(&["--input", "camera", "--confidence-threshold", "1.0"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_even_kernel_rejected() {
        let config = parse(&["--input", "camera", "--kernel-size", "4"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_filter_rejected() {
        let argv = ["human-detector", "--input", "camera", "--filter", "bilateral"];
        assert!(PipelineConfig::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_matrix_values() {
        let config = parse(&[
            "--input",
            "camera",
            "--intrinsic",
            "615,0,320,0,615,240,0,0,1",
            "--end-frame",
            "1,0,0,0.5,0,1,0,-2,0,0,1,0,0,0,0,1",
        ]);

        let k = config.intrinsic_matrix().unwrap();
        assert_eq!(k.matrix()[(0, 2)], 320.0);

        let tf = config.frame_transform().unwrap();
        assert_eq!(tf.end().translation().y, -2.0);
        assert_eq!(*tf.base(), RigidFrame::identity());
    }

    #[test]
    fn test_matrix_with_wrong_length() {
        let config = parse(&["--input", "camera", "--intrinsic", "1,0,0,1"]);
        assert!(config.intrinsic_matrix().is_err());

        let config = parse(&["--input", "camera", "--base-frame", "1,0,0"]);
        assert!(config.frame_transform().is_err());
    }

    #[test]
    fn test_missing_matrices_are_identity() {
        let config = parse(&["--input", "camera"]);
        assert_eq!(config.frame_transform().unwrap(), FrameTransform::default());
        assert_eq!(
            config.intrinsic_matrix().unwrap().matrix(),
            IntrinsicMatrix::identity().matrix()
        );
    }
}
