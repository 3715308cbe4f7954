use anyhow::{Context, Result};
use capture::{FrameDirectorySource, FrameSource, ImageFileSink, ImageSource, SourceKind};
use clap::Parser;
use common::{Environment, TelemetryGuard, otel_endpoint_from_env, setup_logging};
use inference::{ExecutionProvider, OrtDetector};
use pipeline::{DetectionPipeline, PipelineConfig, RunReport};
use preprocess::CpuFrameFilter;
use schema::DETECTION_RESOLUTION;
use std::path::Path;
use std::sync::{Arc, atomic::AtomicBool};

const SERVICE_NAME: &str = "human-detector";
const IMAGE_OUTPUT_NAME: &str = "image_detection.jpg";
#[cfg(feature = "video-ffmpeg")]
const VIDEO_OUTPUT_NAME: &str = "video_detection.avi";
#[cfg(not(feature = "video-ffmpeg"))]
const VIDEO_OUTPUT_DIR: &str = "video_detection";
#[cfg(feature = "camera")]
const CAMERA_OUTPUT_DIR: &str = "camera_detection";

type Pipeline = DetectionPipeline<CpuFrameFilter, OrtDetector>;

fn main() -> Result<()> {
    let config = PipelineConfig::parse();
    let environment = Environment::from_env();

    // TelemetryGuard needs a Tokio runtime for the OTLP exporters; keep it
    // alive until the guard has flushed.
    let (_telemetry, _runtime) = if let Some(endpoint) = otel_endpoint_from_env() {
        let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
        let guard =
            rt.block_on(async { TelemetryGuard::init(SERVICE_NAME, &endpoint, environment) })?;
        (Some(guard), Some(rt))
    } else {
        setup_logging(environment);
        (None, None)
    };

    tracing::info!("Human detector starting with config: {:?}", config);
    config.validate()?;

    let cancel = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&cancel))
            .with_context(|| format!("Failed to register handler for signal {}", signal))?;
    }

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Cannot create output directory {}",
            config.output_dir.display()
        )
    })?;

    let report = match config.input {
        SourceKind::Image => {
            let mut source = ImageSource::open(config.input_path()?)?;
            let mut sink = ImageFileSink::new(config.output_dir.join(IMAGE_OUTPUT_NAME))?;
            build_pipeline(&config)?.run(&mut source, &mut sink, &cancel)?
        }
        SourceKind::Video => {
            let mut source = open_video(config.input_path()?)?;
            let mut sink = open_video_sink(&config.output_dir)?;
            build_pipeline(&config)?.run(&mut source, &mut sink, &cancel)?
        }
        SourceKind::Camera => run_camera(&config, &cancel)?,
    };

    let path = report
        .detections
        .save(&config.output_dir)
        .context("Failed to write detections file")?;
    tracing::info!(
        "{} detections over {} frames stored in {}",
        report.detections.len(),
        report.frames_processed,
        path.display()
    );

    Ok(())
}

fn build_pipeline(config: &PipelineConfig) -> Result<Pipeline> {
    #[cfg(feature = "cuda")]
    let provider = ExecutionProvider::Cuda;
    #[cfg(not(feature = "cuda"))]
    let provider = ExecutionProvider::Cpu;

    let input_size = (DETECTION_RESOLUTION, DETECTION_RESOLUTION);
    let detector = OrtDetector::load_model_with_provider(
        &config.model_path,
        config.model_layout,
        input_size,
        provider,
    )
    .with_context(|| format!("Failed to load model {}", config.model_path))?;
    tracing::info!("Model loaded: {} ({})", config.model_path, config.model_layout);

    let filter = CpuFrameFilter::new(config.filter_params()?, input_size);

    Ok(DetectionPipeline::new(filter, detector)
        .with_filter_kind(config.filter_kind)
        .with_detection_filter(config.detection_filter())
        .with_geometry(config.intrinsic_matrix()?, config.frame_transform()?)
        .with_max_consecutive_errors(config.max_consecutive_errors))
}

/// A directory is played back frame by frame; files need FFmpeg.
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        return Ok(Box::new(FrameDirectorySource::open(path)?));
    }

    #[cfg(feature = "video-ffmpeg")]
    {
        Ok(Box::new(capture::FfmpegVideoSource::open(path)?))
    }
    #[cfg(not(feature = "video-ffmpeg"))]
    {
        Err(capture::CaptureError::InvalidSource(format!(
            "{} is not a frame directory and video file decoding is not enabled (build with `video-ffmpeg`)",
            path.display()
        ))
        .into())
    }
}

#[cfg(feature = "video-ffmpeg")]
fn open_video_sink(output_dir: &Path) -> Result<capture::FfmpegVideoSink> {
    Ok(capture::FfmpegVideoSink::new(output_dir.join(VIDEO_OUTPUT_NAME))?)
}

#[cfg(not(feature = "video-ffmpeg"))]
fn open_video_sink(output_dir: &Path) -> Result<capture::FrameSequenceSink> {
    Ok(capture::FrameSequenceSink::new(output_dir.join(VIDEO_OUTPUT_DIR))?)
}

#[cfg(feature = "camera")]
fn run_camera(config: &PipelineConfig, cancel: &AtomicBool) -> Result<RunReport> {
    let device = capture::CameraDevice::open(config.camera_id)?;
    let mut source = capture::CameraSource::new(&device)?;

    let mut sink: Box<dyn capture::FrameSink> = if config.save_frames {
        Box::new(capture::FrameSequenceSink::new(
            config.output_dir.join(CAMERA_OUTPUT_DIR),
        )?)
    } else {
        Box::new(capture::NullSink)
    };

    tracing::info!("Press Ctrl+C to stop the camera feed");
    Ok(build_pipeline(config)?.run(&mut source, &mut sink, cancel)?)
}

#[cfg(not(feature = "camera"))]
fn run_camera(config: &PipelineConfig, _cancel: &AtomicBool) -> Result<RunReport> {
    Err(capture::CaptureError::InvalidSource(format!(
        "camera {} unavailable: camera support is not enabled (build with `camera`)",
        config.camera_id
    ))
    .into())
}
