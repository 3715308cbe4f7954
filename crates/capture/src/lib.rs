#[cfg(feature = "camera")]
pub mod camera;
pub mod decoder;
#[cfg(feature = "camera")]
pub mod device;
pub mod error;
pub mod sink;
pub mod source;
#[cfg(feature = "video-ffmpeg")]
pub mod video;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use decoder::{FrameDecoder, MjpegDecoder, YuyvDecoder};
#[cfg(feature = "camera")]
pub use device::{CameraDevice, PixelFormat};
pub use error::CaptureError;
pub use sink::{FrameSequenceSink, FrameSink, ImageFileSink, NullSink};
pub use source::{FrameDirectorySource, FrameSource, ImageSource, SourceKind};
#[cfg(feature = "video-ffmpeg")]
pub use video::{FfmpegVideoSink, FfmpegVideoSource};
