use crate::CaptureError;
use schema::Frame;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extensions picked up when a directory is read as a video.
const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Image,
    Video,
    Camera,
}

impl SourceKind {
    /// A single image is processed once; a failure there is fatal.
    pub fn is_stream(&self) -> bool {
        !matches!(self, SourceKind::Image)
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(SourceKind::Image),
            "video" => Ok(SourceKind::Video),
            "camera" => Ok(SourceKind::Camera),
            other => Err(format!(
                "{other} is not a supported input. Use `image`, `video` or `camera`."
            )),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Image => f.write_str("image"),
            SourceKind::Video => f.write_str("video"),
            SourceKind::Camera => f.write_str("camera"),
        }
    }
}

/// Produces decoded frames one at a time.
///
/// `Ok(None)` means the source is exhausted. A `CorruptFrame` error only
/// affects the frame that failed; the next call moves on.
pub trait FrameSource {
    fn kind(&self) -> SourceKind;

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn kind(&self) -> SourceKind {
        (**self).kind()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).next_frame()
    }
}

fn decode_file(path: &Path) -> Result<Frame, CaptureError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| CaptureError::CorruptFrame(format!("{}: {}", path.display(), e)))
}

/// A single still image, yielded once.
pub struct ImageSource {
    path: PathBuf,
    done: bool,
}

impl ImageSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(CaptureError::InvalidSource(format!(
                "{} is not a readable image file",
                path.display()
            )));
        }

        tracing::info!("Image source opened: {}", path.display());
        Ok(Self { path, done: false })
    }
}

impl FrameSource for ImageSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Image
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        decode_file(&self.path).map(Some)
    }
}

/// A video stored as a directory of frames, played back in file name order.
pub struct FrameDirectorySource {
    frames: Vec<PathBuf>,
    next: usize,
}

impl FrameDirectorySource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(CaptureError::InvalidSource(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut frames = Vec::new();
        for ext in FRAME_EXTENSIONS {
            let pattern = format!(
                "{}/*.{}",
                glob::Pattern::escape(&dir.to_string_lossy()),
                ext
            );
            let entries = glob::glob(&pattern)
                .map_err(|e| CaptureError::InvalidSource(format!("bad frame pattern: {}", e)))?;
            frames.extend(entries.filter_map(Result::ok));
        }
        frames.sort();

        if frames.is_empty() {
            return Err(CaptureError::InvalidSource(format!(
                "no frames found in {}",
                dir.display()
            )));
        }

        tracing::info!(
            "Frame directory opened: {} ({} frames)",
            dir.display(),
            frames.len()
        );
        Ok(Self { frames, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameDirectorySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let Some(path) = self.frames.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        decode_file(path).map(Some)
    }
}
