use crate::CaptureError;
use schema::Frame;
use std::fs;
use std::path::{Path, PathBuf};

/// Receives the annotated frames of a run.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame, frame_id: u64) -> Result<(), CaptureError>;

    /// Called once after the last frame.
    fn finish(&mut self) {}
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, frame: &Frame, frame_id: u64) -> Result<(), CaptureError> {
        (**self).write_frame(frame, frame_id)
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}

fn save(frame: &Frame, path: &Path) -> Result<(), CaptureError> {
    frame
        .save(path)
        .map_err(|e| CaptureError::Encode(format!("{}: {}", path.display(), e)))
}

/// Writes every frame to the same file; the last one wins.
pub struct ImageFileSink {
    path: PathBuf,
    written: u64,
}

impl ImageFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path, written: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for ImageFileSink {
    fn write_frame(&mut self, frame: &Frame, _frame_id: u64) -> Result<(), CaptureError> {
        save(frame, &self.path)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) {
        if self.written > 0 {
            tracing::info!("Output image written to {}", self.path.display());
        }
    }
}

/// Writes `frame_{id:06}.jpg` files into a directory.
pub struct FrameSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl FrameSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, written: 0 })
    }

    pub fn frame_path(&self, frame_id: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.jpg", frame_id))
    }
}

impl FrameSink for FrameSequenceSink {
    fn write_frame(&mut self, frame: &Frame, frame_id: u64) -> Result<(), CaptureError> {
        save(frame, &self.frame_path(frame_id))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) {
        tracing::info!("{} frames written to {}", self.written, self.dir.display());
    }
}

/// Discards frames.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_frame(&mut self, _frame: &Frame, _frame_id: u64) -> Result<(), CaptureError> {
        Ok(())
    }
}
