use crate::decoder::{FrameDecoder, MjpegDecoder, YuyvDecoder};
use crate::device::{CameraDevice, PixelFormat};
use crate::source::{FrameSource, SourceKind};
use crate::CaptureError;
use schema::Frame;
use v4l::{
    buffer::Type,
    io::{mmap::Stream, traits::CaptureStream},
};

const BUFFER_COUNT: u32 = 4;

/// Live V4L2 capture. Never exhausts on its own; the caller stops it.
pub struct CameraSource<'a> {
    stream: Stream<'a>,
    decoder: Box<dyn FrameDecoder>,
    width: u32,
    height: u32,
    captured: u64,
}

impl<'a> CameraSource<'a> {
    pub fn new(camera: &'a CameraDevice) -> Result<Self, CaptureError> {
        let stream = Stream::with_buffers(&camera.device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| CaptureError::Stream(format!("failed to create capture stream: {}", e)))?;

        let decoder: Box<dyn FrameDecoder> = match camera.pixel_format {
            PixelFormat::Yuyv => Box::new(YuyvDecoder),
            PixelFormat::Mjpeg => Box::new(MjpegDecoder),
        };

        tracing::info!(
            "Starting camera stream at {}x{}...",
            camera.width,
            camera.height
        );

        Ok(Self {
            stream,
            decoder,
            width: camera.width,
            height: camera.height,
            captured: 0,
        })
    }
}

impl FrameSource for CameraSource<'_> {
    fn kind(&self) -> SourceKind {
        SourceKind::Camera
    }

    #[tracing::instrument(skip(self), fields(captured = self.captured))]
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        tracing::trace!(sequence = meta.sequence, bytes = buf.len(), "Buffer dequeued");

        let frame = self.decoder.decode(buf, self.width, self.height)?;
        self.captured += 1;
        Ok(Some(frame))
    }
}
