use crate::CaptureError;
use crate::sink::FrameSink;
use crate::source::{FrameSource, SourceKind};
use ffmpeg::{
    Rational,
    codec::{self, encoder},
    format,
    software::scaling,
    util::format::Pixel,
};
use ffmpeg_next as ffmpeg;
use schema::Frame;
use std::fs;
use std::path::{Path, PathBuf};

/// Frame rate of the annotated output video.
pub const OUTPUT_FPS: i32 = 15;

/// Video file decoded with FFmpeg and converted to RGB24.
pub struct FfmpegVideoSource {
    input: format::context::Input,
    stream_index: usize,
    decoder: codec::decoder::Video,
    scaler: scaling::Context,
    eof_sent: bool,
}

fn stream_err(context: &str, e: ffmpeg::Error) -> CaptureError {
    CaptureError::Stream(format!("{}: {}", context, e))
}

impl FfmpegVideoSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let invalid =
            |e: ffmpeg::Error| CaptureError::InvalidSource(format!("{}: {}", path.display(), e));

        ffmpeg::init().map_err(invalid)?;
        let input = format::input(&path).map_err(invalid)?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| {
                CaptureError::InvalidSource(format!("{} has no video track", path.display()))
            })?;
        let stream_index = input_stream.index();

        let context = codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(invalid)?;
        let decoder = context.decoder().video().map_err(invalid)?;

        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )
        .map_err(invalid)?;

        tracing::info!(
            "Video opened: {} ({}x{})",
            path.display(),
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            eof_sent: false,
        })
    }

    fn receive(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        match self.decoder.receive_frame(&mut decoded) {
            Ok(()) => {}
            Err(e) if needs_more_input(&e) => return Ok(None),
            Err(e) => return Err(CaptureError::CorruptFrame(format!("decode failed: {}", e))),
        }

        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| stream_err("scale frame to RGB", e))?;
        frame_to_rgb(&rgb_frame).map(Some)
    }
}

impl FrameSource for FfmpegVideoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        // Frames still buffered from earlier packets come first
        if let Some(frame) = self.receive()? {
            return Ok(Some(frame));
        }

        loop {
            let next = self
                .input
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            let Some((index, packet)) = next else {
                break;
            };
            if index != self.stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                return Err(CaptureError::CorruptFrame(format!("bad packet: {}", e)));
            }
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
        }

        if !self.eof_sent {
            self.eof_sent = true;
            self.decoder
                .send_eof()
                .map_err(|e| stream_err("flush decoder", e))?;
        }
        self.receive()
    }
}

/// EAGAIN and EOF mean the codec has nothing to hand out right now.
fn needs_more_input(e: &ffmpeg::Error) -> bool {
    matches!(
        e,
        ffmpeg::Error::Eof
            | ffmpeg::Error::Other {
                errno: ffmpeg::error::EAGAIN
            }
    )
}

/// Copy an RGB24 frame out of FFmpeg, dropping any row padding.
fn frame_to_rgb(frame: &ffmpeg::frame::Video) -> Result<Frame, CaptureError> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let row_data = data.get(start..start + row_bytes).ok_or_else(|| {
            CaptureError::CorruptFrame("ffmpeg frame row is out of bounds".to_string())
        })?;
        pixels.extend_from_slice(row_data);
    }

    Frame::from_raw(width, height, pixels)
        .ok_or_else(|| CaptureError::CorruptFrame("RGB buffer size mismatch".to_string()))
}

/// Copy an RGB frame into an FFmpeg RGB24 frame, honoring its row stride.
fn rgb_to_frame(frame: &Frame) -> ffmpeg::frame::Video {
    let (width, height) = frame.dimensions();
    let row_bytes = width as usize * 3;
    let mut video = ffmpeg::frame::Video::new(Pixel::RGB24, width, height);
    let stride = video.stride(0);
    let data = video.data_mut(0);

    for (row, pixels) in frame.as_raw().chunks_exact(row_bytes).enumerate() {
        let start = row * stride;
        data[start..start + row_bytes].copy_from_slice(pixels);
    }
    video
}

/// Open MJPEG encoder and muxer. Created with the first frame's size.
struct VideoWriter {
    output: format::context::Output,
    encoder: encoder::video::Encoder,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    next_pts: i64,
}

impl VideoWriter {
    fn open(path: &Path, width: u32, height: u32) -> Result<Self, CaptureError> {
        let encode_err = |e: ffmpeg::Error| CaptureError::Encode(format!("{}: {}", path.display(), e));

        ffmpeg::init().map_err(encode_err)?;
        let mut output = format::output(&path).map_err(encode_err)?;
        let global_header = output
            .format()
            .flags()
            .contains(format::flag::Flags::GLOBAL_HEADER);

        let mjpeg = encoder::find(codec::Id::MJPEG)
            .ok_or_else(|| CaptureError::Encode("MJPEG encoder not available".to_string()))?;
        let mut stream = output.add_stream(mjpeg).map_err(encode_err)?;

        let encoder_time_base = Rational::new(1, OUTPUT_FPS);
        let mut video = codec::context::Context::new_with_codec(mjpeg)
            .encoder()
            .video()
            .map_err(encode_err)?;
        video.set_width(width);
        video.set_height(height);
        video.set_format(Pixel::YUVJ420P);
        video.set_time_base(encoder_time_base);
        video.set_frame_rate(Some(Rational::new(OUTPUT_FPS, 1)));
        if global_header {
            video.set_flags(codec::flag::Flags::GLOBAL_HEADER);
        }

        let encoder = video.open_as(mjpeg).map_err(encode_err)?;
        stream.set_parameters(&encoder);
        stream.set_time_base(encoder_time_base);
        let stream_index = stream.index();

        output.write_header().map_err(encode_err)?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|s| s.time_base())
            .unwrap_or(encoder_time_base);

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUVJ420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(encode_err)?;

        tracing::info!(
            "Writing {}x{} MJPEG video at {} fps to {}",
            width,
            height,
            OUTPUT_FPS,
            path.display()
        );

        Ok(Self {
            output,
            encoder,
            scaler,
            width,
            height,
            encoder_time_base,
            stream_time_base,
            next_pts: 0,
        })
    }

    fn write(&mut self, frame: &Frame) -> Result<(), CaptureError> {
        let encode_err = |e: ffmpeg::Error| CaptureError::Encode(e.to_string());

        let rgb = rgb_to_frame(frame);
        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler.run(&rgb, &mut yuv).map_err(encode_err)?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&yuv).map_err(encode_err)?;
        self.drain()
    }

    fn drain(&mut self) -> Result<(), CaptureError> {
        let mut packet = ffmpeg::Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => {}
                Err(e) if needs_more_input(&e) => return Ok(()),
                Err(e) => return Err(CaptureError::Encode(e.to_string())),
            }
            packet.set_stream(0);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| CaptureError::Encode(e.to_string()))?;
        }
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        self.encoder
            .send_eof()
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        self.drain()?;
        self.output
            .write_trailer()
            .map_err(|e| CaptureError::Encode(e.to_string()))
    }
}

/// Encodes the annotated frames into an MJPEG video file (AVI, 15 fps).
///
/// The encoder is opened with the first frame; every later frame must have
/// the same size.
pub struct FfmpegVideoSink {
    path: PathBuf,
    writer: Option<VideoWriter>,
}

impl FfmpegVideoSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path, writer: None })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for FfmpegVideoSink {
    fn write_frame(&mut self, frame: &Frame, frame_id: u64) -> Result<(), CaptureError> {
        let (width, height) = frame.dimensions();
        if self.writer.is_none() {
            self.writer = Some(VideoWriter::open(&self.path, width, height)?);
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        if (width, height) != (writer.width, writer.height) {
            return Err(CaptureError::Encode(format!(
                "frame {} is {}x{}, video is {}x{}",
                frame_id, width, height, writer.width, writer.height
            )));
        }
        writer.write(frame)
    }

    fn finish(&mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        match writer.close() {
            Ok(()) => tracing::info!(
                "{} frames encoded to {}",
                writer.next_pts,
                self.path.display()
            ),
            Err(e) => tracing::error!(error = %e, "Failed to finalize {}", self.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    fn solid(width: u32, height: u32, value: u8) -> Frame {
        Frame::from_pixel(width, height, Rgb([value, value / 2, 255 - value]))
    }

    // ========== Decoder status ==========

    #[test]
    fn test_eagain_and_eof_need_more_input() {
        assert!(needs_more_input(&ffmpeg::Error::Eof));
        assert!(needs_more_input(&ffmpeg::Error::Other {
            errno: ffmpeg::error::EAGAIN
        }));
        assert!(!needs_more_input(&ffmpeg::Error::InvalidData));
    }

    // ========== Frame conversion ==========

    #[test]
    fn test_rgb_frame_round_trips_through_ffmpeg_layout() {
        let frame = Frame::from_fn(13, 5, |x, y| Rgb([x as u8, y as u8, (x * y) as u8]));
        let back = frame_to_rgb(&rgb_to_frame(&frame)).unwrap();
        assert_eq!(back, frame);
    }

    // ========== Video sink ==========

    #[test]
    fn test_sink_writes_readable_video() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/testVideoDetection.avi");

        let mut sink = FfmpegVideoSink::new(&path).unwrap();
        for i in 0..5u8 {
            sink.write_frame(&solid(416, 416, i * 40), i as u64).unwrap();
        }
        sink.finish();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        let mut source = FfmpegVideoSource::open(&path).unwrap();
        let mut frames = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.dimensions(), (416, 416));
            frames += 1;
        }
        assert_eq!(frames, 5);
    }

    #[test]
    fn test_sink_rejects_size_change() {
        let dir = TempDir::new().unwrap();
        let mut sink = FfmpegVideoSink::new(dir.path().join("out.avi")).unwrap();

        sink.write_frame(&solid(64, 48, 10), 0).unwrap();
        let result = sink.write_frame(&solid(32, 32, 10), 1);

        assert!(matches!(result, Err(CaptureError::Encode(_))));
        sink.finish();
    }

    #[test]
    fn test_finish_without_frames_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.avi");

        let mut sink = FfmpegVideoSink::new(&path).unwrap();
        sink.finish();

        assert!(!path.exists());
    }
}
