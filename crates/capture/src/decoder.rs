use crate::CaptureError;
use common::span;
use image::ImageFormat;
use schema::Frame;

/// Decodes raw camera buffers into RGB frames.
pub trait FrameDecoder: Send {
    fn decode(&mut self, raw: &[u8], width: u32, height: u32) -> Result<Frame, CaptureError>;
}

/// YUYV (YUV 4:2:2) decoder.
///
/// YUYV packs 2 pixels in 4 bytes: [Y0, U, Y1, V]
#[derive(Debug, Default)]
pub struct YuyvDecoder;

impl FrameDecoder for YuyvDecoder {
    fn decode(&mut self, raw: &[u8], width: u32, height: u32) -> Result<Frame, CaptureError> {
        let _s = span!("decode_yuyv");

        if width == 0 || height == 0 || width % 2 != 0 {
            return Err(CaptureError::CorruptFrame(format!(
                "YUYV needs a non-empty even width, got {}x{}",
                width, height
            )));
        }

        let bytes_per_row = (width * 2) as usize;
        let stride = raw.len() / height as usize;
        if stride < bytes_per_row {
            return Err(CaptureError::CorruptFrame(format!(
                "YUYV buffer too short: {} bytes for {}x{}",
                raw.len(),
                width,
                height
            )));
        }

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        for row in 0..height as usize {
            let row_start = row * stride;
            let row_data = &raw[row_start..row_start + bytes_per_row];

            for chunk in row_data.chunks_exact(4) {
                let y0 = chunk[0] as i32;
                let u = chunk[1] as i32 - 128;
                let y1 = chunk[2] as i32;
                let v = chunk[3] as i32 - 128;

                // BT.601 fixed-point coefficients (8-bit fraction)
                // R = Y + 1.402*V  -> Y + (359*V >> 8)
                // G = Y - 0.344*U - 0.714*V -> Y - ((88*U + 183*V) >> 8)
                // B = Y + 1.772*U -> Y + (454*U >> 8)
                let rv = (359 * v) >> 8;
                let gu = (88 * u + 183 * v) >> 8;
                let bu = (454 * u) >> 8;

                for y in [y0, y1] {
                    rgb.push((y + rv).clamp(0, 255) as u8);
                    rgb.push((y - gu).clamp(0, 255) as u8);
                    rgb.push((y + bu).clamp(0, 255) as u8);
                }
            }
        }

        Frame::from_raw(width, height, rgb)
            .ok_or_else(|| CaptureError::CorruptFrame("YUYV output size mismatch".to_string()))
    }
}

/// MJPEG decoder. Each buffer is a complete JPEG; the header dimensions win
/// over the negotiated ones.
#[derive(Debug, Default)]
pub struct MjpegDecoder;

impl FrameDecoder for MjpegDecoder {
    fn decode(&mut self, raw: &[u8], _width: u32, _height: u32) -> Result<Frame, CaptureError> {
        let _s = span!("decode_mjpeg");

        image::load_from_memory_with_format(raw, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| CaptureError::CorruptFrame(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, Rgb, codecs::jpeg::JpegEncoder};

    #[test]
    fn test_yuyv_decoder_neutral_gray() {
        let mut decoder = YuyvDecoder;
        // 2x1 image: Y=128 with neutral chroma
        let yuyv = vec![128, 128, 128, 128];
        let frame = decoder.decode(&yuyv, 2, 1).unwrap();

        assert_eq!(frame.dimensions(), (2, 1));
        assert_eq!(frame.get_pixel(0, 0), &Rgb([128, 128, 128]));
        assert_eq!(frame.get_pixel(1, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_yuyv_decoder_handles_row_padding() {
        let mut decoder = YuyvDecoder;
        // 2x2 image with 4 bytes of padding per row
        let yuyv = vec![
            255, 128, 0, 128, 9, 9, 9, 9, //
            16, 128, 235, 128, 9, 9, 9, 9,
        ];
        let frame = decoder.decode(&yuyv, 2, 2).unwrap();

        assert_eq!(frame.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(frame.get_pixel(1, 0), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(0, 1), &Rgb([16, 16, 16]));
        assert_eq!(frame.get_pixel(1, 1), &Rgb([235, 235, 235]));
    }

    #[test]
    fn test_yuyv_decoder_short_buffer() {
        let mut decoder = YuyvDecoder;
        assert!(matches!(
            decoder.decode(&[0; 6], 4, 2),
            Err(CaptureError::CorruptFrame(_))
        ));
    }

    #[test]
    fn test_mjpeg_decoder_valid_jpeg() {
        let pixels = vec![200u8; 16 * 8 * 3];
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 95)
            .write_image(&pixels, 16, 8, image::ExtendedColorType::Rgb8)
            .unwrap();

        let frame = MjpegDecoder.decode(&jpeg, 640, 480).unwrap();
        assert_eq!(frame.dimensions(), (16, 8));
    }

    #[test]
    fn test_mjpeg_decoder_invalid_data() {
        let mut decoder = MjpegDecoder;
        let invalid = vec![0, 1, 2, 3];
        assert!(matches!(
            decoder.decode(&invalid, 640, 480),
            Err(CaptureError::CorruptFrame(_))
        ));
    }
}
