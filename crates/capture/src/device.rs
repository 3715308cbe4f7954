use crate::CaptureError;
use v4l::{Device, FourCC, video::Capture};

const FOURCC_YUYV: FourCC = FourCC { repr: *b"YUYV" };
const FOURCC_MJPG: FourCC = FourCC { repr: *b"MJPG" };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Yuyv,
    Mjpeg,
}

impl PixelFormat {
    fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Yuyv => FOURCC_YUYV,
            PixelFormat::Mjpeg => FOURCC_MJPG,
        }
    }
}

/// Formats we can decode, most preferred first.
const SUPPORTED_FORMATS: [PixelFormat; 2] = [PixelFormat::Yuyv, PixelFormat::Mjpeg];

fn select_format(device: &Device) -> Result<PixelFormat, CaptureError> {
    let offered: Vec<FourCC> = device.enum_formats()?.iter().map(|f| f.fourcc).collect();
    tracing::debug!(?offered, "Camera pixel formats");

    SUPPORTED_FORMATS
        .into_iter()
        .find(|format| offered.contains(&format.fourcc()))
        .ok_or_else(|| {
            CaptureError::InvalidSource(format!(
                "camera offers neither YUYV nor MJPEG: {:?}",
                offered
            ))
        })
}

/// An opened V4L2 capture device with its negotiated format.
pub struct CameraDevice {
    pub device: Device,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl CameraDevice {
    pub fn open(index: i32) -> Result<Self, CaptureError> {
        if index < 0 {
            return Err(CaptureError::InvalidSource(format!(
                "camera id {} is negative",
                index
            )));
        }

        let device = Device::new(index as usize).map_err(|e| {
            CaptureError::InvalidSource(format!("cannot open camera {}: {}", index, e))
        })?;

        let caps = device.query_caps().map_err(|e| {
            CaptureError::InvalidSource(format!("camera {} is not usable: {}", index, e))
        })?;
        tracing::info!("Camera opened: {} ({})", caps.card, caps.driver);

        let pixel_format = select_format(&device)?;

        let mut format = device.format()?;
        format.fourcc = pixel_format.fourcc();
        let format = device.set_format(&format)?;

        tracing::info!(
            "Capture format: {}x{} {:?} ({:?})",
            format.width,
            format.height,
            format.fourcc,
            pixel_format
        );

        Ok(Self {
            device,
            width: format.width,
            height: format.height,
            pixel_format,
        })
    }
}
