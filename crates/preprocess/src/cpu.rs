use crate::config::DEFAULT_INPUT_SIZE;
use crate::{FilterKind, FilterParams, FrameFilter, PreprocessError};
use common::{span, span_debug};
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::{GrayImage, Luma};
use imageproc::filter::{box_filter, median_filter, separable_filter_equal};
use schema::Frame;

/// Filters on the CPU with `imageproc`, resizes with `fast_image_resize`.
pub struct CpuFrameFilter {
    pub params: FilterParams,
    pub output_size: (u32, u32),
}

impl CpuFrameFilter {
    pub fn new(params: FilterParams, output_size: (u32, u32)) -> Self {
        Self {
            params,
            output_size,
        }
    }

    fn denoise(&self, frame: &Frame, kind: FilterKind) -> Result<Frame, PreprocessError> {
        let _s = span_debug!("denoise");

        if kind != FilterKind::None {
            self.params.validate()?;
        }

        let radius = self.params.radius();
        let filtered = match kind {
            FilterKind::Gaussian => separable_filter_equal(frame, &self.params.gaussian_kernel()),
            FilterKind::Median => median_filter(frame, radius, radius),
            FilterKind::Mean => Self::mean_filter(frame, radius),
            FilterKind::None => frame.clone(),
        };
        Ok(filtered)
    }

    /// `box_filter` only takes single channel images, so run it per plane.
    fn mean_filter(frame: &Frame, radius: u32) -> Frame {
        let (width, height) = frame.dimensions();

        let planes: Vec<GrayImage> = (0..3)
            .map(|c| {
                let plane =
                    GrayImage::from_fn(width, height, |x, y| Luma([frame.get_pixel(x, y)[c]]));
                box_filter(&plane, radius, radius)
            })
            .collect();

        Frame::from_fn(width, height, |x, y| {
            image::Rgb([
                planes[0].get_pixel(x, y)[0],
                planes[1].get_pixel(x, y)[0],
                planes[2].get_pixel(x, y)[0],
            ])
        })
    }

    /// Stretch to the output size. Aspect ratio is not preserved.
    fn resize(&self, frame: &Frame) -> Result<Frame, PreprocessError> {
        let _s = span_debug!("resize");

        let (width, height) = frame.dimensions();
        let (out_width, out_height) = self.output_size;

        let src = ImageRef::new(width, height, frame.as_raw(), PixelType::U8x3)
            .map_err(|e| PreprocessError::InvalidFrame(e.to_string()))?;

        let mut resized = Image::new(out_width, out_height, PixelType::U8x3);

        Resizer::new()
            .resize(
                &src,
                &mut resized,
                &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
            )
            .map_err(|e| PreprocessError::Resize(e.to_string()))?;

        Frame::from_raw(out_width, out_height, resized.into_vec()).ok_or_else(|| {
            PreprocessError::Resize(format!(
                "resized buffer does not fit {}x{}",
                out_width, out_height
            ))
        })
    }
}

impl Default for CpuFrameFilter {
    fn default() -> Self {
        Self::new(FilterParams::default(), DEFAULT_INPUT_SIZE)
    }
}

impl FrameFilter for CpuFrameFilter {
    fn apply(&self, frame: &Frame, kind: FilterKind) -> Result<Frame, PreprocessError> {
        let _s = span!("filter_frame");

        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(PreprocessError::InvalidFrame(format!(
                "empty frame ({}x{})",
                width, height
            )));
        }

        tracing::trace!(width, height, filter = %kind, "Filtering frame");

        let filtered = self.denoise(frame, kind)?;
        self.resize(&filtered)
    }

    fn output_size(&self) -> (u32, u32) {
        self.output_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_output_resolution_for_all_filters() {
        let filter = CpuFrameFilter::default();
        let frame = gradient_frame(640, 480);

        for kind in [
            FilterKind::Gaussian,
            FilterKind::Median,
            FilterKind::Mean,
            FilterKind::None,
        ] {
            let out = filter.apply(&frame, kind).unwrap();
            assert_eq!(
                out.dimensions(),
                (416, 416),
                "{} filter should produce a 416x416 frame",
                kind
            );
        }
    }

    #[test]
    fn test_small_and_odd_sizes_are_stretched() {
        let filter = CpuFrameFilter::default();

        for (w, h) in [(1, 1), (3, 7), (1920, 1080), (416, 416)] {
            let out = filter
                .apply(&gradient_frame(w, h), FilterKind::Gaussian)
                .unwrap();
            assert_eq!(out.dimensions(), (416, 416), "input {}x{}", w, h);
        }
    }

    #[test]
    fn test_empty_frame_rejected() {
        let filter = CpuFrameFilter::default();
        let result = filter.apply(&Frame::new(0, 0), FilterKind::Gaussian);

        assert!(
            matches!(result, Err(PreprocessError::InvalidFrame(_))),
            "Empty frame should be rejected"
        );
    }

    #[test]
    fn test_even_kernel_rejected() {
        let filter = CpuFrameFilter::new(
            FilterParams {
                kernel_size: 4,
                sigma: 0.0,
            },
            DEFAULT_INPUT_SIZE,
        );
        let result = filter.apply(&gradient_frame(32, 32), FilterKind::Median);

        assert!(matches!(result, Err(PreprocessError::InvalidKernel(4))));
    }

    #[test]
    fn test_uniform_frame_is_unchanged_by_filters() {
        let filter = CpuFrameFilter::default();
        let frame = Frame::from_pixel(100, 50, Rgb([90, 120, 200]));

        for kind in [FilterKind::Gaussian, FilterKind::Median, FilterKind::Mean] {
            let out = filter.apply(&frame, kind).unwrap();
            let px = out.get_pixel(208, 208);
            for (c, expected) in [90i32, 120, 200].into_iter().enumerate() {
                assert!(
                    (px[c] as i32 - expected).abs() <= 1,
                    "{} filter changed a flat channel {} to {}",
                    kind,
                    expected,
                    px[c]
                );
            }
        }
    }

    #[test]
    fn test_median_removes_salt_noise() {
        let params = FilterParams::default();
        let filter = CpuFrameFilter::new(params, (32, 32));

        let mut frame = Frame::from_pixel(32, 32, Rgb([10, 10, 10]));
        frame.put_pixel(16, 16, Rgb([255, 255, 255]));

        let out = filter.apply(&frame, FilterKind::Median).unwrap();
        assert_eq!(out.get_pixel(16, 16), &Rgb([10, 10, 10]));
    }

    #[test]
    fn test_input_is_not_modified() {
        let filter = CpuFrameFilter::default();
        let frame = gradient_frame(64, 48);
        let before = frame.clone();

        let _ = filter.apply(&frame, FilterKind::Gaussian).unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn test_deterministic() {
        let filter = CpuFrameFilter::default();
        let frame = gradient_frame(320, 240);

        let a = filter.apply(&frame, FilterKind::Gaussian).unwrap();
        let b = filter.apply(&frame, FilterKind::Gaussian).unwrap();
        assert_eq!(a, b);
    }

    // ========== Gaussian kernel size ==========

    fn impulse_frame() -> Frame {
        let mut frame = Frame::new(416, 416);
        frame.put_pixel(200, 200, Rgb([255, 255, 255]));
        frame
    }

    fn nonzero_around_impulse(frame: &Frame) -> (usize, usize) {
        let row = (196..=204)
            .filter(|&x| frame.get_pixel(x, 200)[0] > 0)
            .count();
        let column = (196..=204)
            .filter(|&y| frame.get_pixel(200, y)[0] > 0)
            .count();
        (row, column)
    }

    #[test]
    fn test_gaussian_impulse_spreads_over_kernel_size() {
        let filter = CpuFrameFilter::default();
        let out = filter.denoise(&impulse_frame(), FilterKind::Gaussian).unwrap();

        assert_eq!(nonzero_around_impulse(&out), (3, 3));
        assert!(out.get_pixel(200, 200)[0] > out.get_pixel(201, 200)[0]);
    }

    #[test]
    fn test_gaussian_follows_kernel_size() {
        let filter = CpuFrameFilter::new(FilterParams::new(5, 0.0).unwrap(), DEFAULT_INPUT_SIZE);
        let out = filter.denoise(&impulse_frame(), FilterKind::Gaussian).unwrap();

        assert_eq!(nonzero_around_impulse(&out), (5, 5));
    }
}
