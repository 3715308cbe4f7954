pub mod blob;
pub mod config;
pub mod cpu;
pub mod error;

use schema::Frame;
use std::fmt;
use std::str::FromStr;

pub use blob::to_blob;
pub use config::{DEFAULT_INPUT_SIZE, DEFAULT_KERNEL_SIZE};
pub use cpu::CpuFrameFilter;
pub use error::PreprocessError;

/// Noise-reduction filter applied before the frame is resized for detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterKind {
    #[default]
    Gaussian,
    Median,
    Mean,
    None,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Gaussian => "gaussian",
            FilterKind::Median => "median",
            FilterKind::Mean => "mean",
            FilterKind::None => "none",
        }
    }
}

impl FromStr for FilterKind {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gaussian" => Ok(FilterKind::Gaussian),
            "median" => Ok(FilterKind::Median),
            "mean" | "box" => Ok(FilterKind::Mean),
            "none" => Ok(FilterKind::None),
            other => Err(PreprocessError::UnknownFilter(other.to_string())),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kernel parameters shared by all filter kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Square kernel side, odd and >= 1.
    pub kernel_size: u32,
    /// Gaussian standard deviation. Zero or negative derives it from the kernel size.
    pub sigma: f32,
}

impl FilterParams {
    pub fn new(kernel_size: u32, sigma: f32) -> Result<Self, PreprocessError> {
        let params = Self { kernel_size, sigma };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), PreprocessError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(PreprocessError::InvalidKernel(self.kernel_size));
        }
        Ok(())
    }

    /// Pixels on each side of the center pixel.
    pub fn radius(&self) -> u32 {
        self.kernel_size / 2
    }

    pub fn effective_sigma(&self) -> f32 {
        if self.sigma > 0.0 {
            return self.sigma;
        }
        0.3 * ((self.kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// Normalized 1-D Gaussian with exactly `kernel_size` taps.
    pub fn gaussian_kernel(&self) -> Vec<f32> {
        let sigma = self.effective_sigma();
        let radius = self.radius() as i32;

        let weights: Vec<f32> = (-radius..=radius)
            .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
            .collect();
        let sum: f32 = weights.iter().sum();
        weights.into_iter().map(|w| w / sum).collect()
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            kernel_size: DEFAULT_KERNEL_SIZE,
            sigma: 0.0,
        }
    }
}

/// Noise reduction plus resize to the detector resolution.
pub trait FrameFilter {
    /// Filter `frame` with `kind` and stretch it to [`FrameFilter::output_size`].
    ///
    /// Rejects empty frames without filtering. Does not modify the input.
    fn apply(&self, frame: &Frame, kind: FilterKind) -> Result<Frame, PreprocessError>;

    fn output_size(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_kind_parsing() {
        assert_eq!("gaussian".parse::<FilterKind>().unwrap(), FilterKind::Gaussian);
        assert_eq!("Median".parse::<FilterKind>().unwrap(), FilterKind::Median);
        assert_eq!("mean".parse::<FilterKind>().unwrap(), FilterKind::Mean);
        assert_eq!(" none ".parse::<FilterKind>().unwrap(), FilterKind::None);
        assert!(matches!(
            "bilateral".parse::<FilterKind>(),
            Err(PreprocessError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_filter_kind_display_round_trips() {
        for kind in [
            FilterKind::Gaussian,
            FilterKind::Median,
            FilterKind::Mean,
            FilterKind::None,
        ] {
            assert_eq!(kind.to_string().parse::<FilterKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kernel_validation() {
        assert!(FilterParams::new(1, 0.0).is_ok());
        assert!(FilterParams::new(5, 0.0).is_ok());
        assert!(matches!(
            FilterParams::new(0, 0.0),
            Err(PreprocessError::InvalidKernel(0))
        ));
        assert!(matches!(
            FilterParams::new(4, 0.0),
            Err(PreprocessError::InvalidKernel(4))
        ));
    }

    #[test]
    fn test_effective_sigma() {
        // k = 3 => 0.3 * ((3 - 1) * 0.5 - 1) + 0.8 = 0.8
        let derived = FilterParams::default().effective_sigma();
        assert!((derived - 0.8).abs() < 1e-6, "got {}", derived);

        // k = 7 => 0.3 * (3 - 1) + 0.8 = 1.4
        let derived = FilterParams::new(7, 0.0).unwrap().effective_sigma();
        assert!((derived - 1.4).abs() < 1e-6, "got {}", derived);

        let explicit = FilterParams::new(3, 2.0).unwrap().effective_sigma();
        assert_eq!(explicit, 2.0);
    }

    #[test]
    fn test_gaussian_kernel_taps() {
        for k in [1, 3, 5, 7] {
            let kernel = FilterParams::new(k, 0.0).unwrap().gaussian_kernel();
            assert_eq!(kernel.len(), k as usize);

            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "k = {} sums to {}", k, sum);

            let center = kernel.len() / 2;
            for i in 0..center {
                assert_eq!(kernel[i], kernel[kernel.len() - 1 - i], "k = {} is not symmetric", k);
                assert!(kernel[i] < kernel[i + 1]);
            }
        }
    }
}
