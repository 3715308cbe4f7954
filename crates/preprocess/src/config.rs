use schema::DETECTION_RESOLUTION;

/// Detector input size as (width, height).
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (DETECTION_RESOLUTION, DETECTION_RESOLUTION);

pub const DEFAULT_KERNEL_SIZE: u32 = 3;
