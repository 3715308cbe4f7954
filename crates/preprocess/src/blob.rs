use common::span;
use ndarray::Array4;
use schema::Frame;

/// Pack an RGB frame into the detector input tensor: NCHW `1x3xHxW`,
/// channel planes in R, G, B order, values scaled to `[0, 1]`.
pub fn to_blob(frame: &Frame) -> Array4<f32> {
    let _s = span!("to_blob");

    let width = frame.width() as usize;
    let height = frame.height() as usize;

    Array4::from_shape_fn((1, 3, height, width), |(_, c, y, x)| {
        frame.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
}
