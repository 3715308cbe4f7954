use ndarray::Array4;
use schema::RawDetection;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Object detector reached through a blocking call.
///
/// Takes the NCHW blob built from a filtered frame and returns every raw
/// candidate record, normalized to the detector input.
pub trait Detector {
    fn infer(&mut self, blob: &Array4<f32>) -> anyhow::Result<Vec<RawDetection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn infer(&mut self, blob: &Array4<f32>) -> anyhow::Result<Vec<RawDetection>> {
        (**self).infer(blob)
    }
}
