use super::Detector;
use crate::yolo::{self, ModelLayout};
use ndarray::Array4;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use schema::RawDetection;

#[derive(Debug, Clone, Copy)]
pub enum ExecutionProvider {
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda,
}

/// YOLO detector running on ONNX Runtime.
///
/// Every model output is decoded with the same layout and the candidates are
/// concatenated, so multi-scale Darknet exports work unchanged.
pub struct OrtDetector {
    session: Session,
    layout: ModelLayout,
    input_size: (u32, u32),
}

impl OrtDetector {
    pub fn load_model(
        path: &str,
        layout: ModelLayout,
        input_size: (u32, u32),
    ) -> anyhow::Result<Self> {
        Self::load_model_with_provider(path, layout, input_size, ExecutionProvider::Cpu)
    }

    pub fn load_model_with_provider(
        path: &str,
        layout: ModelLayout,
        input_size: (u32, u32),
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        #[allow(unused_mut)]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;

        tracing::info!(%layout, "Model loaded from {}", path);
        Ok(Self {
            session,
            layout,
            input_size,
        })
    }
}

impl Detector for OrtDetector {
    #[tracing::instrument(skip(self, blob))]
    fn infer(&mut self, blob: &Array4<f32>) -> anyhow::Result<Vec<RawDetection>> {
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(blob.view())?])?;

        let mut detections = Vec::new();
        for (_name, output) in outputs.iter() {
            let output = output.try_extract_array::<f32>()?;
            detections.extend(yolo::decode(&output, self.layout, self.input_size)?);
        }

        tracing::debug!(candidates = detections.len(), "Decoded model outputs");
        Ok(detections)
    }
}
