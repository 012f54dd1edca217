// External inference kernel boundary
//
// The neural network itself is an opaque collaborator: given image bytes, a
// backend, and a model variant it returns raw boxes. The core only selects
// its inputs and consumes its outputs.

use async_trait::async_trait;

use crate::advisor::ModelVariant;
use crate::backend::Backend;
use crate::postprocess::RawDetection;
use crate::Result;

/// Opaque detector kernel interface. Real implementations wrap an on-device
/// runtime (e.g., a TFLite or ONNX session) behind this seam.
#[async_trait]
pub trait InferenceKernel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_inference(
        &self,
        image: &[u8],
        backend: Backend,
        variant: ModelVariant,
    ) -> Result<Vec<RawDetection>>;
}

/// Canned-output kernel used by tests and the demo app
#[derive(Debug, Default, Clone)]
pub struct StubKernel {
    detections: Vec<RawDetection>,
}

impl StubKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detections(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }
}

#[async_trait]
impl InferenceKernel for StubKernel {
    fn name(&self) -> &'static str {
        "stub-kernel"
    }

    async fn run_inference(
        &self,
        _image: &[u8],
        _backend: Backend,
        _variant: ModelVariant,
    ) -> Result<Vec<RawDetection>> {
        Ok(self.detections.clone())
    }
}
