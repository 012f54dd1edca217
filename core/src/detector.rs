// On-device detector analyzer
//
// Chain member that runs the full local path: pick a backend for the current
// capability snapshot, invoke the opaque kernel, post-process, classify, and
// record a metric for the cycle. The capability snapshot is pushed in by the
// pipeline; this analyzer never probes on the inference path.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::debug;

use crate::advisor::ModelVariant;
use crate::analyzer::{AnalysisRequest, AnalyzerCapability, HazardAnalyzer};
use crate::backend::Backend;
use crate::capability::DeviceCapabilities;
use crate::classifier::HazardClassifier;
use crate::hazard::SiteAssessment;
use crate::kernel::InferenceKernel;
use crate::metrics::{InferenceMetric, PerformanceMonitor};
use crate::postprocess::DetectionPostProcessor;
use crate::selection::BackendSelectionPolicy;
use crate::Result;

pub struct LocalDetectorAnalyzer {
    priority: u32,
    kernel: Arc<dyn InferenceKernel>,
    policy: Arc<BackendSelectionPolicy>,
    postprocessor: DetectionPostProcessor,
    classifier: HazardClassifier,
    monitor: PerformanceMonitor,
    capabilities: RwLock<DeviceCapabilities>,
    variant: RwLock<ModelVariant>,
}

impl LocalDetectorAnalyzer {
    pub fn new(
        priority: u32,
        kernel: Arc<dyn InferenceKernel>,
        policy: Arc<BackendSelectionPolicy>,
        classifier: HazardClassifier,
        monitor: PerformanceMonitor,
        capabilities: DeviceCapabilities,
    ) -> Self {
        Self {
            priority,
            kernel,
            policy,
            postprocessor: DetectionPostProcessor::new(),
            classifier,
            monitor,
            capabilities: RwLock::new(capabilities),
            variant: RwLock::new(ModelVariant::Small),
        }
    }

    /// Replace the capability snapshot used for backend selection
    pub fn refresh_capabilities(&self, caps: DeviceCapabilities) {
        *self
            .capabilities
            .write()
            .unwrap_or_else(|e| e.into_inner()) = caps;
    }

    pub fn variant(&self) -> ModelVariant {
        *self.variant.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Swap the model variant for subsequent inferences
    pub fn set_variant(&self, variant: ModelVariant) {
        *self.variant.write().unwrap_or_else(|e| e.into_inner()) = variant;
        debug!(variant = variant.label(), "model variant switched");
    }

    /// Backend the policy would run the next inference on
    pub fn current_backend(&self) -> Backend {
        let caps = self
            .capabilities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        self.policy.select(&caps, false)
    }
}

#[async_trait]
impl HazardAnalyzer for LocalDetectorAnalyzer {
    fn name(&self) -> &'static str {
        "local-detector"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn capabilities(&self) -> Vec<AnalyzerCapability> {
        vec![
            AnalyzerCapability::ObjectDetection,
            AnalyzerCapability::Offline,
        ]
    }

    fn expected_fps(&self) -> f32 {
        self.current_backend().expected_fps()
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<SiteAssessment> {
        let caps = self
            .capabilities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let backend = self.policy.select(&caps, false);
        let variant = self.variant();

        let started = Instant::now();
        let raw = self
            .kernel
            .run_inference(&request.image, backend, variant)
            .await?;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        let filtered = self.postprocessor.process(
            raw,
            request.confidence_threshold,
            request.iou_threshold,
        );

        let mean_confidence = if filtered.is_empty() {
            0.0
        } else {
            filtered.iter().map(|d| d.confidence).sum::<f32>() / filtered.len() as f32
        };

        self.monitor
            .record(InferenceMetric::now(
                processing_time_ms,
                variant.memory_footprint(),
                filtered.len(),
                mean_confidence,
                caps.tier,
                variant,
            ))
            .await;

        debug!(
            backend = %backend,
            variant = variant.label(),
            detections = filtered.len(),
            elapsed_ms = processing_time_ms,
            "local inference completed"
        );

        Ok(self.classifier.classify(&filtered, request.work_type))
    }
}
