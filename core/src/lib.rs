// Sitewarden Core Library
// On-device hazard detection inference orchestration runtime

pub mod advisor;
pub mod analyzer;
pub mod backend;
pub mod capability;
pub mod classifier;
pub mod detector;
pub mod hazard;
pub mod kernel;
pub mod metrics;
pub mod pipeline;
pub mod postprocess;
pub mod selection;

// Export core types
pub use advisor::{ModelSwitchAdvisor, ModelVariant, SwitchAction, SwitchRecommendation};
pub use analyzer::{
    AnalysisReport, AnalysisRequest, AnalyzerDescriptor, AnalyzerFallbackChain, AnalyzerState,
    HazardAnalyzer, StubAnalyzer,
};
pub use backend::Backend;
pub use capability::{DeviceCapabilities, DeviceCapabilityProbe, DeviceTier, ThermalState};
pub use classifier::HazardClassifier;
pub use detector::LocalDetectorAnalyzer;
pub use hazard::{HazardDetection, HazardType, Severity, SiteAssessment, WorkType};
pub use kernel::{InferenceKernel, StubKernel};
pub use metrics::{InferenceMetric, PerformanceMonitor, PerformanceScore};
pub use pipeline::HazardPipeline;
pub use postprocess::{BoundingBox, DetectionPostProcessor, RawDetection};
pub use selection::BackendSelectionPolicy;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Capability signal error: {0}")]
    SignalError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Analyzer error: {0}")]
    AnalyzerError(String),

    #[error("Analyzer timed out after {0} ms")]
    AnalyzerTimeout(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, WardenError>;
