// Hazard pipeline orchestration
//
// Owns the probe, selection policy, monitor, advisor, and fallback chain and
// wires them into the per-frame cycle: analyze through the chain, then use
// the recorded metrics to decide whether to re-tune the backend and model
// variant for the next frame. All state is owned here; there are no
// process-wide globals.

use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::advisor::{ModelSwitchAdvisor, SwitchAction};
use crate::analyzer::{
    AnalysisReport, AnalysisRequest, AnalyzerDescriptor, AnalyzerFallbackChain, HazardAnalyzer,
    StubAnalyzer,
};
use crate::capability::{DeviceCapabilities, DeviceCapabilityProbe, PlatformSignals};
use crate::classifier::HazardClassifier;
use crate::detector::LocalDetectorAnalyzer;
use crate::hazard::WorkType;
use crate::kernel::InferenceKernel;
use crate::metrics::{PerformanceMonitor, PerformanceScore};
use crate::selection::BackendSelectionPolicy;
use crate::Result;

// Default chain positions: local detector first, stub as the terminal member
const LOCAL_DETECTOR_PRIORITY: u32 = 30;

pub struct HazardPipeline {
    probe: DeviceCapabilityProbe,
    policy: Arc<BackendSelectionPolicy>,
    monitor: PerformanceMonitor,
    advisor: ModelSwitchAdvisor,
    chain: AnalyzerFallbackChain,
    detector: Arc<LocalDetectorAnalyzer>,
    capabilities: RwLock<DeviceCapabilities>,
}

impl HazardPipeline {
    /// Build a pipeline around an inference kernel and a platform signal
    /// source, with the default local-detector + stub chain.
    pub fn new(
        kernel: Arc<dyn InferenceKernel>,
        signals: Arc<dyn PlatformSignals>,
    ) -> Result<Self> {
        Self::with_analyzers(kernel, signals, Vec::new())
    }

    /// Same as `new`, with additional chain members (e.g., cloud analyzers).
    /// Priorities across all members must be unique.
    pub fn with_analyzers(
        kernel: Arc<dyn InferenceKernel>,
        signals: Arc<dyn PlatformSignals>,
        extra: Vec<Arc<dyn HazardAnalyzer>>,
    ) -> Result<Self> {
        let probe = DeviceCapabilityProbe::new(signals);
        let caps = probe.probe();

        let policy = Arc::new(BackendSelectionPolicy::new());
        let monitor = PerformanceMonitor::new();

        let detector = Arc::new(LocalDetectorAnalyzer::new(
            LOCAL_DETECTOR_PRIORITY,
            kernel,
            Arc::clone(&policy),
            HazardClassifier::new(),
            monitor.clone(),
            caps.clone(),
        ));

        let mut analyzers: Vec<Arc<dyn HazardAnalyzer>> = vec![
            Arc::clone(&detector) as Arc<dyn HazardAnalyzer>,
            Arc::new(StubAnalyzer::new()),
        ];
        analyzers.extend(extra);
        let chain = AnalyzerFallbackChain::new(analyzers)?;

        info!(tier = ?caps.tier, "hazard pipeline constructed");
        Ok(Self {
            probe,
            policy,
            monitor,
            advisor: ModelSwitchAdvisor::new(),
            chain,
            detector,
            capabilities: RwLock::new(caps),
        })
    }

    /// Run configuration across the analyzer chain
    pub async fn start(&self) {
        self.chain.configure_all().await;
    }

    /// Analyze one frame. Never fails: chain exhaustion degrades to the
    /// stub report. After serving, the metric window decides whether the
    /// next frame gets a re-tuned backend or model variant.
    pub async fn analyze(&self, image: Vec<u8>, work_type: WorkType) -> AnalysisReport {
        let request = AnalysisRequest::new(image, work_type);
        let report = self.chain.analyze(&request).await;

        self.retune_if_needed().await;
        report
    }

    /// Current capability snapshot
    pub fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub async fn performance(&self) -> PerformanceScore {
        self.monitor.score().await
    }

    pub async fn descriptors(&self) -> Vec<AnalyzerDescriptor> {
        self.chain.descriptors().await
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    async fn retune_if_needed(&self) {
        let available_memory = self.capabilities().available_memory;
        if !self.monitor.should_reoptimize(available_memory).await {
            return;
        }

        // Re-probe off the async path; probing may touch blocking I/O
        let probe = self.probe.clone();
        let caps = match tokio::task::spawn_blocking(move || probe.probe()).await {
            Ok(caps) => caps,
            Err(e) => {
                warn!(error = %e, "capability re-probe failed, keeping last snapshot");
                self.capabilities()
            }
        };
        *self
            .capabilities
            .write()
            .unwrap_or_else(|e| e.into_inner()) = caps.clone();
        self.detector.refresh_capabilities(caps.clone());

        let backend = self.policy.select(&caps, true);
        let score = self.monitor.score().await;
        let recommendation = self
            .advisor
            .recommend(score, self.detector.variant(), caps.tier);

        info!(
            backend = %backend,
            score = score.overall,
            action = ?recommendation.action,
            reason = %recommendation.reason,
            "pipeline re-tuned"
        );

        if recommendation.action != SwitchAction::Hold {
            self.detector.set_variant(recommendation.to);
        }
        debug!(variant = self.detector.variant().label(), "active model variant");
    }
}
