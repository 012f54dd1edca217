// Analyzer fallback chain
//
// Orders analyzer backends by fixed priority and drives the uniform analyze
// contract with graceful degradation: skip unavailable members, bound every
// attempt with a throughput-scaled timeout, and fall through to the next
// member on failure. A timeout abandons the in-flight call; its eventual
// completion is dropped with the future, never spliced into a later attempt.
// If every member fails the chain still answers with a deterministic stub
// report, because silence about hazards is worse than a low-quality answer.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::hazard::{SiteAssessment, WorkType};
use crate::{Result, WardenError};

/// Lifecycle of one analyzer inside the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzerState {
    Unconfigured,
    Configuring,
    Ready,
    Analyzing,
    Unavailable,
}

/// What an analyzer declares it can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzerCapability {
    ObjectDetection,
    SceneUnderstanding,
    HazardReasoning,
    Offline,
}

/// Uniform analysis contract every chain member implements
#[async_trait]
pub trait HazardAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fixed chain position; higher runs first. The ordering must be total.
    fn priority(&self) -> u32;

    fn capabilities(&self) -> Vec<AnalyzerCapability>;

    /// Advertised throughput, used to scale this analyzer's timeout budget
    fn expected_fps(&self) -> f32;

    async fn is_available(&self) -> bool;

    async fn configure(&self) -> Result<()> {
        Ok(())
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<SiteAssessment>;
}

/// Snapshot of one chain member; availability is computed, not stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerDescriptor {
    pub name: String,
    pub priority: u32,
    pub capabilities: Vec<AnalyzerCapability>,
    pub available: bool,
    pub state: AnalyzerState,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub work_type: WorkType,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl AnalysisRequest {
    pub fn new(image: Vec<u8>, work_type: WorkType) -> Self {
        Self {
            image,
            work_type,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        }
    }

    pub fn with_thresholds(mut self, confidence: f32, iou: f32) -> Self {
        self.confidence_threshold = confidence;
        self.iou_threshold = iou;
        self
    }
}

/// Analysis result tagged with which analyzer served it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub assessment: SiteAssessment,
    pub served_by: String,
    /// Set when the chain was exhausted and the stub answered
    pub degraded: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Timeout budget in frames: budget = multiplier / expected_fps
    pub frame_budget_multiplier: f32,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    /// Consecutive failures before an analyzer is marked unavailable
    pub failure_threshold: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            frame_budget_multiplier: 10.0,
            min_timeout: Duration::from_millis(250),
            max_timeout: Duration::from_secs(15),
            failure_threshold: 3,
        }
    }
}

/// Priority-ordered analyzer chain with graceful degradation
pub struct AnalyzerFallbackChain {
    analyzers: Vec<Arc<dyn HazardAnalyzer>>,
    states: DashMap<&'static str, AnalyzerState>,
    failures: DashMap<&'static str, u32>,
    config: ChainConfig,
}

impl AnalyzerFallbackChain {
    pub fn new(analyzers: Vec<Arc<dyn HazardAnalyzer>>) -> Result<Self> {
        Self::with_config(analyzers, ChainConfig::default())
    }

    pub fn with_config(
        mut analyzers: Vec<Arc<dyn HazardAnalyzer>>,
        config: ChainConfig,
    ) -> Result<Self> {
        analyzers.sort_by(|a, b| b.priority().cmp(&a.priority()));
        for pair in analyzers.windows(2) {
            if pair[0].priority() == pair[1].priority() {
                return Err(WardenError::ConfigError(format!(
                    "analyzers {} and {} share priority {}",
                    pair[0].name(),
                    pair[1].name(),
                    pair[0].priority()
                )));
            }
        }

        let states = DashMap::new();
        for a in &analyzers {
            states.insert(a.name(), AnalyzerState::Unconfigured);
        }

        Ok(Self {
            analyzers,
            states,
            failures: DashMap::new(),
            config,
        })
    }

    /// Run configuration on every member, transitioning each to Ready or
    /// Unavailable. Safe to call more than once.
    pub async fn configure_all(&self) {
        for analyzer in &self.analyzers {
            let name = analyzer.name();
            self.states.insert(name, AnalyzerState::Configuring);
            match analyzer.configure().await {
                Ok(()) => {
                    self.states.insert(name, AnalyzerState::Ready);
                    info!(analyzer = name, "analyzer configured");
                }
                Err(e) => {
                    self.states.insert(name, AnalyzerState::Unavailable);
                    warn!(analyzer = name, error = %e, "analyzer failed to configure");
                }
            }
        }
    }

    /// Current descriptors in chain order
    pub async fn descriptors(&self) -> Vec<AnalyzerDescriptor> {
        let mut out = Vec::with_capacity(self.analyzers.len());
        for a in &self.analyzers {
            out.push(AnalyzerDescriptor {
                name: a.name().to_string(),
                priority: a.priority(),
                capabilities: a.capabilities(),
                available: a.is_available().await,
                state: self.state_of(a.name()),
            });
        }
        out
    }

    pub fn state_of(&self, name: &str) -> AnalyzerState {
        self.states
            .get(name)
            .map(|s| *s.value())
            .unwrap_or(AnalyzerState::Unconfigured)
    }

    /// Try every member in priority order; always returns a usable report.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisReport {
        let started = Instant::now();

        for analyzer in &self.analyzers {
            let name = analyzer.name();

            if self.state_of(name) == AnalyzerState::Unavailable {
                debug!(analyzer = name, "skipping analyzer marked unavailable");
                continue;
            }
            if !analyzer.is_available().await {
                debug!(analyzer = name, "analyzer reports unavailable, skipping");
                continue;
            }

            let budget = self.timeout_for(analyzer.as_ref());
            self.states.insert(name, AnalyzerState::Analyzing);

            match timeout(budget, analyzer.analyze(request)).await {
                Ok(Ok(assessment)) => {
                    self.record_success(name);
                    debug!(analyzer = name, "analysis served");
                    return AnalysisReport {
                        assessment,
                        served_by: name.to_string(),
                        degraded: false,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    };
                }
                Ok(Err(e)) => {
                    warn!(analyzer = name, error = %e, "analyzer failed, trying next");
                    self.record_failure(name);
                }
                Err(_) => {
                    let e = WardenError::AnalyzerTimeout(budget.as_millis() as u64);
                    warn!(analyzer = name, error = %e, "analyzer timed out, trying next");
                    self.record_failure(name);
                }
            }
        }

        warn!("analyzer chain exhausted, returning stub report");
        AnalysisReport {
            assessment: stub_assessment(),
            served_by: "stub".to_string(),
            degraded: true,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn timeout_for(&self, analyzer: &dyn HazardAnalyzer) -> Duration {
        let fps = analyzer.expected_fps().max(0.1);
        let budget =
            Duration::from_secs_f32(self.config.frame_budget_multiplier / fps);
        budget.clamp(self.config.min_timeout, self.config.max_timeout)
    }

    fn record_success(&self, name: &'static str) {
        self.failures.insert(name, 0);
        self.states.insert(name, AnalyzerState::Ready);
    }

    fn record_failure(&self, name: &'static str) {
        let mut count = self.failures.entry(name).or_insert(0);
        *count += 1;
        if *count >= self.config.failure_threshold {
            self.states.insert(name, AnalyzerState::Unavailable);
            warn!(
                analyzer = name,
                failures = *count,
                "analyzer marked unavailable after repeated failures"
            );
        } else {
            self.states.insert(name, AnalyzerState::Ready);
        }
    }
}

// The degraded answer when no analyzer could serve: no findings, minimal
// confidence, and an explicit manual-inspection recommendation.
fn stub_assessment() -> SiteAssessment {
    SiteAssessment {
        hazards: Vec::new(),
        overall_severity: None,
        recommendations: vec![
            "Automated analysis unavailable; perform a manual site inspection".to_string(),
        ],
    }
}

/// Deterministic minimal-confidence analyzer, the terminal chain member.
/// Always available, never fails.
#[derive(Debug, Default, Clone)]
pub struct StubAnalyzer;

impl StubAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HazardAnalyzer for StubAnalyzer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn priority(&self) -> u32 {
        0
    }

    fn capabilities(&self) -> Vec<AnalyzerCapability> {
        vec![AnalyzerCapability::Offline]
    }

    fn expected_fps(&self) -> f32 {
        100.0
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<SiteAssessment> {
        Ok(stub_assessment())
    }
}
