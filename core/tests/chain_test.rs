use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sitewarden_core::analyzer::{AnalyzerCapability, ChainConfig};
use sitewarden_core::hazard::{HazardDetection, SiteAssessment};
use sitewarden_core::{
    AnalysisRequest, AnalyzerFallbackChain, AnalyzerState, BoundingBox, HazardAnalyzer,
    HazardType, Result, StubAnalyzer, WardenError, WorkType,
};

enum Behavior {
    Succeed,
    Fail,
    Unavailable,
    Hang,
}

struct TestAnalyzer {
    name: &'static str,
    priority: u32,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl TestAnalyzer {
    fn new(name: &'static str, priority: u32, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn assessment(&self) -> SiteAssessment {
        let hazard = HazardDetection::from_type(
            HazardType::UnguardedEdge,
            BoundingBox::new(0.5, 0.5, 0.2, 0.2),
        );
        SiteAssessment {
            overall_severity: Some(hazard.severity),
            recommendations: vec![hazard.hazard.recommendation().to_string()],
            hazards: vec![hazard],
        }
    }
}

#[async_trait]
impl HazardAnalyzer for TestAnalyzer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn capabilities(&self) -> Vec<AnalyzerCapability> {
        vec![AnalyzerCapability::HazardReasoning]
    }

    fn expected_fps(&self) -> f32 {
        100.0
    }

    async fn is_available(&self) -> bool {
        !matches!(self.behavior, Behavior::Unavailable)
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<SiteAssessment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(self.assessment()),
            Behavior::Fail => Err(WardenError::AnalyzerError("backend offline".into())),
            Behavior::Unavailable => Err(WardenError::AnalyzerError("should be skipped".into())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(self.assessment())
            }
        }
    }
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new(vec![0u8; 16], WorkType::GeneralConstruction)
}

#[tokio::test]
async fn highest_priority_available_analyzer_serves() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Succeed);
    let secondary = TestAnalyzer::new("secondary", 10, Behavior::Succeed);
    let chain = AnalyzerFallbackChain::new(vec![secondary.clone(), primary.clone()])?;

    let report = chain.analyze(&request()).await;
    assert_eq!(report.served_by, "primary");
    assert!(!report.degraded);
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn unavailable_analyzer_is_skipped() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Unavailable);
    let secondary = TestAnalyzer::new("secondary", 10, Behavior::Succeed);
    let chain = AnalyzerFallbackChain::new(vec![primary.clone(), secondary.clone()])?;

    let report = chain.analyze(&request()).await;
    assert_eq!(report.served_by, "secondary");
    assert_eq!(primary.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn failing_analyzer_falls_through_to_next() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Fail);
    let secondary = TestAnalyzer::new("secondary", 10, Behavior::Succeed);
    let chain = AnalyzerFallbackChain::new(vec![primary.clone(), secondary.clone()])?;

    let report = chain.analyze(&request()).await;
    assert_eq!(report.served_by, "secondary");
    assert!(!report.degraded);
    assert_eq!(primary.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn hanging_analyzer_times_out_and_falls_through() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Hang);
    let secondary = TestAnalyzer::new("secondary", 10, Behavior::Succeed);
    let config = ChainConfig {
        min_timeout: Duration::from_millis(50),
        max_timeout: Duration::from_millis(100),
        ..ChainConfig::default()
    };
    let chain = AnalyzerFallbackChain::with_config(vec![primary.clone(), secondary.clone()], config)?;

    let report = chain.analyze(&request()).await;
    assert_eq!(report.served_by, "secondary");
    Ok(())
}

#[tokio::test]
async fn exhausted_chain_returns_deterministic_stub() -> Result<()> {
    // Scenario: every analyzer unavailable; the caller still gets an answer
    let primary = TestAnalyzer::new("primary", 20, Behavior::Unavailable);
    let secondary = TestAnalyzer::new("secondary", 10, Behavior::Unavailable);
    let chain = AnalyzerFallbackChain::new(vec![primary, secondary])?;

    let first = chain.analyze(&request()).await;
    let second = chain.analyze(&request()).await;

    assert!(first.degraded);
    assert_eq!(first.served_by, "stub");
    assert!(first.assessment.hazards.is_empty());
    assert!(!first.assessment.recommendations.is_empty());
    assert_eq!(first.assessment, second.assessment);
    Ok(())
}

#[tokio::test]
async fn stub_analyzer_member_terminates_the_chain() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Fail);
    let chain =
        AnalyzerFallbackChain::new(vec![primary, Arc::new(StubAnalyzer::new())])?;

    let report = chain.analyze(&request()).await;
    assert_eq!(report.served_by, "stub");
    assert!(!report.degraded);
    Ok(())
}

#[tokio::test]
async fn repeated_failures_mark_analyzer_unavailable() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Fail);
    let secondary = TestAnalyzer::new("secondary", 10, Behavior::Succeed);
    let chain = AnalyzerFallbackChain::new(vec![primary.clone(), secondary.clone()])?;

    // Default failure threshold is 3
    for _ in 0..3 {
        chain.analyze(&request()).await;
    }
    assert_eq!(chain.state_of("primary"), AnalyzerState::Unavailable);

    // Once unavailable the analyzer is no longer invoked at all
    chain.analyze(&request()).await;
    assert_eq!(primary.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn duplicate_priorities_are_rejected_at_construction() {
    let a = TestAnalyzer::new("a", 10, Behavior::Succeed);
    let b = TestAnalyzer::new("b", 10, Behavior::Succeed);
    let result = AnalyzerFallbackChain::new(vec![a, b]);
    assert!(matches!(result, Err(WardenError::ConfigError(_))));
}

#[tokio::test]
async fn configure_all_transitions_states() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Succeed);
    let chain = AnalyzerFallbackChain::new(vec![primary])?;

    assert_eq!(chain.state_of("primary"), AnalyzerState::Unconfigured);
    chain.configure_all().await;
    assert_eq!(chain.state_of("primary"), AnalyzerState::Ready);
    Ok(())
}

#[tokio::test]
async fn descriptors_report_priority_order_and_availability() -> Result<()> {
    let primary = TestAnalyzer::new("primary", 20, Behavior::Succeed);
    let offline = TestAnalyzer::new("offline", 10, Behavior::Unavailable);
    let chain = AnalyzerFallbackChain::new(vec![offline, primary])?;

    let descriptors = chain.descriptors().await;
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].name, "primary");
    assert!(descriptors[0].available);
    assert_eq!(descriptors[1].name, "offline");
    assert!(!descriptors[1].available);
    Ok(())
}
