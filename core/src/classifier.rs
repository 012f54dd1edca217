// Hazard classification
//
// Three stages over post-processed detections:
//   A. direct class-to-hazard table lookup, gated by per-type confidence
//   B. contextual synthesis: a person box with no required PPE detection
//      nearby yields a missing-PPE hazard even though no detector class
//      exists for "PPE absence"; machinery close to a person is flagged too
//   C. aggregation into an assessment with max severity and deduplicated
//      recommendations
//
// Unrecognized classes are silently dropped; an empty assessment is a valid
// result, not a failure.

use std::collections::HashMap;
use tracing::debug;

use crate::hazard::{HazardDetection, HazardType, SiteAssessment, WorkType};
use crate::postprocess::RawDetection;

/// Protective equipment the contextual stage can require near a person
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PpeKind {
    HardHat,
    SafetyVest,
    Harness,
}

impl PpeKind {
    fn matches_class(&self, class: &str) -> bool {
        match self {
            PpeKind::HardHat => matches!(class, "hardhat" | "hard-hat" | "helmet"),
            PpeKind::SafetyVest => matches!(class, "safety-vest" | "vest"),
            PpeKind::Harness => matches!(class, "harness" | "safety-harness"),
        }
    }

    fn missing_hazard(&self) -> HazardType {
        match self {
            PpeKind::HardHat => HazardType::MissingHardHat,
            PpeKind::SafetyVest => HazardType::MissingSafetyVest,
            PpeKind::Harness => HazardType::MissingHarness,
        }
    }
}

// PPE requirements per work context. Head protection is universal; the rest
// follows the kind of exposure the work creates.
fn required_ppe(work: WorkType) -> &'static [PpeKind] {
    match work {
        WorkType::GeneralConstruction | WorkType::Demolition | WorkType::Excavation => {
            &[PpeKind::HardHat, PpeKind::SafetyVest]
        }
        WorkType::Roofing => &[PpeKind::HardHat, PpeKind::Harness],
        WorkType::Electrical | WorkType::Welding => &[PpeKind::HardHat],
    }
}

// Static class-to-hazard table for stage A
fn class_to_hazard(class: &str) -> Option<HazardType> {
    match class {
        "no-hardhat" => Some(HazardType::MissingHardHat),
        "no-safety-vest" => Some(HazardType::MissingSafetyVest),
        "unguarded-edge" | "open-edge" => Some(HazardType::UnguardedEdge),
        "exposed-wiring" | "live-wire" => Some(HazardType::ElectricalExposure),
        "unstable-scaffold" | "scaffold-defect" => Some(HazardType::UnstableScaffold),
        "trench" | "excavation-pit" => Some(HazardType::TrenchCollapse),
        "fire" | "flame" | "smoke" => Some(HazardType::FireHazard),
        "debris" => Some(HazardType::TrippingDebris),
        _ => None,
    }
}

fn is_person(class: &str) -> bool {
    matches!(class, "person" | "worker")
}

fn is_machinery(class: &str) -> bool {
    matches!(class, "machinery" | "excavator" | "vehicle")
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Center distance in normalized space under which a PPE detection
    /// counts as worn by a person. Euclidean on purpose; perspective is
    /// ignored, matching the deployed heuristic.
    pub proximity_threshold: f32,
    /// Per-type overrides of the default confidence thresholds
    pub threshold_overrides: HashMap<HazardType, f32>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 0.3,
            threshold_overrides: HashMap::new(),
        }
    }
}

impl ClassifierConfig {
    pub fn with_proximity_threshold(mut self, threshold: f32) -> Self {
        self.proximity_threshold = threshold;
        self
    }

    pub fn with_threshold_override(mut self, hazard: HazardType, threshold: f32) -> Self {
        self.threshold_overrides.insert(hazard, threshold);
        self
    }
}

/// Maps filtered detections into the hazard taxonomy
pub struct HazardClassifier {
    config: ClassifierConfig,
}

impl HazardClassifier {
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, detections: &[RawDetection], work: WorkType) -> SiteAssessment {
        let mut hazards = Vec::new();

        self.direct_hazards(detections, &mut hazards);
        self.contextual_hazards(detections, work, &mut hazards);

        if hazards.is_empty() {
            return SiteAssessment::empty();
        }

        let overall_severity = hazards.iter().map(|h| h.severity).max();

        let mut recommendations: Vec<String> = Vec::new();
        for h in &hazards {
            let text = h.hazard.recommendation().to_string();
            if !recommendations.contains(&text) {
                recommendations.push(text);
            }
        }

        debug!(
            hazards = hazards.len(),
            overall = ?overall_severity,
            "frame classified"
        );
        SiteAssessment {
            hazards,
            overall_severity,
            recommendations,
        }
    }

    // Stage A: table lookup gated by per-type confidence
    fn direct_hazards(&self, detections: &[RawDetection], out: &mut Vec<HazardDetection>) {
        for d in detections {
            let class = d.class_name.to_ascii_lowercase();
            if let Some(hazard) = class_to_hazard(&class) {
                if d.confidence >= self.threshold_for(hazard) {
                    out.push(HazardDetection::from_type(hazard, d.bbox));
                }
            }
        }
    }

    // Stage B: people vs required PPE and machinery proximity
    fn contextual_hazards(
        &self,
        detections: &[RawDetection],
        work: WorkType,
        out: &mut Vec<HazardDetection>,
    ) {
        let people: Vec<&RawDetection> = detections
            .iter()
            .filter(|d| is_person(&d.class_name.to_ascii_lowercase()))
            .collect();
        if people.is_empty() {
            return;
        }

        for person in &people {
            for &ppe in required_ppe(work) {
                let worn = detections.iter().any(|d| {
                    ppe.matches_class(&d.class_name.to_ascii_lowercase())
                        && person.bbox.center_distance(&d.bbox) < self.config.proximity_threshold
                });
                if worn {
                    continue;
                }
                let hazard = ppe.missing_hazard();
                if person.confidence >= self.threshold_for(hazard) {
                    out.push(HazardDetection::from_type(hazard, person.bbox));
                }
            }

            let near_machinery = detections.iter().any(|d| {
                is_machinery(&d.class_name.to_ascii_lowercase())
                    && person.bbox.center_distance(&d.bbox) < self.config.proximity_threshold
            });
            if near_machinery
                && person.confidence >= self.threshold_for(HazardType::MachineryProximity)
            {
                out.push(HazardDetection::from_type(
                    HazardType::MachineryProximity,
                    person.bbox,
                ));
            }
        }
    }

    fn threshold_for(&self, hazard: HazardType) -> f32 {
        self.config
            .threshold_overrides
            .get(&hazard)
            .copied()
            .unwrap_or_else(|| hazard.default_confidence_threshold())
    }
}

impl Default for HazardClassifier {
    fn default() -> Self {
        Self::new()
    }
}
