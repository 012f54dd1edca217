// Hazard taxonomy, severities, and regulatory reference tables
//
// The taxonomy is closed: the classifier can only emit these types. Severity,
// citation, and recommendation text are static lookups keyed on the type;
// per-type confidence thresholds are the defaults the classifier config can
// override.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::postprocess::BoundingBox;

/// Kind of work happening on site; parameterizes required-PPE rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    GeneralConstruction,
    Demolition,
    Electrical,
    Roofing,
    Excavation,
    Welding,
}

/// Hazard severity, ordered least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Closed set of safety findings the classifier can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardType {
    MissingHardHat,
    MissingSafetyVest,
    MissingHarness,
    UnguardedEdge,
    ElectricalExposure,
    UnstableScaffold,
    MachineryProximity,
    TrenchCollapse,
    FireHazard,
    TrippingDebris,
}

impl HazardType {
    pub fn severity(&self) -> Severity {
        match self {
            HazardType::MissingHardHat => Severity::High,
            HazardType::MissingSafetyVest => Severity::Medium,
            HazardType::MissingHarness => Severity::Critical,
            HazardType::UnguardedEdge => Severity::Critical,
            HazardType::ElectricalExposure => Severity::Critical,
            HazardType::UnstableScaffold => Severity::High,
            HazardType::MachineryProximity => Severity::High,
            HazardType::TrenchCollapse => Severity::Critical,
            HazardType::FireHazard => Severity::High,
            HazardType::TrippingDebris => Severity::Low,
        }
    }

    /// Minimum detector confidence before this type is emitted. Critical
    /// findings demand more evidence than housekeeping ones.
    pub fn default_confidence_threshold(&self) -> f32 {
        match self.severity() {
            Severity::Critical => 0.8,
            Severity::High => 0.7,
            Severity::Medium => 0.6,
            Severity::Low => 0.5,
        }
    }

    pub fn regulation(&self) -> RegulatoryReference {
        let (code, title) = match self {
            HazardType::MissingHardHat => ("1926.100(a)", "Head protection"),
            HazardType::MissingSafetyVest => ("1926.201(a)", "High-visibility apparel"),
            HazardType::MissingHarness => ("1926.501(b)(1)", "Fall protection systems"),
            HazardType::UnguardedEdge => ("1926.501(b)(1)", "Unprotected sides and edges"),
            HazardType::ElectricalExposure => ("1926.416(a)(1)", "Protection from live parts"),
            HazardType::UnstableScaffold => ("1926.451(f)", "Scaffold use requirements"),
            HazardType::MachineryProximity => ("1926.600(a)(3)", "Equipment operating clearance"),
            HazardType::TrenchCollapse => ("1926.652(a)(1)", "Protection in excavations"),
            HazardType::FireHazard => ("1926.151(a)", "Fire prevention"),
            HazardType::TrippingDebris => ("1926.25(a)", "Housekeeping"),
        };
        RegulatoryReference {
            code: code.to_string(),
            title: title.to_string(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HazardType::MissingHardHat => "Worker without head protection",
            HazardType::MissingSafetyVest => "Worker without high-visibility vest",
            HazardType::MissingHarness => "Worker without fall-arrest harness",
            HazardType::UnguardedEdge => "Unprotected edge or opening",
            HazardType::ElectricalExposure => "Exposed or unprotected electrical parts",
            HazardType::UnstableScaffold => "Scaffold in unsafe condition",
            HazardType::MachineryProximity => "Worker inside machinery operating radius",
            HazardType::TrenchCollapse => "Unprotected trench or excavation",
            HazardType::FireHazard => "Ignition or fuel source in work area",
            HazardType::TrippingDebris => "Debris or material obstructing walkways",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            HazardType::MissingHardHat => "Issue hard hats and enforce wear in active zones",
            HazardType::MissingSafetyVest => "Require high-visibility vests on site",
            HazardType::MissingHarness => "Provide fall-arrest harnesses and anchor points",
            HazardType::UnguardedEdge => "Install guardrails or covers at exposed edges",
            HazardType::ElectricalExposure => "De-energize or guard live parts before work",
            HazardType::UnstableScaffold => "Have a competent person inspect the scaffold",
            HazardType::MachineryProximity => "Establish exclusion zones around machinery",
            HazardType::TrenchCollapse => "Install shoring or benching before entry",
            HazardType::FireHazard => "Clear fuel sources and stage extinguishers",
            HazardType::TrippingDebris => "Clear walkways and schedule debris removal",
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Citation into the regulatory table supplied as configuration data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryReference {
    pub code: String,
    pub title: String,
}

/// One actionable finding. Derived once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDetection {
    pub hazard: HazardType,
    pub severity: Severity,
    pub bbox: BoundingBox,
    pub regulation: Option<RegulatoryReference>,
    pub description: String,
}

impl HazardDetection {
    pub fn from_type(hazard: HazardType, bbox: BoundingBox) -> Self {
        Self {
            hazard,
            severity: hazard.severity(),
            bbox,
            regulation: Some(hazard.regulation()),
            description: hazard.description().to_string(),
        }
    }
}

/// Aggregated classification output for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAssessment {
    pub hazards: Vec<HazardDetection>,
    /// Maximum severity among emitted hazards; None when the frame is clean
    pub overall_severity: Option<Severity>,
    /// Deduplicated per-hazard-type recommendation texts
    pub recommendations: Vec<String>,
}

impl SiteAssessment {
    pub fn empty() -> Self {
        Self {
            hazards: Vec::new(),
            overall_severity: None,
            recommendations: Vec::new(),
        }
    }

    pub fn is_clear(&self) -> bool {
        self.hazards.is_empty()
    }
}
