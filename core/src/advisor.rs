// Model variant switch advisor
//
// Hysteresis-based recommender: the upgrade and downgrade thresholds leave a
// dead band between them so noisy scores do not oscillate between adjacent
// variants. Transitions are always a single step.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::DeviceTier;
use crate::metrics::PerformanceScore;

/// Detection model size tier, ordered smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    Nano,
    Small,
    Medium,
}

impl ModelVariant {
    pub fn label(&self) -> &'static str {
        match self {
            ModelVariant::Nano => "nano",
            ModelVariant::Small => "small",
            ModelVariant::Medium => "medium",
        }
    }

    /// Approximate resident footprint of the loaded variant
    pub fn memory_footprint(&self) -> u64 {
        match self {
            ModelVariant::Nano => 64 * 1024 * 1024,
            ModelVariant::Small => 128 * 1024 * 1024,
            ModelVariant::Medium => 256 * 1024 * 1024,
        }
    }

    pub fn step_up(&self) -> Option<ModelVariant> {
        match self {
            ModelVariant::Nano => Some(ModelVariant::Small),
            ModelVariant::Small => Some(ModelVariant::Medium),
            ModelVariant::Medium => None,
        }
    }

    pub fn step_down(&self) -> Option<ModelVariant> {
        match self {
            ModelVariant::Nano => None,
            ModelVariant::Small => Some(ModelVariant::Nano),
            ModelVariant::Medium => Some(ModelVariant::Small),
        }
    }
}

/// Qualitative direction of an expected change. These are heuristics, not
/// measured deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedDelta {
    Lower,
    Similar,
    Higher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchAction {
    Downgrade,
    Hold,
    Upgrade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchRecommendation {
    pub action: SwitchAction,
    pub from: ModelVariant,
    pub to: ModelVariant,
    pub reason: String,
    pub expected_latency: ExpectedDelta,
    pub expected_accuracy: ExpectedDelta,
}

/// Score thresholds for variant movement. `upgrade_above` must sit strictly
/// above `downgrade_below`; the gap is the hysteresis band.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub downgrade_below: f32,
    pub upgrade_above: f32,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            downgrade_below: 0.6,
            upgrade_above: 0.85,
        }
    }
}

pub struct ModelSwitchAdvisor {
    config: AdvisorConfig,
}

impl ModelSwitchAdvisor {
    pub fn new() -> Self {
        Self::with_config(AdvisorConfig::default())
    }

    pub fn with_config(config: AdvisorConfig) -> Self {
        Self { config }
    }

    /// Recommend at most a single-step variant change for the current score.
    /// Upgrades are reserved for high-end devices; every other tier holds or
    /// moves down.
    pub fn recommend(
        &self,
        score: PerformanceScore,
        current: ModelVariant,
        tier: DeviceTier,
    ) -> SwitchRecommendation {
        if score.overall < self.config.downgrade_below {
            if let Some(smaller) = current.step_down() {
                let rec = SwitchRecommendation {
                    action: SwitchAction::Downgrade,
                    from: current,
                    to: smaller,
                    reason: format!(
                        "performance score {:.2} below {:.2}, stepping down to {}",
                        score.overall,
                        self.config.downgrade_below,
                        smaller.label()
                    ),
                    expected_latency: ExpectedDelta::Lower,
                    expected_accuracy: ExpectedDelta::Lower,
                };
                debug!(from = current.label(), to = smaller.label(), "downgrade recommended");
                return rec;
            }
            return hold(
                current,
                format!(
                    "performance score {:.2} is weak but {} is already the smallest variant",
                    score.overall,
                    current.label()
                ),
            );
        }

        if score.overall > self.config.upgrade_above {
            if tier != DeviceTier::HighEnd {
                return hold(
                    current,
                    format!("score {:.2} is strong but device tier is not high-end", score.overall),
                );
            }
            if let Some(larger) = current.step_up() {
                let rec = SwitchRecommendation {
                    action: SwitchAction::Upgrade,
                    from: current,
                    to: larger,
                    reason: format!(
                        "performance score {:.2} above {:.2} on high-end device, stepping up to {}",
                        score.overall,
                        self.config.upgrade_above,
                        larger.label()
                    ),
                    expected_latency: ExpectedDelta::Higher,
                    expected_accuracy: ExpectedDelta::Higher,
                };
                debug!(from = current.label(), to = larger.label(), "upgrade recommended");
                return rec;
            }
            return hold(
                current,
                format!("{} is already the largest variant", current.label()),
            );
        }

        hold(
            current,
            format!("performance score {:.2} is inside the stable band", score.overall),
        )
    }
}

impl Default for ModelSwitchAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

fn hold(current: ModelVariant, reason: String) -> SwitchRecommendation {
    SwitchRecommendation {
        action: SwitchAction::Hold,
        from: current,
        to: current,
        reason,
        expected_latency: ExpectedDelta::Similar,
        expected_accuracy: ExpectedDelta::Similar,
    }
}
