// Device capability probing
//
// A probe reads raw host signals through the `PlatformSignals` trait (one
// implementation per target platform, injected at construction) and condenses
// them into an immutable `DeviceCapabilities` snapshot. Signal reads may do
// blocking I/O, so callers keep probing off latency-sensitive paths and treat
// the snapshot as valid for the selection-cache window.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Result;

const GIB: u64 = 1024 * 1024 * 1024;

/// Coarse device class used to gate backend and model choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceTier {
    Budget,
    MidRange,
    HighEnd,
}

/// Thermal status levels, ordered from coolest to hottest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThermalState {
    Nominal,
    Fair,
    Serious,
    Severe,
    Critical,
}

impl ThermalState {
    /// True for the top two levels, where the OS is actively throttling
    pub fn is_throttling(&self) -> bool {
        matches!(self, ThermalState::Severe | ThermalState::Critical)
    }
}

/// Immutable snapshot of what the device can do right now.
///
/// Created fresh on each probe, compared by value, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub tier: DeviceTier,
    pub thermal: ThermalState,
    pub total_memory: u64,
    pub available_memory: u64,
    pub cpu_cores: usize,
    pub has_gpu: bool,
    pub has_npu: bool,
    /// Battery charge as a fraction in [0, 1]
    pub battery_level: f32,
    pub power_save: bool,
}

/// Raw platform signal reads. Individual reads may fail; the probe substitutes
/// conservative defaults so a snapshot is always produced.
pub trait PlatformSignals: Send + Sync {
    fn name(&self) -> &'static str;

    fn total_memory(&self) -> Result<u64>;
    fn available_memory(&self) -> Result<u64>;
    fn cpu_cores(&self) -> Result<usize>;
    fn thermal_state(&self) -> Result<ThermalState>;
    fn battery_level(&self) -> Result<f32>;
    fn power_save(&self) -> Result<bool>;
    fn has_gpu(&self) -> Result<bool>;
    fn has_npu(&self) -> Result<bool>;
}

/// Capability probe over an injected platform signal source
#[derive(Clone)]
pub struct DeviceCapabilityProbe {
    signals: Arc<dyn PlatformSignals>,
}

impl DeviceCapabilityProbe {
    pub fn new(signals: Arc<dyn PlatformSignals>) -> Self {
        Self { signals }
    }

    /// Collect a capability snapshot. Never fails: any signal that cannot be
    /// read is replaced with its worst-case default (no accelerators, tight
    /// memory, nominal thermal).
    pub fn probe(&self) -> DeviceCapabilities {
        let total_memory = self.read("total_memory", 2 * GIB, |s| s.total_memory());
        let available_memory = self.read("available_memory", GIB, |s| s.available_memory());
        let cpu_cores = self.read("cpu_cores", 2, |s| s.cpu_cores());
        let thermal = self.read("thermal_state", ThermalState::Nominal, |s| s.thermal_state());
        let battery_level = self
            .read("battery_level", 1.0, |s| s.battery_level())
            .clamp(0.0, 1.0);
        let power_save = self.read("power_save", false, |s| s.power_save());
        let has_gpu = self.read("has_gpu", false, |s| s.has_gpu());
        let has_npu = self.read("has_npu", false, |s| s.has_npu());

        let tier = derive_tier(total_memory, cpu_cores, has_gpu, has_npu);

        let caps = DeviceCapabilities {
            tier,
            thermal,
            total_memory,
            available_memory,
            cpu_cores,
            has_gpu,
            has_npu,
            battery_level,
            power_save,
        };
        debug!(
            source = self.signals.name(),
            tier = ?caps.tier,
            thermal = ?caps.thermal,
            available_mb = caps.available_memory / (1024 * 1024),
            has_gpu = caps.has_gpu,
            has_npu = caps.has_npu,
            "device capabilities probed"
        );
        caps
    }

    fn read<T, F>(&self, signal: &str, default: T, f: F) -> T
    where
        F: Fn(&dyn PlatformSignals) -> Result<T>,
    {
        match f(self.signals.as_ref()) {
            Ok(v) => v,
            Err(e) => {
                warn!(signal, error = %e, "signal read failed, using default");
                default
            }
        }
    }
}

fn derive_tier(total_memory: u64, cpu_cores: usize, has_gpu: bool, has_npu: bool) -> DeviceTier {
    if total_memory >= 6 * GIB && cpu_cores >= 6 && (has_npu || has_gpu) {
        DeviceTier::HighEnd
    } else if total_memory >= 3 * GIB && cpu_cores >= 4 {
        DeviceTier::MidRange
    } else {
        DeviceTier::Budget
    }
}

/// Linux-host signal source reading /proc. Battery, thermal, and accelerator
/// signals are not exposed uniformly across hosts; reads that have no source
/// report an error and let the probe substitute the default.
pub struct HostSignals;

impl HostSignals {
    pub fn new() -> Self {
        Self
    }

    fn meminfo_field(field: &str) -> Result<u64> {
        let content = std::fs::read_to_string("/proc/meminfo")?;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix(field) {
                let kib = rest
                    .trim_start_matches(':')
                    .trim()
                    .trim_end_matches(" kB")
                    .parse::<u64>()
                    .map_err(|e| {
                        crate::WardenError::SignalError(format!("{}: {}", field, e))
                    })?;
                return Ok(kib * 1024);
            }
        }
        Err(crate::WardenError::SignalError(format!(
            "{} not found in /proc/meminfo",
            field
        )))
    }
}

impl Default for HostSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSignals for HostSignals {
    fn name(&self) -> &'static str {
        "host"
    }

    fn total_memory(&self) -> Result<u64> {
        Self::meminfo_field("MemTotal")
    }

    fn available_memory(&self) -> Result<u64> {
        Self::meminfo_field("MemAvailable")
    }

    fn cpu_cores(&self) -> Result<usize> {
        Ok(std::thread::available_parallelism()?.get())
    }

    fn thermal_state(&self) -> Result<ThermalState> {
        Err(crate::WardenError::SignalError(
            "no thermal source on host".to_string(),
        ))
    }

    fn battery_level(&self) -> Result<f32> {
        Err(crate::WardenError::SignalError(
            "no battery source on host".to_string(),
        ))
    }

    fn power_save(&self) -> Result<bool> {
        Ok(false)
    }

    fn has_gpu(&self) -> Result<bool> {
        Ok(false)
    }

    fn has_npu(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Fixed signal source for tests and demos
#[derive(Debug, Clone)]
pub struct StaticSignals {
    pub total_memory: u64,
    pub available_memory: u64,
    pub cpu_cores: usize,
    pub thermal: ThermalState,
    pub battery_level: f32,
    pub power_save: bool,
    pub has_gpu: bool,
    pub has_npu: bool,
}

impl StaticSignals {
    /// A healthy high-end device
    pub fn high_end() -> Self {
        Self {
            total_memory: 8 * GIB,
            available_memory: 4 * GIB,
            cpu_cores: 8,
            thermal: ThermalState::Nominal,
            battery_level: 0.9,
            power_save: false,
            has_gpu: true,
            has_npu: true,
        }
    }

    /// A constrained budget device
    pub fn budget() -> Self {
        Self {
            total_memory: 2 * GIB,
            available_memory: GIB,
            cpu_cores: 4,
            thermal: ThermalState::Nominal,
            battery_level: 0.5,
            power_save: false,
            has_gpu: true,
            has_npu: false,
        }
    }
}

impl PlatformSignals for StaticSignals {
    fn name(&self) -> &'static str {
        "static"
    }

    fn total_memory(&self) -> Result<u64> {
        Ok(self.total_memory)
    }

    fn available_memory(&self) -> Result<u64> {
        Ok(self.available_memory)
    }

    fn cpu_cores(&self) -> Result<usize> {
        Ok(self.cpu_cores)
    }

    fn thermal_state(&self) -> Result<ThermalState> {
        Ok(self.thermal)
    }

    fn battery_level(&self) -> Result<f32> {
        Ok(self.battery_level)
    }

    fn power_save(&self) -> Result<bool> {
        Ok(self.power_save)
    }

    fn has_gpu(&self) -> Result<bool> {
        Ok(self.has_gpu)
    }

    fn has_npu(&self) -> Result<bool> {
        Ok(self.has_npu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSignals;

    impl PlatformSignals for FailingSignals {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn total_memory(&self) -> Result<u64> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
        fn available_memory(&self) -> Result<u64> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
        fn cpu_cores(&self) -> Result<usize> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
        fn thermal_state(&self) -> Result<ThermalState> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
        fn battery_level(&self) -> Result<f32> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
        fn power_save(&self) -> Result<bool> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
        fn has_gpu(&self) -> Result<bool> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
        fn has_npu(&self) -> Result<bool> {
            Err(crate::WardenError::SignalError("unavailable".into()))
        }
    }

    #[test]
    fn probe_never_fails_on_dead_signals() {
        let probe = DeviceCapabilityProbe::new(Arc::new(FailingSignals));
        let caps = probe.probe();
        assert_eq!(caps.tier, DeviceTier::Budget);
        assert_eq!(caps.thermal, ThermalState::Nominal);
        assert!(!caps.has_gpu);
        assert!(!caps.has_npu);
    }

    #[test]
    fn high_end_tier_requires_accelerator() {
        assert_eq!(derive_tier(8 * GIB, 8, false, false), DeviceTier::MidRange);
        assert_eq!(derive_tier(8 * GIB, 8, false, true), DeviceTier::HighEnd);
    }

    #[test]
    fn thermal_ordering_and_throttling() {
        assert!(ThermalState::Nominal < ThermalState::Critical);
        assert!(!ThermalState::Serious.is_throttling());
        assert!(ThermalState::Severe.is_throttling());
        assert!(ThermalState::Critical.is_throttling());
    }
}
