// Backend selection policy
//
// Pure decision cascade from a capability snapshot to an execution backend,
// with a short-lived cache so repeated frames do not re-evaluate. The cascade
// is evaluated top-down and the first matching rule wins; it always resolves
// to a usable backend, with CPU as the universal fallback.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::backend::Backend;
use crate::capability::{DeviceCapabilities, DeviceTier};

/// Tunable policy constants. Defaults mirror the shipped decision cascade.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// How long a cached selection stays valid
    pub cache_ttl: Duration,
    /// Battery fraction below which the power-efficiency rule kicks in
    pub battery_floor: f32,
    /// Available-memory floor below which the small-footprint rule kicks in
    pub low_memory_bytes: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            battery_floor: 0.15,
            low_memory_bytes: (1.5 * 1024.0 * 1024.0 * 1024.0) as u64,
        }
    }
}

impl SelectionConfig {
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_battery_floor(mut self, floor: f32) -> Self {
        self.battery_floor = floor;
        self
    }

    pub fn with_low_memory_bytes(mut self, bytes: u64) -> Self {
        self.low_memory_bytes = bytes;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedSelection {
    backend: Backend,
    decided_at: Instant,
}

/// Chooses the execution backend for the current capability snapshot.
///
/// The cache is a single-writer cell; readers within the TTL accept staleness
/// by design of the 30-second assessment window.
pub struct BackendSelectionPolicy {
    config: SelectionConfig,
    cache: Mutex<Option<CachedSelection>>,
}

impl BackendSelectionPolicy {
    pub fn new() -> Self {
        Self::with_config(SelectionConfig::default())
    }

    pub fn with_config(config: SelectionConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(None),
        }
    }

    /// Resolve the backend for `caps`. A repeated call within the cache TTL
    /// returns the previously chosen backend unless `force` is set.
    pub fn select(&self, caps: &DeviceCapabilities, force: bool) -> Backend {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        if !force {
            if let Some(cached) = cache.as_ref() {
                if cached.decided_at.elapsed() < self.config.cache_ttl {
                    return cached.backend;
                }
            }
        }

        let (backend, reason) = self.evaluate(caps);
        debug!(backend = %backend, reason, forced = force, "backend selected");
        *cache = Some(CachedSelection {
            backend,
            decided_at: Instant::now(),
        });
        backend
    }

    /// Drop the cached selection so the next call re-evaluates
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = None;
    }

    fn evaluate(&self, caps: &DeviceCapabilities) -> (Backend, &'static str) {
        // 1. Thermal protection overrides everything else
        if caps.thermal.is_throttling() {
            return (lowest_power(caps), "thermal throttling");
        }

        // 2. Power conservation: efficiency over raw throughput
        if caps.power_save || caps.battery_level < self.config.battery_floor {
            return (lowest_power(caps), "power conservation");
        }

        // 3. Memory pressure: smallest model/runtime footprint
        if caps.available_memory < self.config.low_memory_bytes {
            return (smallest_footprint(caps), "low available memory");
        }

        // 4. Healthy device: fastest backend the tier can sustain. Budget
        //    devices are gated to CPU regardless of advertised GPU support.
        if caps.tier == DeviceTier::Budget {
            return (Backend::Cpu, "budget tier gated to CPU");
        }
        if caps.has_npu {
            (Backend::NpuQnn, "highest throughput available")
        } else if caps.has_gpu {
            (Backend::GpuOpenCl, "highest throughput available")
        } else {
            (Backend::Cpu, "no accelerator present")
        }
    }
}

impl Default for BackendSelectionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

// The NPU runs inference at a fraction of the CPU's power draw, so both the
// thermal and battery rules land on it when present.
fn lowest_power(caps: &DeviceCapabilities) -> Backend {
    if caps.has_npu {
        Backend::NpuQnn
    } else {
        Backend::Cpu
    }
}

fn smallest_footprint(caps: &DeviceCapabilities) -> Backend {
    if caps.has_npu {
        Backend::NpuQnn
    } else {
        Backend::Cpu
    }
}
