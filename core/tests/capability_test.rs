use mockall::mock;
use std::sync::Arc;

use sitewarden_core::capability::PlatformSignals;
use sitewarden_core::{DeviceCapabilityProbe, DeviceTier, Result, ThermalState, WardenError};

mock! {
    Signals {}

    impl PlatformSignals for Signals {
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
}

const GIB: u64 = 1024 * 1024 * 1024;

// Healthy high-end defaults; individual tests override fields before the
// accelerator expectations are installed.
struct SignalFixture {
    battery_level: f32,
    gpu: Result<bool>,
    npu: Result<bool>,
}

impl SignalFixture {
    fn healthy() -> Self {
        Self {
            battery_level: 0.9,
            gpu: Ok(true),
            npu: Ok(true),
        }
    }

    fn build(self) -> MockSignals {
        let mut signals = MockSignals::new();
        signals.expect_name().return_const("mock");
        signals.expect_total_memory().returning(|| Ok(8 * GIB));
        signals.expect_available_memory().returning(|| Ok(4 * GIB));
        signals.expect_cpu_cores().returning(|| Ok(8));
        signals
            .expect_thermal_state()
            .returning(|| Ok(ThermalState::Nominal));
        let battery = self.battery_level;
        signals.expect_battery_level().returning(move || Ok(battery));
        signals.expect_power_save().returning(|| Ok(false));
        let gpu_ok = self.gpu.is_ok();
        signals.expect_has_gpu().returning(move || {
            if gpu_ok {
                Ok(true)
            } else {
                Err(WardenError::SignalError("driver query failed".into()))
            }
        });
        let npu_ok = self.npu.is_ok();
        signals.expect_has_npu().returning(move || {
            if npu_ok {
                Ok(true)
            } else {
                Err(WardenError::SignalError("driver query failed".into()))
            }
        });
        signals
    }
}

#[test]
fn probe_assembles_snapshot_from_signals() {
    let probe = DeviceCapabilityProbe::new(Arc::new(SignalFixture::healthy().build()));
    let caps = probe.probe();

    assert_eq!(caps.tier, DeviceTier::HighEnd);
    assert_eq!(caps.total_memory, 8 * GIB);
    assert_eq!(caps.cpu_cores, 8);
    assert!(caps.has_npu);
    assert!(!caps.power_save);
}

#[test]
fn failed_accelerator_reads_default_to_absent() {
    let mut fixture = SignalFixture::healthy();
    fixture.gpu = Err(WardenError::SignalError("driver query failed".into()));
    fixture.npu = Err(WardenError::SignalError("driver query failed".into()));

    let probe = DeviceCapabilityProbe::new(Arc::new(fixture.build()));
    let caps = probe.probe();

    assert!(!caps.has_gpu);
    assert!(!caps.has_npu);
    // Without an accelerator the same memory profile is only mid-range
    assert_eq!(caps.tier, DeviceTier::MidRange);
}

#[test]
fn out_of_range_battery_reading_is_clamped() {
    let mut fixture = SignalFixture::healthy();
    fixture.battery_level = 1.7;

    let probe = DeviceCapabilityProbe::new(Arc::new(fixture.build()));
    assert_eq!(probe.probe().battery_level, 1.0);
}

#[test]
fn snapshots_compare_by_value() {
    let probe = DeviceCapabilityProbe::new(Arc::new(SignalFixture::healthy().build()));
    let first = probe.probe();
    let second = probe.probe();
    assert_eq!(first, second);
}
