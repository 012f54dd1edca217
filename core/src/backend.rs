// Execution backend catalog
//
// A `Backend` is a hardware target the inference kernel can run on. Metadata
// here is static and advertised, not measured; the performance monitor is the
// source of truth for what a backend actually delivers on this device.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capability::DeviceCapabilities;

/// Hardware execution target for the detection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// Qualcomm QNN delegate
    NpuQnn,
    /// Generic NNAPI accelerator delegate
    NpuNnapi,
    /// GPU delegate over OpenCL
    GpuOpenCl,
    /// GPU delegate over OpenGL ES
    GpuOpenGl,
    /// Plain CPU execution, always available
    Cpu,
}

impl Backend {
    pub const ALL: [Backend; 5] = [
        Backend::NpuQnn,
        Backend::NpuNnapi,
        Backend::GpuOpenCl,
        Backend::GpuOpenGl,
        Backend::Cpu,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Backend::NpuQnn => "npu-qnn",
            Backend::NpuNnapi => "npu-nnapi",
            Backend::GpuOpenCl => "gpu-opencl",
            Backend::GpuOpenGl => "gpu-opengl",
            Backend::Cpu => "cpu",
        }
    }

    /// Advertised sustained throughput in frames per second
    pub fn expected_fps(&self) -> f32 {
        match self {
            Backend::NpuQnn => 30.0,
            Backend::NpuNnapi => 24.0,
            Backend::GpuOpenCl => 20.0,
            Backend::GpuOpenGl => 15.0,
            Backend::Cpu => 8.0,
        }
    }

    pub fn is_npu(&self) -> bool {
        matches!(self, Backend::NpuQnn | Backend::NpuNnapi)
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, Backend::GpuOpenCl | Backend::GpuOpenGl)
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, Backend::Cpu)
    }

    /// Whether the device hardware can run this backend at all. CPU is the
    /// universal member of every device's supported set.
    pub fn supported_by(&self, caps: &DeviceCapabilities) -> bool {
        match self {
            Backend::NpuQnn | Backend::NpuNnapi => caps.has_npu,
            Backend::GpuOpenCl | Backend::GpuOpenGl => caps.has_gpu,
            Backend::Cpu => true,
        }
    }

    /// All backends this device supports, in declaration order
    pub fn supported_backends(caps: &DeviceCapabilities) -> Vec<Backend> {
        Backend::ALL
            .iter()
            .copied()
            .filter(|b| b.supported_by(caps))
            .collect()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{DeviceCapabilityProbe, StaticSignals};
    use std::sync::Arc;

    #[test]
    fn cpu_is_always_supported() {
        let probe = DeviceCapabilityProbe::new(Arc::new(StaticSignals::budget()));
        let caps = probe.probe();
        assert!(Backend::Cpu.supported_by(&caps));
        assert!(Backend::supported_backends(&caps).contains(&Backend::Cpu));
    }

    #[test]
    fn accelerator_support_follows_hardware_flags() {
        let probe = DeviceCapabilityProbe::new(Arc::new(StaticSignals::budget()));
        let caps = probe.probe();
        // Budget fixture has a GPU but no NPU
        assert!(!Backend::NpuQnn.supported_by(&caps));
        assert!(Backend::GpuOpenCl.supported_by(&caps));
    }

    #[test]
    fn classification_helpers_partition_the_set() {
        for b in Backend::ALL {
            let kinds = [b.is_npu(), b.is_gpu(), b.is_cpu()];
            assert_eq!(kinds.iter().filter(|k| **k).count(), 1);
        }
    }
}
