//! Compute device detection.

use crate::models::{Device, DevicePreference};

/// Whether an NVIDIA driver is present on this machine.
pub fn cuda_available() -> bool {
    which::which("nvidia-smi").is_ok()
}

/// Pick the device for ML tools from the configured preference.
pub fn resolve_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => Device::Cuda,
        DevicePreference::Auto => {
            if cuda_available() {
                Device::Cuda
            } else {
                Device::Cpu
            }
        }
    }
}
