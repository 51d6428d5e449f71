//! Device acquisition options.

use wgpu::{Backends, PowerPreference};

/// Options used when requesting an adapter and device.
///
/// The defaults pick a high performance adapter on any backend, which is
/// what a headless compute program wants.  [`GpuConfig::from_env`] layers
/// wgpu's standard `WGPU_BACKEND` and `WGPU_POWER_PREF` variables on top.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    /// Backends the instance is allowed to enumerate.
    pub backends: Backends,
    /// Adapter preference passed to `request_adapter`.
    pub power_preference: PowerPreference,
    /// Debug label attached to the logical device.
    pub label: String,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            backends: Backends::all(),
            power_preference: PowerPreference::HighPerformance,
            label: "gpu_matmul_device".to_string(),
        }
    }
}

impl GpuConfig {
    /// Default configuration overridden by `WGPU_BACKEND` and
    /// `WGPU_POWER_PREF` when those are set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(backends) = Backends::from_env() {
            config.backends = backends;
        }
        if let Some(power_preference) = PowerPreference::from_env() {
            config.power_preference = power_preference;
        }
        config
    }

    pub fn with_power_preference(mut self, power_preference: PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }

    pub fn with_backends(mut self, backends: Backends) -> Self {
        self.backends = backends;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_all_backends_high_performance() {
        let config = GpuConfig::default();
        assert_eq!(config.backends, Backends::all());
        assert_eq!(config.power_preference, PowerPreference::HighPerformance);
    }

    #[test]
    fn builders_override_fields() {
        let config = GpuConfig::default()
            .with_power_preference(PowerPreference::LowPower)
            .with_backends(Backends::VULKAN);
        assert_eq!(config.power_preference, PowerPreference::LowPower);
        assert_eq!(config.backends, Backends::VULKAN);
    }
}
