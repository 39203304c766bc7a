// src/config/mod.rs
//! Simulator configuration

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};

/// Complete simulator configuration.
///
/// Every field carries a default so partial TOML files are accepted.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulatorConfig {
    #[serde(default = "defaults::bus_count")]
    pub bus_count: usize,

    #[serde(default = "defaults::max_devices_per_bus")]
    pub max_devices_per_bus: usize,

    #[serde(default = "defaults::fifo_capacity")]
    pub fifo_capacity: usize,

    #[serde(default = "defaults::sampler_interval_ms")]
    pub sampler_interval_ms: u64,

    #[serde(default = "defaults::autostart_sampler")]
    pub autostart_sampler: bool,

    #[serde(default = "defaults::global_latency_us")]
    pub global_latency_us: u64,

    #[serde(default = "defaults::default_noise_level")]
    pub default_noise_level: f64,

    #[serde(default = "defaults::timeout_delay_ms")]
    pub timeout_delay_ms: u64,

    #[serde(default = "defaults::intermittent_failure_ratio")]
    pub intermittent_failure_ratio: f64,

    #[serde(default)]
    pub debug_logging: bool,

    /// Seed for fault and noise draws; `None` seeds from entropy
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn bus_count() -> usize { bus::DEFAULT_BUS_COUNT }
    pub fn max_devices_per_bus() -> usize { bus::DEFAULT_MAX_DEVICES_PER_BUS }
    pub fn fifo_capacity() -> usize { fifo::DEFAULT_CAPACITY_BYTES }
    pub fn sampler_interval_ms() -> u64 { timing::DEFAULT_SAMPLER_INTERVAL_MS }
    pub fn autostart_sampler() -> bool { true }
    pub fn global_latency_us() -> u64 { timing::DEFAULT_GLOBAL_LATENCY_US }
    pub fn default_noise_level() -> f64 { bus::DEFAULT_NOISE_LEVEL }
    pub fn timeout_delay_ms() -> u64 { timing::DEFAULT_TIMEOUT_DELAY_MS }
    pub fn intermittent_failure_ratio() -> f64 { injection::DEFAULT_INTERMITTENT_FAILURE_RATIO }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bus_count: defaults::bus_count(),
            max_devices_per_bus: defaults::max_devices_per_bus(),
            fifo_capacity: defaults::fifo_capacity(),
            sampler_interval_ms: defaults::sampler_interval_ms(),
            autostart_sampler: defaults::autostart_sampler(),
            global_latency_us: defaults::global_latency_us(),
            default_noise_level: defaults::default_noise_level(),
            timeout_delay_ms: defaults::timeout_delay_ms(),
            intermittent_failure_ratio: defaults::intermittent_failure_ratio(),
            debug_logging: false,
            rng_seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Configuration tuned for unit tests: no latency, no bus noise,
    /// sampler stepped by hand and a fixed seed.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            autostart_sampler: false,
            global_latency_us: 0,
            default_noise_level: 0.0,
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_count == 0 {
            return Err(ConfigError::Invalid {
                field: "bus_count",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.max_devices_per_bus == 0 {
            return Err(ConfigError::Invalid {
                field: "max_devices_per_bus",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.fifo_capacity == 0 || self.fifo_capacity > u16::MAX as usize {
            return Err(ConfigError::Invalid {
                field: "fifo_capacity",
                reason: format!("must be in 1..={}", u16::MAX),
            });
        }

        if self.sampler_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "sampler_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }

        if !(bus::MIN_NOISE_LEVEL..=bus::MAX_NOISE_LEVEL).contains(&self.default_noise_level) {
            return Err(ConfigError::Invalid {
                field: "default_noise_level",
                reason: format!("{} is outside [0, 1]", self.default_noise_level),
            });
        }

        if !(injection::MIN_PROBABILITY..=injection::MAX_PROBABILITY)
            .contains(&self.intermittent_failure_ratio)
        {
            return Err(ConfigError::Invalid {
                field: "intermittent_failure_ratio",
                reason: format!("{} is outside [0, 1]", self.intermittent_failure_ratio),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bus_count, 2);
        assert_eq!(config.max_devices_per_bus, 128);
        assert_eq!(config.fifo_capacity, 1024);
        assert_eq!(config.sampler_interval_ms, 10);
        assert_eq!(config.timeout_delay_ms, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = SimulatorConfig::default();
        config.default_noise_level = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "default_noise_level", .. })
        ));

        let config = SimulatorConfig { bus_count: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = SimulatorConfig { fifo_capacity: 70_000, ..Default::default() };
        assert!(config.validate().is_err());

        let config = SimulatorConfig { intermittent_failure_ratio: -0.1, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deterministic_profile() {
        let config = SimulatorConfig::deterministic(7);
        assert!(!config.autostart_sampler);
        assert_eq!(config.global_latency_us, 0);
        assert_eq!(config.rng_seed, Some(7));
        assert!(config.validate().is_ok());
    }
}
