// src/config/loader.rs
//! TOML configuration loading

use crate::config::SimulatorConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Loads [`SimulatorConfig`] from TOML, falling back to defaults for
/// anything the source leaves out.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with no search paths
    pub fn new() -> Self {
        Self::default()
    }

    /// Create loader with custom search paths; the first existing file wins
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { config_paths: paths }
    }

    /// Load from the first existing search path, or defaults if none exists
    pub fn load(&self) -> Result<SimulatorConfig, ConfigError> {
        match self.config_paths.iter().find(|path| path.exists()) {
            Some(path) => Self::load_file(path),
            None => {
                tracing::debug!("no simulator config file found, using defaults");
                Ok(SimulatorConfig::default())
            }
        }
    }

    /// Load and validate a single TOML file
    pub fn load_file(path: &Path) -> Result<SimulatorConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::load_str(&content)?;
        tracing::info!(path = %path.display(), "loaded simulator config");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn load_str(content: &str) -> Result<SimulatorConfig, ConfigError> {
        let config: SimulatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ConfigLoader::load_str("bus_count = 4\nglobal_latency_us = 0\n").unwrap();
        assert_eq!(config.bus_count, 4);
        assert_eq!(config.global_latency_us, 0);
        assert_eq!(config.fifo_capacity, 1024);
        assert!(config.autostart_sampler);
    }

    #[test]
    fn test_invalid_toml_value_rejected() {
        let result = ConfigLoader::load_str("default_noise_level = 2.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let result = ConfigLoader::load_str("bus_count = \"two\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rng_seed = 42\nsampler_interval_ms = 5").unwrap();

        let loader = ConfigLoader::with_paths(vec![
            PathBuf::from("/nonexistent/i2c-sim.toml"),
            file.path().to_path_buf(),
        ]);
        let config = loader.load().unwrap();
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.sampler_interval_ms, 5);
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/i2c-sim.toml")]);
        assert_eq!(loader.load().unwrap(), SimulatorConfig::default());

        let result = ConfigLoader::load_file(Path::new("/nonexistent/i2c-sim.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
