//! Monitor configuration
//!
//! Read from an optional TOML file, then overridden by `SNGCJA5_*`
//! environment variables (nested keys use `__`, e.g.
//! `SNGCJA5_SAMPLER__SETTLE_INTERVAL_MS`).

use config::{Config, ConfigError, Environment, File};
use sampler::SamplerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "pm-monitor.toml";

/// Configuration for the `pm-monitor` binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// I2C bus number (`/dev/i2c-<bus>`)
    pub bus: u32,

    /// How often the monitor prints a measurement (seconds)
    pub poll_interval_secs: u64,

    /// Background sampler settings
    pub sampler: SamplerConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bus: 1,
            poll_interval_secs: 5,
            sampler: SamplerConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from `path` (or [`DEFAULT_CONFIG_PATH`]) and the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(false))
            .add_source(
                Environment::with_prefix("SNGCJA5")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
