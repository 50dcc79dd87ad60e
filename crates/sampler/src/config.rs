//! Sampler configuration

use ring_buffer::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the sampling loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Delay between cycles in milliseconds (default: 1000, the sensor's refresh period)
    pub settle_interval_ms: u64,

    /// Number of measurements kept before the oldest is overwritten
    pub buffer_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            settle_interval_ms: 1000,
            buffer_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SamplerConfig {
    /// Delay between cycles
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }
}
