//! Fault reporting for the sampling loop

use sngcja5_protocol::SensorError;
use tracing::{error, warn};

/// Receives faults observed by the sampling loop
pub trait DiagnosticsSink: Send + Sync {
    /// A cycle was skipped; sampling continues
    fn transient_fault(&self, error: &SensorError);

    /// Sampling has stopped for good
    fn fatal_fault(&self, error: &SensorError);
}

/// Forwards faults to `tracing` (the default sink)
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn transient_fault(&self, err: &SensorError) {
        warn!("Skipping sample: {}", err);
    }

    fn fatal_fault(&self, err: &SensorError) {
        error!("Sensor lost, sampling stopped: {}", err);
    }
}

/// Discards all faults
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn transient_fault(&self, _error: &SensorError) {}

    fn fatal_fault(&self, _error: &SensorError) {}
}
