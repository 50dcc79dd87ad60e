//! SN-GCJA5 Sampling Loop
//!
//! Polls the sensor once per settle interval on a dedicated thread, decodes
//! each frame and keeps the most recent measurements in a bounded buffer.
//! Vanished devices stop the loop; every other fault skips one cycle.

mod config;
mod diagnostics;
mod sampler;

pub use config::SamplerConfig;
pub use diagnostics::{DiagnosticsSink, NoopSink, TracingSink};
pub use sampler::{CycleOutcome, MeasurementBuffer, Sampler, SamplerHandle, SamplerStats};
