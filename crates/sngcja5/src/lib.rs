//! SN-GCJA5 Particulate Matter Sensor Driver
//!
//! Opening the driver starts a background sampler that reads the sensor
//! once per second. [`Sngcja5::get_measurement`] hands out buffered
//! measurements without ever touching the bus.
//!
//! ```no_run
//! # fn main() -> Result<(), sngcja5::SensorError> {
//! let sensor = sngcja5::Sngcja5::new(1)?;
//! if let Some(measurement) = sensor.get_measurement() {
//!     println!("PM2.5: {} ug/m3", measurement.mass_density.pm2_5);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;

use sampler::{MeasurementBuffer, Sampler, SamplerHandle};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub use sampler::{DiagnosticsSink, NoopSink, SamplerConfig, SamplerStats, TracingSink};
pub use sngcja5_protocol::{
    MassDensityReading, Measurement, MockBus, ParticleCountReading, RegisterBus, SensorError, Unit,
};

#[cfg(target_os = "linux")]
pub use sngcja5_protocol::LinuxI2cBus;

/// SN-GCJA5 driver handle
pub struct Sngcja5 {
    buffer: Arc<MeasurementBuffer>,
    sampler: SamplerHandle,
}

impl Sngcja5 {
    /// Open `/dev/i2c-<bus_no>` with the default sampler configuration
    #[cfg(target_os = "linux")]
    pub fn new(bus_no: u32) -> Result<Self, SensorError> {
        Self::open(bus_no, SamplerConfig::default())
    }

    /// Open `/dev/i2c-<bus_no>` and start sampling
    #[cfg(target_os = "linux")]
    pub fn open(bus_no: u32, config: SamplerConfig) -> Result<Self, SensorError> {
        let bus = LinuxI2cBus::open(bus_no)?;
        Ok(Self::with_bus(bus, config))
    }

    /// Start sampling on an already opened bus
    pub fn with_bus<B: RegisterBus + 'static>(bus: B, config: SamplerConfig) -> Self {
        Self::with_diagnostics(bus, config, Arc::new(TracingSink))
    }

    /// Start sampling with a custom diagnostics sink
    pub fn with_diagnostics<B: RegisterBus + 'static>(
        bus: B,
        config: SamplerConfig,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        info!(
            "Creating SN-GCJA5 driver on {} (buffer {}, settle {:?})",
            bus.describe(),
            config.buffer_capacity,
            config.settle_interval()
        );

        let sampler = Sampler::new(bus, config).with_diagnostics(diagnostics);
        let buffer = sampler.buffer();

        Self {
            buffer,
            sampler: sampler.spawn(),
        }
    }

    /// Take the most recent buffered measurement, if any
    ///
    /// Never blocks on the bus. Each measurement is handed out once.
    pub fn get_measurement(&self) -> Option<Measurement> {
        self.buffer.pop_latest()
    }

    /// Check if the background sampler is still running
    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    /// Number of measurements waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> &SamplerStats {
        self.sampler.stats()
    }

    /// Stop sampling and wait for the background thread to exit
    pub fn shutdown(self) {
        info!("Shutting down SN-GCJA5 driver");
        self.sampler.shutdown();
    }
}

/// Initialize logging
pub fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
