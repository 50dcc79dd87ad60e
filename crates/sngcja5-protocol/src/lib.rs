//! SN-GCJA5 Protocol Implementation
//!
//! Register map, frame decoding and bus transports for the Panasonic
//! SN-GCJA5 laser particulate matter sensor. Decoding is pure; all I/O
//! goes through the [`RegisterBus`] trait.

mod bus;
mod error;
mod register;

#[cfg(target_os = "linux")]
mod linux;

pub use bus::{MockBus, RegisterBus};
pub use error::SensorError;
pub use register::{
    MassDensityReading, Measurement, ParticleCountReading, RawFrame, Unit, BASE_REGISTER,
    DEVICE_ADDRESS, FRAME_LEN, MASS_DENSITY_LEN, PARTICLE_COUNT_LEN,
};

#[cfg(target_os = "linux")]
pub use linux::LinuxI2cBus;
