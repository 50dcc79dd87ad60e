//! SN-GCJA5 Register Map and Frame Decoding
//!
//! The sensor exposes one 26-byte region starting at register 0x00:
//!
//! | Bytes   | Content                                    |
//! |---------|--------------------------------------------|
//! | 0 - 11  | mass density, 3 x u32 LE, ug/m3 x 1000     |
//! | 12 - 25 | particle count, 7 x u16 LE (18-19 unused)  |

use crate::error::SensorError;
use serde::{Deserialize, Serialize};

/// 7-bit I2C address of the sensor
pub const DEVICE_ADDRESS: u16 = 0x33;

/// First register of the measurement region
pub const BASE_REGISTER: u8 = 0x00;

/// Total length of one measurement read
pub const FRAME_LEN: usize = 26;

/// Length of the mass density block (bytes 0-11)
pub const MASS_DENSITY_LEN: usize = 12;

/// Length of the particle count block (bytes 12-25), including padding
pub const PARTICLE_COUNT_LEN: usize = 14;

/// Raw mass density values are reported in ug/m3 x 1000
const MASS_DENSITY_SCALE: f64 = 1000.0;

/// View `bytes` as a fixed-size block, or report its actual length
fn fixed<'a, const N: usize>(block: &'static str, bytes: &'a [u8]) -> Result<&'a [u8; N], SensorError> {
    bytes.try_into().map_err(|_| SensorError::MalformedFrame {
        block,
        expected: N,
        actual: bytes.len(),
    })
}

fn mass_density(word: [u8; 4]) -> f64 {
    f64::from(u32::from_le_bytes(word)) / MASS_DENSITY_SCALE
}

fn particle_count(word: [u8; 2]) -> f64 {
    f64::from(u16::from_le_bytes(word))
}

/// One complete 26-byte read of the measurement region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    /// Bytes 0-11
    pub fn mass_density_block(&self) -> &[u8] {
        &self.0[..MASS_DENSITY_LEN]
    }

    /// Bytes 12-25
    pub fn particle_count_block(&self) -> &[u8] {
        &self.0[MASS_DENSITY_LEN..]
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = SensorError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(*fixed::<FRAME_LEN>("frame", bytes)?))
    }
}

impl From<[u8; FRAME_LEN]> for RawFrame {
    fn from(raw: [u8; FRAME_LEN]) -> Self {
        Self(raw)
    }
}

/// Mass density per particle size bucket (ug/m3)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MassDensityReading {
    #[serde(rename = "pm1.0")]
    pub pm1_0: f64,
    #[serde(rename = "pm2.5")]
    pub pm2_5: f64,
    #[serde(rename = "pm10")]
    pub pm10: f64,
}

impl MassDensityReading {
    /// Decode a 12-byte mass density block
    pub fn decode(block: &[u8]) -> Result<Self, SensorError> {
        let [a0, a1, a2, a3, b0, b1, b2, b3, c0, c1, c2, c3] =
            *fixed::<MASS_DENSITY_LEN>("mass density", block)?;

        Ok(Self {
            pm1_0: mass_density([a0, a1, a2, a3]),
            pm2_5: mass_density([b0, b1, b2, b3]),
            pm10: mass_density([c0, c1, c2, c3]),
        })
    }

    /// Values in register order with their conventional names
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [("pm1.0", self.pm1_0), ("pm2.5", self.pm2_5), ("pm10", self.pm10)].into_iter()
    }
}

/// Particle count per size bucket (dimensionless)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParticleCountReading {
    #[serde(rename = "pm0.5")]
    pub pm0_5: f64,
    #[serde(rename = "pm1.0")]
    pub pm1_0: f64,
    #[serde(rename = "pm2.5")]
    pub pm2_5: f64,
    #[serde(rename = "pm5.0")]
    pub pm5_0: f64,
    #[serde(rename = "pm7.5")]
    pub pm7_5: f64,
    #[serde(rename = "pm10")]
    pub pm10: f64,
}

impl ParticleCountReading {
    /// Decode a 14-byte particle count block, dropping the unused slot
    pub fn decode(block: &[u8]) -> Result<Self, SensorError> {
        // Bytes 18-19 of the frame are marked N/A in the register map
        let [a0, a1, b0, b1, c0, c1, _, _, d0, d1, e0, e1, f0, f1] =
            *fixed::<PARTICLE_COUNT_LEN>("particle count", block)?;

        Ok(Self {
            pm0_5: particle_count([a0, a1]),
            pm1_0: particle_count([b0, b1]),
            pm2_5: particle_count([c0, c1]),
            pm5_0: particle_count([d0, d1]),
            pm7_5: particle_count([e0, e1]),
            pm10: particle_count([f0, f1]),
        })
    }

    /// Values in register order with their conventional names
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("pm0.5", self.pm0_5),
            ("pm1.0", self.pm1_0),
            ("pm2.5", self.pm2_5),
            ("pm5.0", self.pm5_0),
            ("pm7.5", self.pm7_5),
            ("pm10", self.pm10),
        ]
        .into_iter()
    }
}

/// Engineering unit attached to a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "ug/m3")]
    MicrogramsPerCubicMeter,
    #[serde(rename = "none")]
    Dimensionless,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::MicrogramsPerCubicMeter => "ug/m3",
            Unit::Dimensionless => "none",
        }
    }
}

/// A decoded, timestamped sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub mass_density: MassDensityReading,
    pub particle_count: ParticleCountReading,
    pub mass_density_unit: Unit,
    pub particle_count_unit: Unit,
    /// Seconds since the Unix epoch at decode time
    pub timestamp: i64,
}

impl Measurement {
    /// Decode both register blocks of a frame
    pub fn decode(frame: &RawFrame, timestamp: i64) -> Result<Self, SensorError> {
        Ok(Self {
            mass_density: MassDensityReading::decode(frame.mass_density_block())?,
            particle_count: ParticleCountReading::decode(frame.particle_count_block())?,
            mass_density_unit: Unit::MicrogramsPerCubicMeter,
            particle_count_unit: Unit::Dimensionless,
            timestamp,
        })
    }
}
