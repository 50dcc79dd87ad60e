//! SN-GCJA5 Error Types

use thiserror::Error;

/// Errors that can occur while talking to or decoding the sensor
#[derive(Debug, Error)]
pub enum SensorError {
    /// The I2C bus could not be opened
    #[error("I2C bus {bus} unavailable: {reason}")]
    BusUnavailable { bus: String, reason: String },

    /// The device or adapter disappeared mid-operation
    #[error("Transport error: {0}")]
    Transport(String),

    /// A single bus transaction failed but the device is still reachable
    #[error("Transient bus fault: {0}")]
    Transient(String),

    /// A register block had the wrong length
    #[error("Malformed {block} block: expected {expected} bytes, got {actual}")]
    MalformedFrame {
        block: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SensorError {
    /// Whether the sampling loop must give up after this error.
    ///
    /// Only a vanished device is fatal; it cannot recover without someone
    /// reattaching it. Everything else skips one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SensorError::Transport(_))
    }
}

#[cfg(target_os = "linux")]
const EREMOTEIO: i32 = libc::EREMOTEIO;

// Only Linux I2C adapters report it; Linux numbering elsewhere
#[cfg(not(target_os = "linux"))]
const EREMOTEIO: i32 = 121;

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        match err.raw_os_error() {
            // A device that stops acknowledging its address reports
            // EREMOTEIO on most adapters and EIO on some
            Some(EREMOTEIO)
            | Some(libc::EIO)
            | Some(libc::ENODEV)
            | Some(libc::ENXIO)
            | Some(libc::ENOENT)
            | Some(libc::EBADF)
            | Some(libc::ESHUTDOWN) => SensorError::Transport(err.to_string()),
            _ => SensorError::Transient(err.to_string()),
        }
    }
}
