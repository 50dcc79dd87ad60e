//! Linux I2C transport backed by `/dev/i2c-N`

use crate::bus::RegisterBus;
use crate::error::SensorError;
use crate::register::DEVICE_ADDRESS;
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest block an SMBus "I2C block read" can return
const SMBUS_BLOCK_MAX: usize = 32;

/// SN-GCJA5 attached to a Linux I2C adapter
pub struct LinuxI2cBus {
    path: PathBuf,
    device: LinuxI2CDevice,
    /// Slave address the file descriptor is currently bound to
    address: u16,
}

impl LinuxI2cBus {
    /// Open `/dev/i2c-<bus_no>`
    pub fn open(bus_no: u32) -> Result<Self, SensorError> {
        Self::open_path(format!("/dev/i2c-{}", bus_no))
    }

    /// Open an explicit I2C device node
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, SensorError> {
        let path = path.as_ref().to_path_buf();
        info!("Opening I2C bus {} for device {:02X}", path.display(), DEVICE_ADDRESS);

        let device = LinuxI2CDevice::new(&path, DEVICE_ADDRESS).map_err(|e| {
            SensorError::BusUnavailable {
                bus: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            path,
            device,
            address: DEVICE_ADDRESS,
        })
    }
}

impl RegisterBus for LinuxI2cBus {
    fn read_block(&mut self, address: u16, register: u8, len: usize) -> Result<Vec<u8>, SensorError> {
        if len > SMBUS_BLOCK_MAX {
            return Err(SensorError::Transient(format!(
                "block read of {} bytes exceeds SMBus limit of {}",
                len, SMBUS_BLOCK_MAX
            )));
        }
        if address != self.address {
            self.device
                .set_slave_address(address)
                .map_err(|e| SensorError::from(io::Error::from(e)))?;
            self.address = address;
        }

        debug!("Reading {} bytes from register {:02X}", len, register);
        self.device
            .smbus_read_i2c_block_data(register, len as u8)
            .map_err(|e| SensorError::from(io::Error::from(e)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
