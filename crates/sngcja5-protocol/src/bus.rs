//! Register Bus Abstraction
//!
//! The sampling loop only ever needs one operation from the transport: a
//! block read of `len` bytes starting at `register` on the device at
//! `address`. Implementations classify their own failures into
//! [`SensorError::Transport`] (device gone) or [`SensorError::Transient`].

use crate::error::SensorError;
use crate::register::FRAME_LEN;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// A register-addressed bus able to perform block reads
pub trait RegisterBus: Send {
    /// Read `len` bytes starting at `register` from the device at `address`
    fn read_block(&mut self, address: u16, register: u8, len: usize) -> Result<Vec<u8>, SensorError>;

    /// Human readable name of the underlying bus, for log lines
    fn describe(&self) -> String;
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read_block(&mut self, address: u16, register: u8, len: usize) -> Result<Vec<u8>, SensorError> {
        (**self).read_block(address, register, len)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Scripted bus for testing (no hardware required)
///
/// Queued results are returned in order; once the script is exhausted
/// every read returns the idle frame.
pub struct MockBus {
    script: VecDeque<Result<Vec<u8>, SensorError>>,
    idle_frame: Vec<u8>,
    reads: Arc<AtomicUsize>,
}

impl MockBus {
    /// Create a mock bus that keeps returning `idle_frame`
    pub fn new(idle_frame: [u8; FRAME_LEN]) -> Self {
        info!("Creating mock register bus");
        Self {
            script: VecDeque::new(),
            idle_frame: idle_frame.to_vec(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a successful read returning `bytes` verbatim
    pub fn then_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.script.push_back(Ok(bytes));
        self
    }

    /// Queue a failed read
    pub fn then_error(mut self, err: SensorError) -> Self {
        self.script.push_back(Err(err));
        self
    }

    /// Shared counter of reads performed, usable after the bus has been moved
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }
}

impl RegisterBus for MockBus {
    fn read_block(&mut self, address: u16, register: u8, len: usize) -> Result<Vec<u8>, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        debug!("Mock read of {} bytes at {:02X}:{:02X}", len, address, register);

        match self.script.pop_front() {
            Some(result) => result,
            None => Ok(self.idle_frame.clone()),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
