//! Bounded Ring Buffer
//!
//! Provides a fixed-capacity, internally synchronized buffer for the most
//! recent sensor measurements. One producer pushes, any number of consumers
//! pop the newest entry.

mod buffer;

pub use buffer::{RingBuffer, DEFAULT_CAPACITY};
