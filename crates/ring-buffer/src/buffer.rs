//! Ring Buffer Implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Default buffer capacity (20 samples = 20 s at the sensor's 1 Hz refresh)
pub const DEFAULT_CAPACITY: usize = 20;

/// Bounded buffer that evicts its oldest entry on overflow
///
/// Eviction depends only on insertion order; popping never reorders what
/// remains. The lock is held only for the queue operation itself.
pub struct RingBuffer<T> {
    /// Entries, oldest at the front
    storage: Mutex<VecDeque<T>>,
    /// Capacity of the buffer
    capacity: usize,
    /// Total entries written (for statistics)
    total_written: AtomicUsize,
    /// Entries dropped to make room
    evicted: AtomicUsize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            total_written: AtomicUsize::new(0),
            evicted: AtomicUsize::new(0),
        }
    }

    /// Create a buffer with default capacity (20 entries)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    // A panicking holder cannot leave the deque half-updated, so a poisoned
    // lock is still safe to use.
    fn storage(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push an entry (overwrites oldest if full)
    pub fn push(&self, item: T) {
        let dropped = {
            let mut storage = self.storage();
            let dropped = if storage.len() == self.capacity {
                storage.pop_front()
            } else {
                None
            };
            storage.push_back(item);
            dropped
        };

        self.total_written.fetch_add(1, Ordering::Relaxed);
        if dropped.is_some() {
            self.evicted.fetch_add(1, Ordering::Relaxed);
            trace!("Ring buffer full, evicted oldest entry");
        }
    }

    /// Remove and return the most recently pushed entry
    pub fn pop_latest(&self) -> Option<T> {
        self.storage().pop_back()
    }

    /// Get the number of entries currently in the buffer
    pub fn len(&self) -> usize {
        self.storage().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get total entries written (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Get total entries evicted on overflow
    pub fn evicted(&self) -> usize {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Clear the buffer
    pub fn clear(&self) {
        self.storage().clear();
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.storage().iter().cloned().collect()
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
