//! Lock-free integer counters.
//!
//! Counters are meant as inputs to collectors: the host application updates
//! them from any thread, and a collector reads [`value`](Uint::value) when a
//! gather pass runs.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared interface of the min and max tracking counters.
pub trait UintMinMax: Send + Sync {
    /// Offer a new observation.
    fn set(&self, value: u64);

    /// Current value.
    fn value(&self) -> u64;
}

/// Plain counter of non-negative integers.
#[derive(Debug, Default)]
pub struct Uint {
    value: AtomicU64,
}

impl Uint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement by one, stopping at zero.
    pub fn dec(&self) {
        // Err means the counter already was zero.
        let _ = self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::SeqCst);
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::SeqCst);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// Counter keeping the largest value ever set.
#[derive(Debug, Default)]
pub struct UintMax {
    value: AtomicU64,
}

impl UintMax {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UintMinMax for UintMax {
    fn set(&self, value: u64) {
        self.value.fetch_max(value, Ordering::SeqCst);
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// Counter keeping the smallest value ever set.
///
/// Starts at `u64::MAX`, meaning nothing was observed yet.
#[derive(Debug)]
pub struct UintMin {
    value: AtomicU64,
}

impl Default for UintMin {
    fn default() -> Self {
        Self {
            value: AtomicU64::new(u64::MAX),
        }
    }
}

impl UintMin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UintMinMax for UintMin {
    fn set(&self, value: u64) {
        self.value.fetch_min(value, Ordering::SeqCst);
    }

    fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}
