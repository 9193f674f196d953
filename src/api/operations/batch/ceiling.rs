//! Adaptive batch-size ceiling
//!
//! Starts at the configured maximum and shrinks to 70% (rounded up) on every
//! throttled batch, never below the minimum. It does not grow back for the
//! lifetime of the client.

use crate::api::resilience::BatchConfig;
use std::sync::atomic::{AtomicUsize, Ordering};

/// `ceil(current * 0.7)`, clamped to `min`
pub fn shrunk_size(current: usize, min: usize) -> usize {
    current.saturating_mul(7).div_ceil(10).max(min)
}

/// Current batch ceiling shared by every batch call of one client
#[derive(Debug)]
pub struct BatchCeiling {
    current: AtomicUsize,
    min: usize,
    max: usize,
}

impl BatchCeiling {
    pub fn new(config: &BatchConfig) -> Self {
        let min = config.min_batch_size.max(1);
        let max = config.max_batch_size.max(min);
        Self {
            current: AtomicUsize::new(max),
            min,
            max,
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Shrink after a throttled batch; returns `(from, to)`
    pub fn shrink(&self) -> (usize, usize) {
        let min = self.min;
        let previous = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(shrunk_size(current, min))
            })
            .unwrap_or_else(|current| current);
        (previous, shrunk_size(previous, min))
    }
}
