// Atomic parameters - Lock-free sharing between the scheduler and the audio thread
// Stores floats as their bit patterns in atomic integers

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe f64 using atomic operations
/// Converts f64 to u64 bits for atomic storage
#[derive(Clone, Debug)]
pub struct AtomicF64 {
    inner: Arc<AtomicU64>,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }

    pub fn set(&self, value: f64) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_value() {
        let value = AtomicF64::new(1.5);
        let shared = value.clone();
        shared.set(-2.25);
        assert_eq!(value.get(), -2.25);
    }
}
