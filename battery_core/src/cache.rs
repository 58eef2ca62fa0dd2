//! Single-slot cache of the last decoded sample pair.
//!
//! Written only by the stream callback, read only when a fresh read reports
//! `Busy`. Each field is independently atomic: a reader never sees a torn
//! value, but may pair a new current with an older voltage.
use crate::decoder::RawSamplePair;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct FallbackCache {
    current: AtomicI32,
    voltage: AtomicI32,
    samples: AtomicU64,
    last_update_ms: AtomicU64,
    epoch: Instant,
}

/// Point-in-time copy of the cache, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub current: i32,
    pub voltage: i32,
    pub samples: u64,
    pub last_update_ms: u64,
}

impl Default for FallbackCache {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl FallbackCache {
    pub fn new(epoch: Instant) -> Self {
        Self {
            current: AtomicI32::new(0),
            voltage: AtomicI32::new(0),
            samples: AtomicU64::new(0),
            last_update_ms: AtomicU64::new(0),
            epoch,
        }
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Publish a decoded pair. `at_ms` is measured from [`Self::epoch`].
    pub fn store(&self, pair: RawSamplePair, at_ms: u64) {
        self.current.store(pair.current, Ordering::Relaxed);
        self.voltage.store(pair.voltage, Ordering::Relaxed);
        self.last_update_ms.store(at_ms, Ordering::Relaxed);
        // Release pairs with the Acquire in `samples()` so a reader that sees
        // the new count also sees the values stored above.
        self.samples.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub fn current(&self) -> i32 {
        self.current.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn voltage(&self) -> i32 {
        self.voltage.load(Ordering::Relaxed)
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Acquire)
    }

    pub fn last_update_ms(&self) -> u64 {
        self.last_update_ms.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let samples = self.samples();
        CacheSnapshot {
            current: self.current(),
            voltage: self.voltage(),
            samples,
            last_update_ms: self.last_update_ms(),
        }
    }
}
