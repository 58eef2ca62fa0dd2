use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time used to pace sample streams and stamp cache updates.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let ms = self.now().saturating_duration_since(epoch).as_millis();
        ms.min(u128::from(u64::MAX)) as u64
    }
}

/// Real-time clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_since_saturates_for_future_epoch() {
        let clock = MonotonicClock::new();
        let later = clock.now() + Duration::from_secs(60);
        assert_eq!(clock.ms_since(later), 0);
    }

    #[test]
    fn zero_sleep_returns_immediately() {
        let clock = MonotonicClock::new();
        let epoch = clock.now();
        clock.sleep(Duration::ZERO);
        assert!(clock.ms_since(epoch) < 1_000);
    }
}
