//! Wall-clock abstraction.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current unix time in seconds.
pub trait TimeSource: Send + Sync {
    /// Seconds since the unix epoch.
    fn now(&self) -> i64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Manually driven clock for tests.
#[derive(Debug, Default)]
pub struct FixedTimeSource(AtomicI64);

impl FixedTimeSource {
    /// Clock frozen at `now`.
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }

    /// Move the clock.
    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    /// Advance the clock by `secs`.
    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_time_source() {
        let clock = FixedTimeSource::new(100);
        clock.advance(5);
        assert_eq!(clock.now(), 105);
        clock.set(7);
        assert_eq!(clock.now(), 7);
    }

    #[test]
    fn test_system_time_is_after_2020() {
        assert!(SystemTimeSource.now() > 1_577_836_800);
    }
}
