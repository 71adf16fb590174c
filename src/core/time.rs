//! Clock abstraction.
//!
//! Every expiry computed by the guard manager, and every TTL evaluated by
//! the in-memory store, reads time through a [`Clock`]. Production code uses
//! [`SystemClock`]; tests drive a [`ManualClock`] so that expiry becomes a
//! deterministic function of the test script.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current wall-clock instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Stored as milliseconds since the Unix epoch, so it can be shared across
/// tasks behind an `Arc` without locking.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now_ms: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Create a clock frozen at the given Unix millisecond timestamp.
    pub fn at_millis(ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(ms),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as i64, Ordering::AcqRel);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        self.now_ms.store(to.timestamp_millis(), Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.now_ms.load(Ordering::Acquire);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Instant that lies `lifetime` after `now`.
///
/// Saturates at the maximum representable instant instead of overflowing.
pub fn expiry_after(now: DateTime<Utc>, lifetime: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_frozen_until_advanced() {
        let clock = ManualClock::at_millis(1_700_000_000_000);
        let first = clock.now();
        assert_eq!(first, clock.now());

        clock.advance(Duration::from_secs(5));
        assert_eq!((clock.now() - first).num_seconds(), 5);
    }

    #[test]
    fn manual_clock_set_jumps() {
        let clock = ManualClock::at_millis(0);
        let target = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn expiry_after_adds_lifetime() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let expiry = expiry_after(now, Duration::from_secs(60));
        assert_eq!(expiry, Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap());
    }

    #[test]
    fn expiry_after_saturates() {
        let expiry = expiry_after(DateTime::<Utc>::MAX_UTC, Duration::from_secs(1));
        assert_eq!(expiry, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
