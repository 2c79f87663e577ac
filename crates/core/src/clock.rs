//! Time source abstraction.
//!
//! Anything that ages state (caches, token windows) takes a `Clock` instead of
//! calling `Utc::now()` directly, so tests can move time deterministically.

use std::sync::{LazyLock, Mutex};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock and monotonic time.
///
/// Wall time is for display and stamps; it may step in either direction.
/// Age checks must use [`Clock::monotonic`], which never goes backwards.
pub trait Clock: Send + Sync + core::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;

    /// Elapsed time since a fixed, arbitrary origin. Never decreases.
    fn monotonic(&self) -> std::time::Duration;
}

static ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> std::time::Duration {
        ORIGIN.elapsed()
    }
}

#[derive(Debug)]
struct ManualTime {
    wall: DateTime<Utc>,
    elapsed: std::time::Duration,
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    time: Mutex<ManualTime>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(ManualTime {
                wall: start,
                elapsed: std::time::Duration::ZERO,
            }),
        }
    }

    /// Let `by` pass. A negative `by` models a wall-clock step backwards:
    /// wall time moves, monotonic time does not.
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        time.wall += by;
        if let Ok(forward) = by.to_std() {
            time.elapsed += forward;
        }
    }

    /// Jump the wall clock to `to`; monotonic time is unaffected.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut time = self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        time.wall = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).wall
    }

    fn monotonic(&self) -> std::time::Duration {
        self.time.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_told() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(61));
        assert_eq!(clock.now(), start + Duration::seconds(61));
        assert_eq!(clock.monotonic(), std::time::Duration::from_secs(61));

        clock.set(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.monotonic(), std::time::Duration::from_secs(61));
    }

    #[test]
    fn backwards_wall_step_keeps_monotonic_time() {
        let start = Utc::now();
        let clock = ManualClock::new(start);

        clock.advance(Duration::seconds(-3600));
        assert_eq!(clock.now(), start - Duration::seconds(3600));
        assert_eq!(clock.monotonic(), std::time::Duration::ZERO);

        clock.advance(Duration::seconds(30));
        assert_eq!(clock.monotonic(), std::time::Duration::from_secs(30));
    }

    #[test]
    fn system_monotonic_never_decreases() {
        let clock = SystemClock;
        let a = clock.monotonic();
        let b = clock.monotonic();
        assert!(b >= a);
    }
}
