//! Time sources for the profiler
//!
//! The profiler never reads the system clock directly. Every timestamp goes
//! through a [`Clock`] so tests can substitute a [`FakeClock`] and get
//! deterministic durations and report headers.
//!
//! # Example
//!
//! ```
//! use crawl_profiler::clock::{Clock, FakeClock};
//! use std::time::Duration;
//!
//! let clock = FakeClock::at_epoch();
//! let before = clock.now();
//! clock.advance(Duration::from_millis(250));
//! assert_eq!((clock.now() - before).num_milliseconds(), 250);
//! ```

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// A source of "current timestamp" readings
///
/// Implementations must be shareable across threads since one clock is used
/// by every wrapper of a session.
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests
///
/// Time only moves when [`FakeClock::advance`] or [`FakeClock::set`] is
/// called, so a wrapped target can simulate how long it "took".
#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock frozen at the Unix epoch
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }

    /// Jump to an arbitrary instant, including backwards
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Elapsed time between two clock readings
///
/// Returns `None` when `end` precedes `start`; the caller decides how to
/// report the regression.
pub fn elapsed_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Duration> {
    (end - start).to_std().ok()
}
