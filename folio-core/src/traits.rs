//! Common traits for Folio.
//!
//! Storage and time are injected rather than read from globals so tests can
//! swap in an in-memory store and a hand-driven clock.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key/value string storage with the shape of a browser's local storage.
///
/// Implementations might use:
/// - An in-memory map (tests, ephemeral sessions)
/// - A JSON file on disk (the CLI)
///
/// Access is synchronous. Callers never hold state across an `.await`
/// between a read and the write that depends on it.
pub trait Storage: Send + Sync {
    /// Returns the stored string for `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Lists every stored key.
    fn keys(&self) -> Result<Vec<String>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of wall-clock time for expiry checks.
///
/// Expiry is measured against wall-clock time; a system clock change shifts
/// every entry's age accordingly.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        let by = ChronoDuration::from_std(by).unwrap_or_else(|_| ChronoDuration::weeks(52 * 100));
        let mut now = self.now.lock();
        *now = now.checked_add_signed(by).unwrap_or(*now);
    }

    /// Jumps the clock to an arbitrary instant, backwards included.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_manual_clock_advance() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(40 * 60));
        assert_eq!((clock.now() - start).num_minutes(), 40);
    }

    #[test]
    fn test_manual_clock_set_backwards() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.set(start - ChronoDuration::hours(1));
        assert!(clock.now() < start);
    }
}
