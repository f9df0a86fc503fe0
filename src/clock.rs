//! Clock

use jiff::{Timestamp, civil::Date, tz::TimeZone};
use mockall::automock;

/// Supplies the current time.
#[automock]
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(Timestamp);

impl FixedClock {
    /// Creates a clock that always returns `now`.
    pub const fn new(now: Timestamp) -> Self {
        Self(now)
    }

    /// Moves the clock to another instant.
    pub fn set(&mut self, now: Timestamp) {
        self.0 = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Returns the UTC calendar date of a timestamp.
pub fn utc_date(timestamp: Timestamp) -> Date {
    timestamp.to_zoned(TimeZone::UTC).date()
}
