//! Time source behind queue timestamps and audit entries.

use chrono::{DateTime, Utc};

/// Source of the timestamps stamped onto queue entries at enqueue and
/// audit entries at cleanup. A trait so tests can pin time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock reading the system time in UTC.
#[derive(Debug, Clone, Copy)]
pub struct UtcClock;

impl Clock for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
