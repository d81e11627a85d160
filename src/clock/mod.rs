//! Wall-clock source in the configured clinic timezone

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

#[cfg(test)]
use mockall::automock;

/// Provides the current instant to all time-based logic.
///
/// Everything that reads the clock goes through this trait so tests can
/// inject a controllable instant.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    /// Returns the current instant in the clinic timezone
    fn now(&self) -> DateTime<Tz>;

    /// Returns the clinic timezone
    fn timezone(&self) -> Tz;
}

/// Clock backed by the system time
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    /// Creates a system clock for the given timezone
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }
}
