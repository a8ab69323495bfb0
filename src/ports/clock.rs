//! Clock port: Source of "now" for date features.

use chrono::NaiveDateTime;

/// Trait for reading the current local time.
///
/// Feature derivation reads the clock once per request; tests pin it with
/// [`FixedClock`].
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
