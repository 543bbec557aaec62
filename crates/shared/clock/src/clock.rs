use chrono::Utc;
use keel_core::Timestamp;

/// Port for time abstraction
///
/// The quoting loop, the requote gate and equity tracking read time only
/// through this trait, so tests can swap in a [`ManualClock`](crate::ManualClock).
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Timestamp;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "Clock"
    }
}

/// Wall clock for live runs
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}
