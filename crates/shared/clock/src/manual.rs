use crate::Clock;
use chrono::{DateTime, Duration, Utc};
use keel_core::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// Fixed clock that only advances when explicitly moved
///
/// Stored as nanoseconds since the epoch so reads never block and the clock
/// can be shared behind an `Arc` between the engine and the test driving it.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: AtomicI64::new(to_nanos(start)),
        }
    }

    /// Advance the clock by `duration`
    pub fn advance(&self, duration: Duration) {
        let delta = duration.num_nanoseconds().unwrap_or(i64::MAX);
        self.nanos.fetch_add(delta, Ordering::SeqCst);
    }

    /// Jump to an explicit time
    pub fn set(&self, time: Timestamp) {
        self.nanos.store(to_nanos(time), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        DateTime::from_timestamp_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn name(&self) -> &str {
        "ManualClock"
    }
}

fn to_nanos(time: Timestamp) -> i64 {
    time.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_until_advanced() {
        let start = Utc::now();
        let clock = ManualClock::new(start);

        let time1 = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(clock.now(), time1);

        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now() - time1, Duration::seconds(5));
    }

    #[test]
    fn test_set_time() {
        let clock = ManualClock::default();
        let target = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
