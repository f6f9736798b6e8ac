//! The time reference shared by every component of a run.

use chrono::{DateTime, Utc};

/// Wall-clock time captured once at process start.
///
/// Time-window trimming, year inference and archive naming all read this value
/// so that a single run is internally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    now: DateTime<Utc>,
}

impl RunClock {
    /// Capture the current time.
    pub fn capture() -> Self {
        Self { now: Utc::now() }
    }

    /// Use a fixed time.
    pub fn fixed(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// The captured instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_is_stable() {
        let at = Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap();
        let clock = RunClock::fixed(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), clock.now());
    }
}
