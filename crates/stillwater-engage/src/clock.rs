//! Injectable clock.
//!
//! Every "what day is it" decision in the engine goes through a `Clock`
//! so day-boundary behavior is testable without waiting for wall-clock
//! time. Production code uses [`SystemClock`]; tests use [`SimClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A simulated clock for deterministic tests.
///
/// Time only moves forward. Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct SimClock {
    current_ms: Arc<AtomicI64>,
}

impl SimClock {
    /// Create a clock starting at the given instant.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            current_ms: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Advance time by the given duration.
    ///
    /// # Panics
    /// Panics if the duration is negative.
    pub fn advance(&self, duration: chrono::Duration) {
        let ms = duration.num_milliseconds();
        assert!(ms >= 0, "cannot go back in time");
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set time to an absolute instant.
    ///
    /// # Panics
    /// Panics if the new instant is earlier than the current one.
    pub fn set(&self, time: DateTime<Utc>) {
        let ms = time.timestamp_millis();
        let current = self.current_ms.load(Ordering::SeqCst);
        assert!(ms >= current, "cannot set time backwards");
        self.current_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.current_ms.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms)
            .unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().to_utc()
    }

    #[test]
    fn test_sim_clock_starts_at_given_instant() {
        let start = instant("2024-01-10T08:00:00Z");
        let clock = SimClock::at(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_sim_clock_advance() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        clock.advance(Duration::hours(30));
        assert_eq!(clock.now(), instant("2024-01-11T14:00:00Z"));
    }

    #[test]
    fn test_clones_share_time() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let other = clock.clone();
        clock.advance(Duration::days(1));
        assert_eq!(other.now(), instant("2024-01-11T08:00:00Z"));
    }

    #[test]
    #[should_panic(expected = "cannot set time backwards")]
    fn test_set_backwards_panics() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        clock.set(instant("2024-01-09T08:00:00Z"));
    }
}
