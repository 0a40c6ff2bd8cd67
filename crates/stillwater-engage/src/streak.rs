//! Consecutive-day activity streaks.
//!
//! One check-in per calendar day extends a user's streak; a missed day
//! resets it. The whole state machine lives in the stored
//! `(streak_count, best_streak, last_active_day)` tuple -- the
//! transition taken by [`StreakTracker::check_in`] is fully determined
//! by the day distance between the stored day and today.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::day::{DayBoundary, DayKey};
use crate::error::Result;
use crate::store::{DualStore, Namespace};

/// Persisted per-user streak row.
///
/// Invariant: `best_streak >= streak_count` after any update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub user_id: String,
    pub streak_count: u32,
    pub best_streak: u32,
    pub last_active_day: Option<DayKey>,
}

impl StreakRecord {
    fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            streak_count: 0,
            best_streak: 0,
            last_active_day: None,
        }
    }
}

/// Which transition a check-in took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    /// First-ever check-in for this user.
    Started,
    /// Already checked in today; nothing changed.
    AlreadyCheckedIn,
    /// Checked in exactly yesterday; streak extended by one.
    Continued,
    /// One or more days were missed; streak restarted at 1.
    Reset { gap_days: i64 },
    /// Stored day is in the future relative to "today" (device clock
    /// skew). Treated as a no-op, never a decrement.
    ClockAnomaly,
}

/// Result of a check-in: the post-transition record and what happened.
#[derive(Debug, Clone)]
pub struct CheckInResult {
    pub record: StreakRecord,
    pub transition: StreakTransition,
}

impl CheckInResult {
    /// Whether this check-in produced a new streak value.
    pub fn streak_changed(&self) -> bool {
        matches!(
            self.transition,
            StreakTransition::Started | StreakTransition::Continued | StreakTransition::Reset { .. }
        )
    }
}

/// Tracks per-user consecutive-day activity.
pub struct StreakTracker {
    store: Arc<DualStore>,
    boundary: DayBoundary,
    clock: Arc<dyn Clock>,
}

impl StreakTracker {
    pub fn new(store: Arc<DualStore>, boundary: DayBoundary, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            boundary,
            clock,
        }
    }

    /// Register the user's activity for today.
    ///
    /// Idempotent within a calendar day: any number of same-day calls
    /// produce exactly one effective increment. Every transition that
    /// changes state is persisted before this returns.
    ///
    /// # Errors
    /// Returns [`crate::EngageError::StorageUnavailable`] when the
    /// prior record cannot be read or the new one cannot be persisted;
    /// the caller should keep showing the last known-good streak.
    pub async fn check_in(&self, user_id: &str) -> Result<CheckInResult> {
        let today = self.boundary.today(self.clock.as_ref());
        let prior = self.load(user_id).await?;

        let (record, transition) = match &prior.last_active_day {
            None => {
                let record = StreakRecord {
                    user_id: user_id.to_string(),
                    streak_count: 1,
                    best_streak: prior.best_streak.max(1),
                    last_active_day: Some(today),
                };
                (record, StreakTransition::Started)
            }
            Some(last_active) => {
                let d = DayBoundary::diff_in_days(last_active, &today)?;
                if d == 0 {
                    return Ok(CheckInResult {
                        record: prior,
                        transition: StreakTransition::AlreadyCheckedIn,
                    });
                }
                if d < 0 {
                    warn!(
                        user_id,
                        last_active = %last_active,
                        today = %today,
                        "stored check-in day is in the future, ignoring"
                    );
                    return Ok(CheckInResult {
                        record: prior,
                        transition: StreakTransition::ClockAnomaly,
                    });
                }
                if d == 1 {
                    let streak_count = prior.streak_count + 1;
                    let record = StreakRecord {
                        user_id: user_id.to_string(),
                        streak_count,
                        best_streak: prior.best_streak.max(streak_count),
                        last_active_day: Some(today),
                    };
                    (record, StreakTransition::Continued)
                } else {
                    let record = StreakRecord {
                        user_id: user_id.to_string(),
                        streak_count: 1,
                        best_streak: prior.best_streak.max(1),
                        last_active_day: Some(today),
                    };
                    (record, StreakTransition::Reset { gap_days: d })
                }
            }
        };

        self.store
            .write(user_id, Namespace::Streak, serde_json::to_value(&record)?)
            .await?;

        Ok(CheckInResult { record, transition })
    }

    /// Read-only view of the user's streak. Never mutates state; an
    /// absent record reads as an all-zero streak.
    pub async fn get_streak(&self, user_id: &str) -> Result<StreakRecord> {
        self.load(user_id).await
    }

    /// Whether the user has already checked in on the current day.
    pub async fn checked_in_today(&self, user_id: &str) -> Result<bool> {
        let today = self.boundary.today(self.clock.as_ref());
        let record = self.load(user_id).await?;
        Ok(record.last_active_day.as_ref() == Some(&today))
    }

    async fn load(&self, user_id: &str) -> Result<StreakRecord> {
        match self.store.read(user_id, Namespace::Streak).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(StreakRecord::empty(user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use crate::store::{MemoryBackend, StoreBackend};
    use chrono::{DateTime, Duration, Utc};
    use serde_json::json;

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().to_utc()
    }

    fn tracker_with(clock: SimClock) -> (Arc<MemoryBackend>, Arc<MemoryBackend>, StreakTracker) {
        let remote = Arc::new(MemoryBackend::new());
        let local = Arc::new(MemoryBackend::new());
        let store = Arc::new(DualStore::new(remote.clone(), local.clone()));
        let tracker = StreakTracker::new(store, DayBoundary::new(0).unwrap(), Arc::new(clock));
        (remote, local, tracker)
    }

    #[tokio::test]
    async fn test_first_ever_check_in() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock);

        let result = tracker.check_in("u1").await.unwrap();
        assert_eq!(result.transition, StreakTransition::Started);
        assert_eq!(result.record.streak_count, 1);
        assert_eq!(result.record.best_streak, 1);
        assert_eq!(
            result.record.last_active_day,
            Some(DayKey::parse("2024-01-10").unwrap())
        );
    }

    #[tokio::test]
    async fn test_same_day_check_in_is_idempotent() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock.clone());

        let first = tracker.check_in("u1").await.unwrap();

        clock.advance(Duration::hours(10));
        for _ in 0..4 {
            let repeat = tracker.check_in("u1").await.unwrap();
            assert_eq!(repeat.transition, StreakTransition::AlreadyCheckedIn);
            assert_eq!(repeat.record, first.record);
        }
    }

    #[tokio::test]
    async fn test_next_day_continues_streak() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock.clone());

        tracker.check_in("u1").await.unwrap();
        clock.advance(Duration::days(1));

        let result = tracker.check_in("u1").await.unwrap();
        assert_eq!(result.transition, StreakTransition::Continued);
        assert_eq!(result.record.streak_count, 2);
        assert_eq!(result.record.best_streak, 2);
        assert_eq!(
            result.record.last_active_day,
            Some(DayKey::parse("2024-01-11").unwrap())
        );
    }

    #[tokio::test]
    async fn test_gap_resets_to_one_and_keeps_best() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock.clone());

        tracker.check_in("u1").await.unwrap();
        clock.advance(Duration::days(1));
        tracker.check_in("u1").await.unwrap();

        // Next check-in three days later (2024-01-14).
        clock.advance(Duration::days(3));
        let result = tracker.check_in("u1").await.unwrap();
        assert_eq!(result.transition, StreakTransition::Reset { gap_days: 3 });
        assert_eq!(result.record.streak_count, 1);
        assert_eq!(result.record.best_streak, 2);
        assert_eq!(
            result.record.last_active_day,
            Some(DayKey::parse("2024-01-14").unwrap())
        );
    }

    #[tokio::test]
    async fn test_future_record_is_a_no_op() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, local, tracker) = tracker_with(clock);

        // A record written by a device with a fast clock.
        let record = StreakRecord {
            user_id: "u1".into(),
            streak_count: 6,
            best_streak: 9,
            last_active_day: Some(DayKey::parse("2024-01-12").unwrap()),
        };
        local
            .put("u1", Namespace::Streak, serde_json::to_value(&record).unwrap())
            .await
            .unwrap();

        let result = tracker.check_in("u1").await.unwrap();
        assert_eq!(result.transition, StreakTransition::ClockAnomaly);
        assert_eq!(result.record, record);
    }

    #[tokio::test]
    async fn test_get_streak_never_mutates() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock.clone());

        tracker.check_in("u1").await.unwrap();
        clock.advance(Duration::days(5));

        // Reads across a gap still show the stored streak untouched.
        for _ in 0..3 {
            let record = tracker.get_streak("u1").await.unwrap();
            assert_eq!(record.streak_count, 1);
            assert_eq!(
                record.last_active_day,
                Some(DayKey::parse("2024-01-10").unwrap())
            );
        }
    }

    #[tokio::test]
    async fn test_get_streak_absent_reads_as_zero() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock);

        let record = tracker.get_streak("ghost").await.unwrap();
        assert_eq!(record.streak_count, 0);
        assert_eq!(record.best_streak, 0);
        assert!(record.last_active_day.is_none());
    }

    #[tokio::test]
    async fn test_checked_in_today() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock.clone());

        assert!(!tracker.checked_in_today("u1").await.unwrap());
        tracker.check_in("u1").await.unwrap();
        assert!(tracker.checked_in_today("u1").await.unwrap());

        clock.advance(Duration::days(1));
        assert!(!tracker.checked_in_today("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_in_survives_remote_outage() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (remote, _, tracker) = tracker_with(clock.clone());

        tracker.check_in("u1").await.unwrap();
        remote.set_failing(true);
        clock.advance(Duration::days(1));

        let result = tracker.check_in("u1").await.unwrap();
        assert_eq!(result.record.streak_count, 2);
    }

    #[tokio::test]
    async fn test_total_storage_failure_surfaces() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (remote, local, tracker) = tracker_with(clock);
        remote.set_failing(true);
        local.set_failing(true);

        assert!(tracker.check_in("u1").await.is_err());
        assert!(tracker.get_streak("u1").await.is_err());
    }

    #[tokio::test]
    async fn test_reset_after_regrowth_preserves_best() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, _, tracker) = tracker_with(clock.clone());

        // Build a 4-day streak.
        tracker.check_in("u1").await.unwrap();
        for _ in 0..3 {
            clock.advance(Duration::days(1));
            tracker.check_in("u1").await.unwrap();
        }
        assert_eq!(tracker.get_streak("u1").await.unwrap().best_streak, 4);

        // Miss a week, rebuild two days.
        clock.advance(Duration::days(7));
        tracker.check_in("u1").await.unwrap();
        clock.advance(Duration::days(1));
        let result = tracker.check_in("u1").await.unwrap();

        assert_eq!(result.record.streak_count, 2);
        assert_eq!(result.record.best_streak, 4);
    }

    #[tokio::test]
    async fn test_corrupt_record_surfaces_as_serialization_error() {
        let clock = SimClock::at(instant("2024-01-10T08:00:00Z"));
        let (_, local, tracker) = tracker_with(clock);

        local
            .put("u1", Namespace::Streak, json!({"streak_count": "four"}))
            .await
            .unwrap();

        assert!(tracker.get_streak("u1").await.is_err());
    }
}
