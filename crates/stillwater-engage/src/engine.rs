//! Engagement engine facade.
//!
//! Wires the session-start control flow together: a check-in runs the
//! streak state machine and, when the streak value actually changed,
//! feeds the new value to milestone detection. Quota calls pass
//! through. Hosts that need finer control can use the components
//! directly.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::EngageConfig;
use crate::day::DayBoundary;
use crate::error::Result;
use crate::milestone::{MilestoneNotifier, NotificationSink};
use crate::quota::{UsageQuotaLedger, UsageSnapshot};
use crate::reminder::ReminderScheduler;
use crate::store::{DualStore, StoreBackend};
use crate::streak::{CheckInResult, StreakRecord, StreakTracker};

/// Outcome of a session-start check-in.
#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub check_in: CheckInResult,
    /// Milestone threshold crossed by this check-in, if any.
    pub milestone: Option<u32>,
}

/// Builder wiring backends, notification sink, and clock into the
/// engine components.
pub struct EngagementEngine {
    quota: UsageQuotaLedger,
    streaks: Arc<StreakTracker>,
    milestones: MilestoneNotifier,
    reminders: ReminderScheduler,
    reminder_hour: u32,
}

impl EngagementEngine {
    /// Assemble the engine for one signed-in user.
    ///
    /// # Errors
    /// Returns [`crate::EngageError::InvalidDayKey`] when the
    /// configured UTC offset is not a valid timezone offset.
    pub fn new(
        config: &EngageConfig,
        remote: Option<Arc<dyn StoreBackend>>,
        local: Arc<dyn StoreBackend>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        user_id: impl Into<String>,
    ) -> Result<Self> {
        let boundary = DayBoundary::new(config.utc_offset_hours)?;
        let store = Arc::new(match remote {
            Some(remote) => DualStore::new(remote, local),
            None => DualStore::local_only(local),
        });

        let quota = UsageQuotaLedger::new(
            store.clone(),
            boundary,
            clock.clone(),
            config.daily_free_limit,
        );
        let streaks = Arc::new(StreakTracker::new(store.clone(), boundary, clock.clone()));
        let milestones = MilestoneNotifier::with_thresholds(
            store,
            sink.clone(),
            config.milestone_thresholds.clone(),
        );
        let reminders = ReminderScheduler::new(streaks.clone(), sink, clock, boundary, user_id);

        Ok(Self {
            quota,
            streaks,
            milestones,
            reminders,
            reminder_hour: config.reminder_hour,
        })
    }

    /// Register today's activity: run the streak transition, then
    /// evaluate milestones when the streak value changed.
    pub async fn record_check_in(&self, user_id: &str) -> Result<CheckInOutcome> {
        let check_in = self.streaks.check_in(user_id).await?;

        let milestone = if check_in.streak_changed() {
            self.milestones
                .on_streak_updated(user_id, check_in.record.streak_count)
                .await?
        } else {
            None
        };

        Ok(CheckInOutcome {
            check_in,
            milestone,
        })
    }

    /// Read-only streak view.
    pub async fn streak(&self, user_id: &str) -> Result<StreakRecord> {
        self.streaks.get_streak(user_id).await
    }

    /// Current quota usage. Consult before sending an AI question.
    pub async fn usage(&self, user_id: &str, is_premium: bool) -> Result<UsageSnapshot> {
        self.quota.get_usage(user_id, is_premium).await
    }

    /// Record one asked AI question.
    pub async fn record_question(&self, user_id: &str, is_premium: bool) -> Result<UsageSnapshot> {
        self.quota.record_question(user_id, is_premium).await
    }

    /// Arm the daily reminder at the configured hour.
    pub fn start_reminders(&self) {
        self.reminders.start(self.reminder_hour);
    }

    /// Disarm the daily reminder.
    pub fn stop_reminders(&self) {
        self.reminders.stop();
    }

    /// The reminder scheduler, for hosts that manage its lifecycle
    /// themselves.
    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }
}
