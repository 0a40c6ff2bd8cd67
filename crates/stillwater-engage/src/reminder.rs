//! Daily check-in reminder.
//!
//! A single self-rescheduling timer, process-wide: once per local day
//! at a configured wall-clock hour it checks whether the user has
//! already checked in and, if not, emits one reminder. It then re-arms
//! itself for the following day regardless of outcome.
//!
//! Best-effort by design: armed state does not survive a process
//! restart, and firings missed while the process was not running are
//! not caught up.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::day::{DayBoundary, DayKey};
use crate::error::Result;
use crate::milestone::NotificationSink;
use crate::streak::StreakTracker;

const REMINDER_TITLE: &str = "Keep your streak alive";

const REMINDER_MESSAGES: &[&str] = &[
    "A few quiet minutes today keeps your streak going.",
    "Your streak is waiting -- check in before the day ends.",
    "One small check-in today. Future you says thanks.",
    "Still time today to show up for yourself.",
];

#[derive(Default)]
struct SchedulerState {
    last_scheduled_day: Option<DayKey>,
    handle: Option<JoinHandle<()>>,
}

struct Inner {
    streaks: Arc<StreakTracker>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    boundary: DayBoundary,
    user_id: String,
    state: Mutex<SchedulerState>,
}

impl Inner {
    /// The daily cycle: sleep to the next occurrence of the reference
    /// hour, fire, re-arm. Runs for the lifetime of the process unless
    /// stopped.
    async fn run(self: Arc<Self>, reference_hour_local: u32) {
        loop {
            let delay =
                next_fire_delay(self.clock.now(), self.boundary.offset(), reference_hour_local);
            tokio::time::sleep(delay.to_std().unwrap_or_default()).await;

            {
                let today = self.boundary.today(self.clock.as_ref());
                let mut state = self.state.lock().unwrap();
                state.last_scheduled_day = Some(today);
            }

            match self.fire_once().await {
                Ok(emitted) => {
                    debug!(user_id = %self.user_id, emitted, "reminder timer fired");
                }
                Err(err) => {
                    warn!(user_id = %self.user_id, %err, "reminder check failed, re-arming");
                }
            }
        }
    }

    async fn fire_once(&self) -> Result<bool> {
        if self.streaks.checked_in_today(&self.user_id).await? {
            return Ok(false);
        }

        let message = {
            let mut rng = rand::thread_rng();
            REMINDER_MESSAGES
                .choose(&mut rng)
                .copied()
                .unwrap_or(REMINDER_MESSAGES[0])
        };
        self.sink.notify(REMINDER_TITLE, message).await;
        Ok(true)
    }
}

/// Single-shot, self-rescheduling daily reminder timer.
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    pub fn new(
        streaks: Arc<StreakTracker>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        boundary: DayBoundary,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                streaks,
                sink,
                clock,
                boundary,
                user_id: user_id.into(),
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// Arm the daily timer for the next occurrence of
    /// `reference_hour_local` (today if not yet passed, else tomorrow).
    ///
    /// Idempotent within a calendar day: repeated calls while a timer
    /// for today has already been scheduled are no-ops, so app-launch
    /// code may call this unconditionally.
    pub fn start(&self, reference_hour_local: u32) {
        let today = self.inner.boundary.today(self.inner.clock.as_ref());
        let mut state = self.inner.state.lock().unwrap();

        if state.last_scheduled_day.as_ref() == Some(&today) {
            debug!(user_id = %self.inner.user_id, %today, "reminder already scheduled today");
            return;
        }
        if let Some(handle) = &state.handle {
            if !handle.is_finished() {
                return;
            }
        }

        state.last_scheduled_day = Some(today);
        let inner = Arc::clone(&self.inner);
        state.handle = Some(tokio::spawn(async move {
            inner.run(reference_hour_local).await;
        }));
    }

    /// Cancel the pending timer. Nothing fires until `start` is called
    /// again; the already-scheduled marker is cleared so a restart on
    /// the same day re-arms.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }
        state.last_scheduled_day = None;
        debug!(user_id = %self.inner.user_id, "reminder scheduler stopped");
    }

    /// Whether a timer is currently armed.
    pub fn is_armed(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state
            .handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// One firing: emit a reminder unless the user already checked in
    /// today. Returns whether a reminder was emitted.
    ///
    /// # Errors
    /// Returns an error when the streak record cannot be read at all;
    /// the daily cycle logs it and re-arms.
    pub async fn fire_once(&self) -> Result<bool> {
        self.inner.fire_once().await
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.state.lock() {
            if let Some(handle) = state.handle.take() {
                handle.abort();
            }
        }
    }
}

/// Time until the next occurrence of `hour:00` local wall-clock time:
/// later today if the hour has not yet passed, otherwise tomorrow.
fn next_fire_delay(now: DateTime<Utc>, offset: FixedOffset, hour: u32) -> Duration {
    let local = now.with_timezone(&offset);
    let today_target = local
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .unwrap_or_else(|| local.date_naive().and_hms_opt(0, 0, 0).unwrap());

    let target = if local.naive_local() < today_target {
        today_target
    } else {
        today_target + Duration::days(1)
    };

    match target.and_local_timezone(offset) {
        chrono::LocalResult::Single(t) => t.with_timezone(&Utc) - now,
        // Unreachable for a fixed offset; fall back to a day.
        _ => Duration::days(1),
    }
}
