//! Per-day question quota for free-tier users.
//!
//! The ledger tracks how many AI questions a user has asked on the
//! current calendar day against `daily_free_limit`. It only reports
//! counts; the caller compares against the limit and decides whether to
//! permit the quota-consuming action. Premium users are exempt before
//! any storage I/O happens.
//!
//! Day rollover is implicit: a stored record whose day key is not
//! "today" is treated as zero on read and overwritten on the next
//! increment. No destructive reset ever runs on the read path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::day::{DayBoundary, DayKey};
use crate::error::Result;
use crate::store::{DualStore, Namespace};

/// Persisted per-user quota row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub user_id: String,
    pub day_key: DayKey,
    pub questions_asked: u32,
    pub premium_at_record: bool,
}

/// Point-in-time usage view returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub questions_asked_today: u32,
    /// `None` means unbounded (premium).
    pub questions_remaining: Option<u32>,
    pub limit_reached: bool,
    pub is_premium: bool,
}

impl UsageSnapshot {
    fn premium() -> Self {
        Self {
            questions_asked_today: 0,
            questions_remaining: None,
            limit_reached: false,
            is_premium: true,
        }
    }

    fn free(questions_asked_today: u32, daily_limit: u32) -> Self {
        Self {
            questions_asked_today,
            questions_remaining: Some(daily_limit.saturating_sub(questions_asked_today)),
            limit_reached: questions_asked_today >= daily_limit,
            is_premium: false,
        }
    }
}

/// Tracks per-user, per-day question counts against the free-tier limit.
pub struct UsageQuotaLedger {
    store: Arc<DualStore>,
    boundary: DayBoundary,
    clock: Arc<dyn Clock>,
    daily_limit: u32,
}

impl UsageQuotaLedger {
    pub fn new(
        store: Arc<DualStore>,
        boundary: DayBoundary,
        clock: Arc<dyn Clock>,
        daily_limit: u32,
    ) -> Self {
        Self {
            store,
            boundary,
            clock,
            daily_limit,
        }
    }

    /// Current usage for the user.
    ///
    /// Premium short-circuits to an unbounded snapshot without touching
    /// storage. For free users the count is read fresh from storage on
    /// every call; a record from an earlier day counts as zero.
    ///
    /// # Errors
    /// Returns [`crate::EngageError::StorageUnavailable`] when both
    /// backends fail; the caller should deny the quota-consuming action
    /// rather than silently grant it.
    pub async fn get_usage(&self, user_id: &str, is_premium: bool) -> Result<UsageSnapshot> {
        if is_premium {
            return Ok(UsageSnapshot::premium());
        }

        let today = self.boundary.today(self.clock.as_ref());
        let count = self.effective_count(user_id, &today).await?;
        Ok(UsageSnapshot::free(count, self.daily_limit))
    }

    /// Record one asked question and return the post-increment snapshot.
    ///
    /// Performs its own staleness check: a record from an earlier day
    /// restarts the count at 1 rather than incrementing the stale
    /// value. Safe to call without a prior `get_usage`.
    ///
    /// # Errors
    /// Returns [`crate::EngageError::StorageUnavailable`] when the
    /// updated record cannot be persisted locally.
    pub async fn record_question(&self, user_id: &str, is_premium: bool) -> Result<UsageSnapshot> {
        if is_premium {
            return Ok(UsageSnapshot::premium());
        }

        let today = self.boundary.today(self.clock.as_ref());
        let count = self.effective_count(user_id, &today).await? + 1;

        let record = QuotaRecord {
            user_id: user_id.to_string(),
            day_key: today,
            questions_asked: count,
            premium_at_record: false,
        };
        self.store
            .write(user_id, Namespace::Quota, serde_json::to_value(&record)?)
            .await?;

        Ok(UsageSnapshot::free(count, self.daily_limit))
    }

    /// Today's count: the stored value when the record is from today,
    /// zero when absent or stale.
    async fn effective_count(&self, user_id: &str, today: &DayKey) -> Result<u32> {
        let count = match self.store.read(user_id, Namespace::Quota).await? {
            Some(value) => {
                let record: QuotaRecord = serde_json::from_value(value)?;
                if record.day_key == *today {
                    record.questions_asked
                } else {
                    0
                }
            }
            None => 0,
        };
        Ok(count)
    }
}
