//! Streak milestone celebrations.
//!
//! When a check-in lands a user's streak exactly on a threshold value
//! (3, 7, 14, ... days), one celebratory notification fires -- once per
//! threshold per user, forever. The acknowledgement flag is keyed by
//! threshold value, so a streak that resets and later regrows through
//! the same threshold does not re-notify.
//!
//! This component decides *whether* to fire; display is delegated to a
//! [`NotificationSink`] supplied by the host.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngageError, Result};
use crate::store::{DualStore, Namespace};

/// Default celebratory streak thresholds, in days.
pub const DEFAULT_MILESTONES: &[u32] = &[3, 7, 14, 30, 60, 100];

/// Platform notification delivery.
///
/// Implementations wrap the OS notification API or an in-app event
/// channel. Missing notification permission must be a no-op, not an
/// error.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, title: &str, body: &str);
}

/// Per-user set of thresholds already celebrated. Flags are set once
/// and never cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AckRecord {
    acknowledged: BTreeSet<u32>,
}

/// Decides whether a new streak value earns a celebration.
pub struct MilestoneNotifier {
    store: Arc<DualStore>,
    sink: Arc<dyn NotificationSink>,
    thresholds: Vec<u32>,
}

impl MilestoneNotifier {
    pub fn new(store: Arc<DualStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_thresholds(store, sink, DEFAULT_MILESTONES.to_vec())
    }

    pub fn with_thresholds(
        store: Arc<DualStore>,
        sink: Arc<dyn NotificationSink>,
        mut thresholds: Vec<u32>,
    ) -> Self {
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            store,
            sink,
            thresholds,
        }
    }

    /// Evaluate a new streak value; returns the threshold that fired,
    /// if any.
    ///
    /// The trigger is exact equality, not `>=`: a streak adjusted past
    /// a threshold externally does not retroactively celebrate it. When
    /// the flag store is unavailable this fails open -- no emission,
    /// logged at warn -- rather than risk duplicate celebrations.
    pub async fn on_streak_updated(&self, user_id: &str, new_streak: u32) -> Result<Option<u32>> {
        if !self.thresholds.contains(&new_streak) {
            return Ok(None);
        }

        let mut acks = match self.load_acks(user_id).await {
            Ok(acks) => acks,
            Err(err) => {
                warn!(user_id, %err, "milestone flags unreadable, skipping celebration");
                return Ok(None);
            }
        };

        if acks.acknowledged.contains(&new_streak) {
            return Ok(None);
        }

        // Persist the flag before emitting: a lost notification is
        // recoverable, a duplicate celebration is not.
        acks.acknowledged.insert(new_streak);
        if let Err(err) = self
            .store
            .write(
                user_id,
                Namespace::Milestones,
                serde_json::to_value(&acks)?,
            )
            .await
        {
            warn!(user_id, %err, "milestone flag write failed, skipping celebration");
            return Ok(None);
        }

        let (title, body) = milestone_message(new_streak);
        self.sink.notify(&title, &body).await;
        Ok(Some(new_streak))
    }

    async fn load_acks(&self, user_id: &str) -> Result<AckRecord> {
        match self.store.read(user_id, Namespace::Milestones).await? {
            Some(value) => serde_json::from_value(value).map_err(EngageError::from),
            None => Ok(AckRecord::default()),
        }
    }
}

fn milestone_message(threshold: u32) -> (String, String) {
    (
        format!("{threshold}-day streak!"),
        format!("You've shown up {threshold} days in a row. Keep it going."),
    )
}
