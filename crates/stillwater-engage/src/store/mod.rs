//! Remote-primary, local-fallback persistence.
//!
//! Quota and streak state live in two key-value backends at once: a
//! remote store that is authoritative when reachable, and a local
//! on-device store that is always available. [`DualStore`] is the single
//! place the fallback order and conflict policy are decided, so the
//! quota and streak features cannot drift apart:
//!
//! - reads prefer remote, degrade to local on any remote failure;
//! - writes go to local unconditionally, then best-effort to remote;
//! - conflicts across devices resolve last-writer-wins (lossy by
//!   design -- this engine does no distributed consensus).

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{EngageError, Result, StoreError};

/// Logical record family within a user's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Quota,
    Streak,
    Milestones,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Quota => "quota",
            Namespace::Streak => "streak",
            Namespace::Milestones => "milestones",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key-value backend addressed by `(user_id, namespace)`.
///
/// Each logical record is read and written as one atomic key; the
/// engine never spans a transaction across keys. Implementations that
/// talk over the network must bound their calls with a timeout and
/// report it as [`StoreError::Unreachable`].
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn get(
        &self,
        user_id: &str,
        namespace: Namespace,
    ) -> Result<Option<serde_json::Value>, StoreError>;

    async fn put(
        &self,
        user_id: &str,
        namespace: Namespace,
        value: serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// The dual-backend store shared by quota, streak, and milestone state.
pub struct DualStore {
    remote: Option<Arc<dyn StoreBackend>>,
    local: Arc<dyn StoreBackend>,
    /// Diagnostics only -- never consulted for conflict resolution.
    last_write_at: Mutex<Option<DateTime<Utc>>>,
}

impl DualStore {
    /// Store with a remote primary and a local fallback.
    pub fn new(remote: Arc<dyn StoreBackend>, local: Arc<dyn StoreBackend>) -> Self {
        Self {
            remote: Some(remote),
            local,
            last_write_at: Mutex::new(None),
        }
    }

    /// Store with no remote backend configured (offline/guest mode).
    pub fn local_only(local: Arc<dyn StoreBackend>) -> Self {
        Self {
            remote: None,
            local,
            last_write_at: Mutex::new(None),
        }
    }

    /// Read the record for `(user_id, namespace)`.
    ///
    /// Remote is consulted first when configured. A remote failure
    /// degrades to the local backend with a warning; `None` is returned
    /// only when neither backend holds a record.
    ///
    /// # Errors
    /// Returns [`EngageError::StorageUnavailable`] when the local
    /// backend also fails.
    pub async fn read(
        &self,
        user_id: &str,
        namespace: Namespace,
    ) -> Result<Option<serde_json::Value>> {
        if let Some(remote) = &self.remote {
            match remote.get(user_id, namespace).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(err) => {
                    warn!(%namespace, user_id, %err, "remote read failed, degrading to local");
                }
            }
        }

        self.local
            .get(user_id, namespace)
            .await
            .map_err(|source| EngageError::StorageUnavailable { namespace, source })
    }

    /// Write the record for `(user_id, namespace)`.
    ///
    /// The local write is the durable record for this process and must
    /// succeed; the remote write is best-effort and a failure is
    /// swallowed with a warning. Reconciliation with the remote happens
    /// on the next read/write cycle, never via immediate retry.
    ///
    /// # Errors
    /// Returns [`EngageError::StorageUnavailable`] when the local write
    /// fails.
    pub async fn write(
        &self,
        user_id: &str,
        namespace: Namespace,
        value: serde_json::Value,
    ) -> Result<()> {
        self.local
            .put(user_id, namespace, value.clone())
            .await
            .map_err(|source| EngageError::StorageUnavailable { namespace, source })?;

        if let Some(remote) = &self.remote {
            if let Err(err) = remote.put(user_id, namespace, value).await {
                warn!(%namespace, user_id, %err, "remote write failed, local copy retained");
            }
        }

        *self.last_write_at.lock().unwrap() = Some(Utc::now());
        Ok(())
    }

    /// Timestamp of the most recent successful write, for diagnostics.
    pub fn last_write_at(&self) -> Option<DateTime<Utc>> {
        *self.last_write_at.lock().unwrap()
    }
}
