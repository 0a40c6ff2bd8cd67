//! In-memory key-value backend.
//!
//! Used as the remote stand-in in tests and as a throwaway local store
//! for guest sessions. The `set_failing` switch simulates an
//! unreachable backend for degradation tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{Namespace, StoreBackend};

/// Thread-safe in-memory backend with fault injection.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<(String, Namespace), serde_json::Value>>,
    failing: AtomicBool,
    op_count: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, every operation fails with [`StoreError::Unreachable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total get/put calls observed, including failed ones.
    pub fn op_count(&self) -> u64 {
        self.op_count.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        self.op_count.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unreachable("fault injected".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn get(
        &self,
        user_id: &str,
        namespace: Namespace,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        self.check_reachable()?;
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(&(user_id.to_string(), namespace)).cloned())
    }

    async fn put(
        &self,
        user_id: &str,
        namespace: Namespace,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.check_reachable()?;
        let mut entries = self.entries.lock().unwrap();
        entries.insert((user_id.to_string(), namespace), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_roundtrip() {
        let backend = MemoryBackend::new();
        backend
            .put("u1", Namespace::Quota, json!({"n": 3}))
            .await
            .unwrap();
        let value = backend.get("u1", Namespace::Quota).await.unwrap().unwrap();
        assert_eq!(value["n"], 3);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let backend = MemoryBackend::new();
        backend
            .put("u1", Namespace::Quota, json!({"n": 3}))
            .await
            .unwrap();
        assert!(backend.get("u1", Namespace::Streak).await.unwrap().is_none());
        assert!(backend.get("u2", Namespace::Quota).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let backend = MemoryBackend::new();
        backend.set_failing(true);
        assert!(backend.get("u1", Namespace::Quota).await.is_err());
        backend.set_failing(false);
        assert!(backend.get("u1", Namespace::Quota).await.is_ok());
    }

    #[tokio::test]
    async fn test_op_count() {
        let backend = MemoryBackend::new();
        let _ = backend.get("u1", Namespace::Quota).await;
        let _ = backend.put("u1", Namespace::Quota, json!({})).await;
        assert_eq!(backend.op_count(), 2);
    }
}
