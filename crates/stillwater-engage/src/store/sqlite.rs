//! SQLite-backed local key-value store.
//!
//! The default on-device backend: a single `kv` table keyed by
//! `user_id:namespace`, one row per logical record. Single-key
//! read-modify-write is all the atomicity the engine needs; SQLite
//! provides it per statement.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::store::{Namespace, StoreBackend};

/// Local on-device backend persisted to a SQLite file.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database at the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and guest sessions).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn key(user_id: &str, namespace: Namespace) -> String {
        format!("{user_id}:{}", namespace.as_str())
    }
}

#[async_trait]
impl StoreBackend for SqliteBackend {
    async fn get(
        &self,
        user_id: &str,
        namespace: Namespace,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![Self::key(user_id, namespace)],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => {
                let value = serde_json::from_str(&text)
                    .map_err(|e| StoreError::Backend(format!("corrupt record: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        user_id: &str,
        namespace: Namespace,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            params![Self::key(user_id, namespace), value.to_string()],
        )?;
        Ok(())
    }
}
