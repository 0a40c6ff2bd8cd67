//! Core error types for stillwater-engage.
//!
//! Two tiers: `StoreError` is what an individual key-value backend
//! reports, `EngageError` is what engine operations surface to the host
//! application. A remote-only failure never becomes an `EngageError` --
//! the dual store degrades to the local backend and logs instead.

use thiserror::Error;

use crate::store::Namespace;

/// Engine-level error type.
#[derive(Error, Debug)]
pub enum EngageError {
    /// Malformed day key, timestamp, or reference-timezone input.
    ///
    /// This is a programmer error: day keys are produced by the engine
    /// itself and timezone offsets come from validated configuration.
    #[error("Invalid day key: {0}")]
    InvalidDayKey(String),

    /// Both backends failed on a read, or the local backend failed on a
    /// write. The caller decides the safe default (deny quota-consuming
    /// actions, keep showing the last known-good streak).
    #[error("Storage unavailable for namespace '{namespace}': {source}")]
    StorageUnavailable {
        namespace: Namespace,
        #[source]
        source: StoreError,
    },

    /// Invalid configuration value or failed config I/O.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A persisted record could not be encoded or decoded.
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Backend-level error type.
///
/// A timed-out remote call is reported as `Unreachable`; the dual store
/// treats timeout as a flavor of "remote unreachable", not a distinct
/// class the caller must handle.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached (network failure, timeout,
    /// auth rejection).
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered but the operation failed.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Result type alias for EngageError.
pub type Result<T, E = EngageError> = std::result::Result<T, E>;
