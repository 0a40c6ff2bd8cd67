//! # Stillwater Engagement Engine
//!
//! Core library for Stillwater's temporal engagement features: the
//! free-tier daily question quota, consecutive-day streaks with
//! milestone celebrations, and the daily check-in reminder. It is a
//! library-level component consumed in-process by the host application;
//! authentication, the LLM call itself, and all presentation live
//! outside.
//!
//! ## Architecture
//!
//! - **Day boundaries**: all bookkeeping is keyed by [`DayKey`], a
//!   calendar day in one fixed reference timezone, resolved through an
//!   injected [`Clock`]
//! - **Storage**: a remote-primary, local-fallback [`DualStore`] over
//!   host-supplied key-value backends; remote failures degrade, they
//!   never break the user-facing operation
//! - **Quota**: [`UsageQuotaLedger`] meters questions per day and
//!   reports counts; the caller decides allow/deny
//! - **Streaks**: [`StreakTracker`] applies the continuation/reset
//!   state machine per check-in, [`MilestoneNotifier`] celebrates
//!   threshold crossings at most once each
//! - **Reminders**: [`ReminderScheduler`] fires once per local day at a
//!   fixed hour, best-effort, single process

pub mod clock;
pub mod config;
pub mod day;
pub mod engine;
pub mod error;
pub mod milestone;
pub mod quota;
pub mod reminder;
pub mod store;
pub mod streak;

pub use clock::{Clock, SimClock, SystemClock};
pub use config::EngageConfig;
pub use day::{DayBoundary, DayKey};
pub use engine::{CheckInOutcome, EngagementEngine};
pub use error::{EngageError, StoreError};
pub use milestone::{MilestoneNotifier, NotificationSink, DEFAULT_MILESTONES};
pub use quota::{QuotaRecord, UsageQuotaLedger, UsageSnapshot};
pub use reminder::ReminderScheduler;
pub use store::{DualStore, MemoryBackend, Namespace, SqliteBackend, StoreBackend};
pub use streak::{CheckInResult, StreakRecord, StreakTracker, StreakTransition};
