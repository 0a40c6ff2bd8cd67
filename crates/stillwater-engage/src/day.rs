//! Calendar-day resolution in the engine's reference timezone.
//!
//! All quota and streak bookkeeping is keyed by [`DayKey`], a
//! `YYYY-MM-DD` string in one fixed reference timezone. Day distance is
//! computed from calendar components, never from raw millisecond
//! subtraction, so the arithmetic survives daylight-saving shifts on
//! the device.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{EngageError, Result};

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// A calendar-day identifier in the reference timezone.
///
/// String ordering matches chronological ordering. Two timestamps map
/// to the same `DayKey` iff they fall in the same reference-timezone
/// calendar day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    /// Parse a `YYYY-MM-DD` string.
    ///
    /// # Errors
    /// Returns [`EngageError::InvalidDayKey`] on malformed input.
    pub fn parse(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(s, DAY_KEY_FORMAT)
            .map_err(|e| EngageError::InvalidDayKey(format!("'{s}': {e}")))?;
        Ok(Self::from_date(date))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_date(date: NaiveDate) -> Self {
        Self(date.format(DAY_KEY_FORMAT).to_string())
    }

    fn to_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, DAY_KEY_FORMAT)
            .map_err(|e| EngageError::InvalidDayKey(format!("'{}': {e}", self.0)))
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves timestamps to day keys in a fixed reference timezone.
#[derive(Debug, Clone, Copy)]
pub struct DayBoundary {
    offset: FixedOffset,
}

impl DayBoundary {
    /// Create a resolver for the given UTC offset in whole hours.
    ///
    /// # Errors
    /// Returns [`EngageError::InvalidDayKey`] if the offset is not a
    /// valid timezone offset (beyond +/-23 hours).
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            EngageError::InvalidDayKey(format!("invalid UTC offset: {utc_offset_hours}h"))
        })?;
        Ok(Self { offset })
    }

    /// Day key for "now" according to the injected clock.
    pub fn today(&self, clock: &dyn Clock) -> DayKey {
        self.day_key_of(clock.now())
    }

    /// Day key for an arbitrary timestamp.
    pub fn day_key_of(&self, timestamp: DateTime<Utc>) -> DayKey {
        DayKey::from_date(timestamp.with_timezone(&self.offset).date_naive())
    }

    /// Signed count of calendar-day boundaries crossed going from `a`
    /// to `b`. Zero when both keys name the same day.
    ///
    /// # Errors
    /// Returns [`EngageError::InvalidDayKey`] if either key is
    /// malformed (stored data corruption).
    pub fn diff_in_days(a: &DayKey, b: &DayKey) -> Result<i64> {
        let a = a.to_date()?;
        let b = b.to_date()?;
        Ok(b.signed_duration_since(a).num_days())
    }

    pub(crate) fn offset(&self) -> FixedOffset {
        self.offset
    }
}
