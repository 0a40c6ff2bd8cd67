//! TOML-based engine configuration.
//!
//! Stores the engagement knobs:
//! - free-tier daily question limit
//! - streak milestone thresholds
//! - daily reminder hour (reference-timezone wall clock)
//! - reference timezone as a fixed UTC offset
//!
//! Configuration is stored at `~/.config/stillwater/engage.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngageError, Result};

/// Engagement engine configuration.
///
/// Serialized to/from TOML at `~/.config/stillwater/engage.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngageConfig {
    /// Questions a free user may ask per calendar day.
    #[serde(default = "default_daily_free_limit")]
    pub daily_free_limit: u32,
    /// Streak lengths that trigger a one-time celebration.
    #[serde(default = "default_milestone_thresholds")]
    pub milestone_thresholds: Vec<u32>,
    /// Wall-clock hour (0-23, reference timezone) of the daily reminder.
    #[serde(default = "default_reminder_hour")]
    pub reminder_hour: u32,
    /// Reference timezone as whole hours east of UTC.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

fn default_daily_free_limit() -> u32 {
    5
}

fn default_milestone_thresholds() -> Vec<u32> {
    vec![3, 7, 14, 30, 60, 100]
}

fn default_reminder_hour() -> u32 {
    20
}

impl Default for EngageConfig {
    fn default() -> Self {
        Self {
            daily_free_limit: default_daily_free_limit(),
            milestone_thresholds: default_milestone_thresholds(),
            reminder_hour: default_reminder_hour(),
            utc_offset_hours: 0,
        }
    }
}

impl EngageConfig {
    /// Load from `engage.toml`, falling back to defaults when the file
    /// does not exist. Thresholds are sorted and deduplicated on load.
    ///
    /// # Errors
    /// Returns [`EngageError::Config`] on unreadable or invalid TOML,
    /// or on out-of-range values.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| EngageError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&raw)
    }

    /// Parse a TOML document into a validated config.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(raw).map_err(|e| EngageError::Config(e.to_string()))?;
        config.validate()?;
        config.milestone_thresholds.sort_unstable();
        config.milestone_thresholds.dedup();
        Ok(config)
    }

    /// Save to `engage.toml`.
    ///
    /// # Errors
    /// Returns [`EngageError::Config`] if serialization or the write fails.
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let path = Self::path()?;
        let raw =
            toml::to_string_pretty(self).map_err(|e| EngageError::Config(e.to_string()))?;
        std::fs::write(&path, raw)
            .map_err(|e| EngageError::Config(format!("write {}: {e}", path.display())))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.daily_free_limit == 0 {
            return Err(EngageError::Config(
                "daily_free_limit must be at least 1".into(),
            ));
        }
        if self.reminder_hour > 23 {
            return Err(EngageError::Config(format!(
                "reminder_hour must be 0-23, got {}",
                self.reminder_hour
            )));
        }
        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(EngageError::Config(format!(
                "utc_offset_hours must be within -23..=23, got {}",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("engage.toml"))
    }
}

/// Returns `~/.config/stillwater[-dev]/` based on STILLWATER_ENV.
///
/// Set STILLWATER_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns [`EngageError::Config`] if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STILLWATER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("stillwater-dev")
    } else {
        base_dir.join("stillwater")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| EngageError::Config(format!("create {}: {e}", dir.display())))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngageConfig::default();
        assert_eq!(config.daily_free_limit, 5);
        assert_eq!(config.milestone_thresholds, vec![3, 7, 14, 30, 60, 100]);
        assert_eq!(config.reminder_hour, 20);
        assert_eq!(config.utc_offset_hours, 0);
    }

    #[test]
    fn test_partial_toml_uses_field_defaults() {
        let config = EngageConfig::from_toml("daily_free_limit = 10\n").unwrap();
        assert_eq!(config.daily_free_limit, 10);
        assert_eq!(config.reminder_hour, 20);
    }

    #[test]
    fn test_thresholds_sorted_and_deduped() {
        let config =
            EngageConfig::from_toml("milestone_thresholds = [30, 3, 7, 3]\n").unwrap();
        assert_eq!(config.milestone_thresholds, vec![3, 7, 30]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(EngageConfig::from_toml("daily_free_limit = 0\n").is_err());
        assert!(EngageConfig::from_toml("reminder_hour = 24\n").is_err());
        assert!(EngageConfig::from_toml("utc_offset_hours = 30\n").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngageConfig {
            daily_free_limit: 8,
            milestone_thresholds: vec![5, 10],
            reminder_hour: 9,
            utc_offset_hours: -5,
        };
        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed = EngageConfig::from_toml(&raw).unwrap();
        assert_eq!(parsed.daily_free_limit, 8);
        assert_eq!(parsed.utc_offset_hours, -5);
    }
}
