//! Scheduler configuration.
//!
//! # Invariants
//! - A config returned by `from_json` has passed `validate`.

use crate::model::date_window::DEFAULT_WINDOW_DAYS;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Longest first-run window a config may ask for.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Threshold rule separating `Partial` from `Full` slots.
///
/// `Empty` always means nobody is available, whatever the rule.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntensityRule {
    /// `Full` once at least `full_min` participants are available.
    Count { full_min: usize },
    /// `Full` once the available share of all participants reaches `full_ratio`.
    Share { full_ratio: f64 },
}

impl Default for IntensityRule {
    fn default() -> Self {
        Self::Count { full_min: 2 }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid scheduler config: {err}"),
            Self::Invalid { field, reason } => {
                write!(f, "invalid scheduler config `{field}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Session-wide tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Reject add/update without a phone number.
    pub require_phone: bool,

    /// Slot coloring thresholds
    pub intensity_rule: IntensityRule,

    /// Entries returned by `top_slots` when the caller does not pass a limit.
    pub top_slot_limit: usize,

    /// Length of the window created on first run.
    pub default_window_days: u32,

    /// How long `Saved` stays visible before reading back as `Idle` (milliseconds).
    pub saved_display_ms: u64,
}

impl SchedulerConfig {
    /// Parses a JSON object; missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_window_days == 0 || self.default_window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid {
                field: "default_window_days",
                reason: format!("must be between 1 and {MAX_WINDOW_DAYS}"),
            });
        }
        if self.top_slot_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "top_slot_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        match self.intensity_rule {
            IntensityRule::Count { full_min } if full_min == 0 => Err(ConfigError::Invalid {
                field: "intensity_rule.full_min",
                reason: "must be at least 1".to_string(),
            }),
            IntensityRule::Share { full_ratio } if !(full_ratio > 0.0 && full_ratio <= 1.0) => {
                Err(ConfigError::Invalid {
                    field: "intensity_rule.full_ratio",
                    reason: "must be in (0, 1]".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn saved_display(&self) -> Duration {
        Duration::from_millis(self.saved_display_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            require_phone: true,
            intensity_rule: IntensityRule::default(),
            top_slot_limit: 5,
            default_window_days: DEFAULT_WINDOW_DAYS,
            saved_display_ms: 2_000,
        }
    }
}
