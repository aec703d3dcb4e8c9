//! Monitor configuration types
//!
//! This module defines the minimal configuration needed by the monitoring
//! pipeline: alerting thresholds for the event engine and the read policy
//! for the log follower. Loading these from files is the application's job.

use crate::types::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Alerting thresholds for the event engine
///
/// Immutable once handed to an engine; changing policy means building a new engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Offset magnitude (ms) at or above which a warning is raised
    #[serde(default = "default_warn_ms")]
    pub warn_ms: f64,

    /// Offset magnitude (ms) at or above which an alarm is raised
    #[serde(default = "default_alarm_ms")]
    pub alarm_ms: f64,

    /// Silence (s) without servo reports after which sync is considered lost
    #[serde(default = "default_lost_sync_seconds")]
    pub lost_sync_seconds: f64,
}

fn default_warn_ms() -> f64 {
    1.0
}

fn default_alarm_ms() -> f64 {
    5.0
}

fn default_lost_sync_seconds() -> f64 {
    3.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn_ms: default_warn_ms(),
            alarm_ms: default_alarm_ms(),
            lost_sync_seconds: default_lost_sync_seconds(),
        }
    }
}

impl Thresholds {
    /// Create thresholds with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the warning threshold
    pub fn with_warn_ms(mut self, warn_ms: f64) -> Self {
        self.warn_ms = warn_ms;
        self
    }

    /// Builder method: set the alarm threshold
    pub fn with_alarm_ms(mut self, alarm_ms: f64) -> Self {
        self.alarm_ms = alarm_ms;
        self
    }

    /// Builder method: set the lost-sync silence duration
    pub fn with_lost_sync_seconds(mut self, seconds: f64) -> Self {
        self.lost_sync_seconds = seconds;
        self
    }

    /// Check that all values are positive and the warn band lies below the alarm band
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("warn_ms", self.warn_ms),
            ("alarm_ms", self.alarm_ms),
            ("lost_sync_seconds", self.lost_sync_seconds),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(MonitorError::InvalidThresholds(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if self.warn_ms > self.alarm_ms {
            return Err(MonitorError::InvalidThresholds(format!(
                "warn_ms ({}) must not exceed alarm_ms ({})",
                self.warn_ms, self.alarm_ms
            )));
        }
        Ok(())
    }
}

/// How the follower reads its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowMode {
    /// Read existing content from the current position, then stop
    Replay,
    /// Skip existing content, then poll for appended lines forever
    #[default]
    Tail,
}

impl FollowMode {
    /// Map the "process from start" flag onto a mode
    pub fn from_start(from_start: bool) -> Self {
        if from_start {
            FollowMode::Replay
        } else {
            FollowMode::Tail
        }
    }
}

/// Default wait between polls at end of stream
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let th = Thresholds::default();
        assert_eq!(th.warn_ms, 1.0);
        assert_eq!(th.alarm_ms, 5.0);
        assert_eq!(th.lost_sync_seconds, 3.0);
        assert!(th.validate().is_ok());
    }

    #[test]
    fn test_thresholds_builder() {
        let th = Thresholds::new()
            .with_warn_ms(0.5)
            .with_alarm_ms(2.0)
            .with_lost_sync_seconds(10.0);

        assert_eq!(th.warn_ms, 0.5);
        assert_eq!(th.alarm_ms, 2.0);
        assert_eq!(th.lost_sync_seconds, 10.0);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(Thresholds::new().with_warn_ms(-1.0).validate().is_err());
        assert!(Thresholds::new().with_lost_sync_seconds(0.0).validate().is_err());
        assert!(Thresholds::new().with_alarm_ms(f64::NAN).validate().is_err());
        // Warn band above alarm band
        assert!(Thresholds::new().with_warn_ms(6.0).validate().is_err());
        // Equal bands are allowed: alarm always wins
        assert!(Thresholds::new().with_warn_ms(5.0).validate().is_ok());
    }

    #[test]
    fn test_follow_mode() {
        assert_eq!(FollowMode::from_start(true), FollowMode::Replay);
        assert_eq!(FollowMode::from_start(false), FollowMode::Tail);
        assert_eq!(FollowMode::default(), FollowMode::Tail);
    }
}
