//! Event engine
//!
//! Evaluates servo measurements against the configured thresholds and watches
//! for prolonged silence. The engine is a small state machine:
//!
//! ```text
//! NoData --measurement--> Synced --silence >= threshold--> LostSync
//!                           ^                                 |
//!                           +----------measurement------------+
//! ```
//!
//! Each engine owns its state exclusively; independent log streams use
//! independent engines.

use crate::config::Thresholds;
use crate::types::{Event, EventKind, Measurement, Severity, Timestamp};

/// Sync status derived from the engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No measurement seen yet
    NoData,
    Synced,
    /// Silence exceeded the threshold; cleared by the next measurement
    LostSync,
}

/// Stateful threshold and silence evaluator
#[derive(Debug, Clone)]
pub struct EventEngine {
    thresholds: Thresholds,
    last_measurement_t: Option<Timestamp>,
    lost_sync_active: bool,
}

impl EventEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            last_measurement_t: None,
            lost_sync_active: false,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Timestamp of the most recent measurement, if any
    pub fn last_measurement(&self) -> Option<Timestamp> {
        self.last_measurement_t
    }

    pub fn status(&self) -> SyncStatus {
        match (self.last_measurement_t, self.lost_sync_active) {
            (None, _) => SyncStatus::NoData,
            (Some(_), false) => SyncStatus::Synced,
            (Some(_), true) => SyncStatus::LostSync,
        }
    }

    /// Evaluate a measurement
    ///
    /// Emits at most one offset event (alarm takes precedence over warn)
    /// followed by at most one `servo_state` event when the servo state is
    /// outside `s0`/`s1`.
    pub fn on_measurement(&mut self, m: &Measurement) -> Vec<Event> {
        let mut events = Vec::new();
        if self.lost_sync_active {
            log::info!("Servo reports resumed at {:.3}", m.t_utc);
        }
        self.last_measurement_t = Some(m.t_utc);
        self.lost_sync_active = false;

        let offset_ms = m.offset_ms().abs();
        if offset_ms >= self.thresholds.alarm_ms {
            events.push(Event::new(
                m.t_utc,
                Severity::Alarm,
                EventKind::OffsetAlarm,
                format!("Offset {:.3} ms >= {:?} ms", offset_ms, self.thresholds.alarm_ms),
            ));
        } else if offset_ms >= self.thresholds.warn_ms {
            events.push(Event::new(
                m.t_utc,
                Severity::Warn,
                EventKind::OffsetWarn,
                format!("Offset {:.3} ms >= {:?} ms", offset_ms, self.thresholds.warn_ms),
            ));
        }

        if !m.state.is_nominal() {
            events.push(Event::new(
                m.t_utc,
                Severity::Info,
                EventKind::ServoState,
                format!("Servo state {}", m.state),
            ));
        }
        events
    }

    /// Check for loss of sync at time `now`
    ///
    /// Raises a single `lost_sync` alarm per outage; repeated checks during the
    /// same outage return `None`.
    pub fn check_lost_sync(&mut self, now: Timestamp) -> Option<Event> {
        let last = self.last_measurement_t?;
        let elapsed = now - last;
        if elapsed < self.thresholds.lost_sync_seconds || self.lost_sync_active {
            return None;
        }
        self.lost_sync_active = true;
        Some(Event::new(
            now,
            Severity::Alarm,
            EventKind::LostSync,
            format!(
                "No servo updates for {:.1}s (>= {:?}s)",
                elapsed, self.thresholds.lost_sync_seconds
            ),
        ))
    }
}
