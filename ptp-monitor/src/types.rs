//! Core types for the PTP log monitor library
//!
//! This module defines the records flowing through the monitoring pipeline:
//! measurements and port state transitions produced by the line parser, and
//! the events produced by the event engine. All of them are immutable once
//! constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Wall-clock timestamp in seconds since the Unix epoch
pub type Timestamp = f64;

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Current wall-clock time as epoch seconds (microsecond resolution)
pub fn now_utc() -> Timestamp {
    Utc::now().timestamp_micros() as f64 / 1e6
}

/// Convert epoch seconds to a UTC datetime
///
/// Returns `None` for values chrono cannot represent (NaN, out of range).
pub fn to_datetime(t_utc: Timestamp) -> Option<DateTime<Utc>> {
    if !t_utc.is_finite() {
        return None;
    }
    let micros = (t_utc * 1e6).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

/// Convert nanoseconds to milliseconds
pub fn ns_to_ms(ns: i64) -> f64 {
    ns as f64 / 1e6
}

/// Errors that can occur while monitoring
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Log source unavailable: {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Event log error: {0}")]
    EventLog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Servo state label as reported by ptp4l (`s0` .. `s9`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServoState(u8);

const SERVO_LABELS: [&str; 10] = ["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9"];

impl ServoState {
    /// State `s<index>`; `None` above `s9`
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < SERVO_LABELS.len()).then_some(Self(index))
    }

    /// Parse a state label such as `s2`
    pub fn from_label(label: &str) -> Option<Self> {
        SERVO_LABELS
            .iter()
            .position(|l| *l == label)
            .map(|index| Self(index as u8))
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// The label as it appears in the daemon log
    pub fn label(&self) -> &'static str {
        SERVO_LABELS[usize::from(self.0)]
    }

    /// True for `s0` and `s1`, the states that raise no `servo_state` notice
    pub fn is_nominal(&self) -> bool {
        self.0 <= 1
    }
}

impl fmt::Display for ServoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One servo report extracted from a log line
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Capture time (epoch seconds)
    pub t_utc: Timestamp,
    /// Offset from the reference clock in nanoseconds
    pub offset_ns: i64,
    /// Frequency adjustment in parts per billion
    pub freq_ppb: i64,
    /// Path delay in nanoseconds
    pub delay_ns: i64,
    /// Servo state at the time of the report
    pub state: ServoState,
}

impl Measurement {
    /// Offset converted to milliseconds (signed)
    pub fn offset_ms(&self) -> f64 {
        ns_to_ms(self.offset_ns)
    }
}

/// A port state change extracted from a log line
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    /// Capture time (epoch seconds)
    pub t_utc: Timestamp,
    /// Port number the transition was reported for
    pub port: u16,
    pub from_state: String,
    pub to_state: String,
    /// Event that triggered the transition (e.g. `MASTER_CLOCK_SELECTED`)
    pub reason: String,
}

/// Event severity, ordered `Info < Warn < Alarm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Alarm,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Alarm => "ALARM",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable event tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OffsetWarn,
    OffsetAlarm,
    ServoState,
    LostSync,
    PortState,
}

impl EventKind {
    /// All kinds, in reporting order
    pub const ALL: [EventKind; 5] = [
        EventKind::OffsetWarn,
        EventKind::OffsetAlarm,
        EventKind::ServoState,
        EventKind::LostSync,
        EventKind::PortState,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OffsetWarn => "offset_warn",
            EventKind::OffsetAlarm => "offset_alarm",
            EventKind::ServoState => "servo_state",
            EventKind::LostSync => "lost_sync",
            EventKind::PortState => "port_state",
        }
    }

    /// Look up a kind by its tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A health event emitted by the monitor
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub t_utc: Timestamp,
    pub severity: Severity,
    pub kind: EventKind,
    /// Human-readable description
    pub message: String,
}

impl Event {
    pub fn new(t_utc: Timestamp, severity: Severity, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            t_utc,
            severity,
            kind,
            message: message.into(),
        }
    }

    /// INFO `port_state` event describing a transition
    pub fn port_state(transition: &StateTransition) -> Self {
        Self::new(
            transition.t_utc,
            Severity::Info,
            EventKind::PortState,
            format!(
                "{} -> {} ({})",
                transition.from_state, transition.to_state, transition.reason
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Alarm);
        assert_eq!(Severity::Alarm.to_string(), "ALARM");
    }

    #[test]
    fn test_servo_state_labels() {
        for (index, label) in SERVO_LABELS.iter().enumerate() {
            let state = ServoState::from_label(label).unwrap();
            assert_eq!(state.label(), *label);
            assert_eq!(usize::from(state.index()), index);
        }
        assert_eq!(ServoState::from_label("s10"), None);
        assert_eq!(ServoState::from_label("S2"), None);
        assert_eq!(ServoState::new(10), None);
    }

    #[test]
    fn test_servo_nominal_states() {
        assert!(ServoState::new(0).unwrap().is_nominal());
        assert!(ServoState::new(1).unwrap().is_nominal());
        for index in 2..=9 {
            assert!(!ServoState::new(index).unwrap().is_nominal(), "s{}", index);
        }
    }

    #[test]
    fn test_event_kind_tags() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_tag("clock_jump"), None);
    }

    #[test]
    fn test_to_datetime() {
        let dt = to_datetime(100.5).unwrap();
        assert_eq!(dt.timestamp(), 100);
        assert_eq!(dt.timestamp_subsec_micros(), 500_000);
        assert!(to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn test_port_state_event_message() {
        let transition = StateTransition {
            t_utc: 5.0,
            port: 1,
            from_state: "UNCALIBRATED".to_string(),
            to_state: "SLAVE".to_string(),
            reason: "MASTER_CLOCK_SELECTED".to_string(),
        };
        let event = Event::port_state(&transition);
        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.kind, EventKind::PortState);
        assert_eq!(event.message, "UNCALIBRATED -> SLAVE (MASTER_CLOCK_SELECTED)");
    }
}
