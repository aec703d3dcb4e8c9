//! ptp4l log line parser
//!
//! Turns raw log lines into typed records. Two line shapes are recognised:
//!
//! - servo reports: `... offset -1234 s2 freq +12 path delay 456`
//! - port state transitions: `port 1: UNCALIBRATED to SLAVE on MASTER_CLOCK_SELECTED`
//!   (newer linuxptp also prints the interface: `port 1 (eth0): ...`)
//!
//! Everything else is ignored. Parsing is stateless and never fails: a line
//! that does not match, or whose numbers do not fit, simply yields `None`.

use crate::types::{Measurement, ServoState, StateTransition, Timestamp};
use regex::Regex;
use std::sync::LazyLock;

static SERVO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"offset\s+(?P<offset>[+-]?\d+)\s+(?P<state>s\d)\s+freq\s+(?P<freq>[+-]?\d+)\s+path\s+delay\s+(?P<delay>[+-]?\d+)",
    )
    .expect("servo pattern is valid")
});

static PORT_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"port\s+(?P<port>\d+)(?:\s+\([^)]*\))?:\s+(?P<from>\w+)\s+to\s+(?P<to>\w+)\s+on\s+(?P<reason>.+)$",
    )
    .expect("port state pattern is valid")
});

/// A recognised log line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Measurement(Measurement),
    Transition(StateTransition),
}

/// Extract a servo measurement from a line
pub fn parse_measurement(line: &str, t_utc: Timestamp) -> Option<Measurement> {
    let caps = SERVO_RE.captures(line)?;
    Some(Measurement {
        t_utc,
        offset_ns: caps["offset"].parse().ok()?,
        freq_ppb: caps["freq"].parse().ok()?,
        delay_ns: caps["delay"].parse().ok()?,
        state: ServoState::from_label(&caps["state"])?,
    })
}

/// Extract a port state transition from a line
pub fn parse_transition(line: &str, t_utc: Timestamp) -> Option<StateTransition> {
    let caps = PORT_STATE_RE.captures(line)?;
    Some(StateTransition {
        t_utc,
        port: caps["port"].parse().ok()?,
        from_state: caps["from"].to_string(),
        to_state: caps["to"].to_string(),
        reason: caps["reason"].trim().to_string(),
    })
}

/// Classify a line, trying the measurement shape first
pub fn parse_line(line: &str, t_utc: Timestamp) -> Option<ParsedLine> {
    if let Some(measurement) = parse_measurement(line, t_utc) {
        return Some(ParsedLine::Measurement(measurement));
    }
    parse_transition(line, t_utc).map(ParsedLine::Transition)
}
