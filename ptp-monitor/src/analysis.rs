//! Offline analysis of a durable event log
//!
//! Recovers the offset-vs-time series from offset warning and alarm events
//! and summarises an event stream by severity and kind.

use crate::types::{Event, EventKind, Severity, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// Offset samples recovered from offset events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OffsetSeries {
    pub t: Vec<Timestamp>,
    pub offset_ms: Vec<f64>,
}

impl OffsetSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, t_utc: Timestamp, offset_ms: f64) {
        self.t.push(t_utc);
        self.offset_ms.push(offset_ms);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Pairs of (seconds since the first sample, offset in ms)
    pub fn relative_points(&self) -> Vec<(f64, f64)> {
        let Some(&t0) = self.t.first() else {
            return Vec::new();
        };
        self.t
            .iter()
            .zip(&self.offset_ms)
            .map(|(&t, &offset)| (t - t0, offset))
            .collect()
    }

    pub fn min(&self) -> Option<f64> {
        self.offset_ms.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.offset_ms.iter().copied().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.offset_ms.iter().sum::<f64>() / self.len() as f64)
    }
}

/// Parse the offset out of a message like `Offset 2.000 ms >= 1.0 ms`
pub fn parse_offset_message(message: &str) -> Option<f64> {
    let mut parts = message.split_whitespace();
    if parts.next()? != "Offset" {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Build the offset series from `offset_warn` and `offset_alarm` events
///
/// Only offsets beyond the warn threshold are persisted, so the series is
/// sparse by nature.
pub fn offset_series(events: &[Event]) -> OffsetSeries {
    let mut series = OffsetSeries::new();
    for event in events {
        if !matches!(event.kind, EventKind::OffsetWarn | EventKind::OffsetAlarm) {
            continue;
        }
        match parse_offset_message(&event.message) {
            Some(offset_ms) => series.add(event.t_utc, offset_ms),
            None => log::debug!("No offset in message: {:?}", event.message),
        }
    }
    series
}

/// Events of one kind, in log order
pub fn filter_by_kind(events: &[Event], kind: EventKind) -> Vec<Event> {
    events.iter().filter(|e| e.kind == kind).cloned().collect()
}

/// Aggregate view of an event stream
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventSummary {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
    pub first_t: Option<Timestamp>,
    pub last_t: Option<Timestamp>,
    pub offset_samples: usize,
    pub offset_min_ms: Option<f64>,
    pub offset_max_ms: Option<f64>,
    pub offset_mean_ms: Option<f64>,
}

impl EventSummary {
    pub fn from_events(events: &[Event]) -> Self {
        let mut summary = Self {
            total: events.len(),
            ..Self::default()
        };
        for event in events {
            *summary
                .by_severity
                .entry(event.severity.to_string())
                .or_insert(0) += 1;
            *summary.by_kind.entry(event.kind.to_string()).or_insert(0) += 1;
            summary.first_t = Some(summary.first_t.map_or(event.t_utc, |t| t.min(event.t_utc)));
            summary.last_t = Some(summary.last_t.map_or(event.t_utc, |t| t.max(event.t_utc)));
        }
        let series = offset_series(events);
        summary.offset_samples = series.len();
        summary.offset_min_ms = series.min();
        summary.offset_max_ms = series.max();
        summary.offset_mean_ms = series.mean();
        summary
    }

    /// Number of events at or above `severity`
    pub fn at_least(&self, severity: Severity) -> usize {
        [Severity::Info, Severity::Warn, Severity::Alarm]
            .into_iter()
            .filter(|s| *s >= severity)
            .filter_map(|s| self.by_severity.get(s.as_str()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<Event> {
        vec![
            Event::new(10.0, Severity::Warn, EventKind::OffsetWarn, "Offset 2.000 ms >= 1.0 ms"),
            Event::new(11.0, Severity::Info, EventKind::ServoState, "Servo state s0"),
            Event::new(12.0, Severity::Alarm, EventKind::OffsetAlarm, "Offset 6.500 ms >= 5.0 ms"),
            Event::new(16.0, Severity::Alarm, EventKind::LostSync, "No servo updates for 4.0s (>= 3s)"),
            Event::new(17.0, Severity::Warn, EventKind::OffsetWarn, "garbled"),
        ]
    }

    #[test]
    fn test_parse_offset_message() {
        assert_eq!(parse_offset_message("Offset 0.123 ms >= 0.1 ms"), Some(0.123));
        assert_eq!(parse_offset_message("Servo state s0"), None);
        assert_eq!(parse_offset_message("Offset"), None);
        assert_eq!(parse_offset_message("Offset abc ms"), None);
    }

    #[test]
    fn test_offset_series() {
        let series = offset_series(&events());
        assert_eq!(series.t, vec![10.0, 12.0]);
        assert_eq!(series.offset_ms, vec![2.0, 6.5]);
        assert_eq!(series.relative_points(), vec![(0.0, 2.0), (2.0, 6.5)]);
        assert_eq!(series.min(), Some(2.0));
        assert_eq!(series.max(), Some(6.5));
        assert_eq!(series.mean(), Some(4.25));
    }

    #[test]
    fn test_empty_series() {
        let series = offset_series(&[]);
        assert!(series.is_empty());
        assert!(series.relative_points().is_empty());
        assert_eq!(series.mean(), None);
    }

    #[test]
    fn test_filter_by_kind() {
        let alarms = filter_by_kind(&events(), EventKind::OffsetAlarm);
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].t_utc, 12.0);
        assert!(filter_by_kind(&events(), EventKind::PortState).is_empty());
    }

    #[test]
    fn test_summary() {
        let summary = EventSummary::from_events(&events());
        assert_eq!(summary.total, 5);
        assert_eq!(summary.by_severity["WARN"], 2);
        assert_eq!(summary.by_severity["ALARM"], 2);
        assert_eq!(summary.by_kind["offset_warn"], 2);
        assert_eq!(summary.first_t, Some(10.0));
        assert_eq!(summary.last_t, Some(17.0));
        assert_eq!(summary.offset_samples, 2);
        assert_eq!(summary.at_least(Severity::Warn), 4);
        assert_eq!(summary.at_least(Severity::Info), 5);
    }
}
