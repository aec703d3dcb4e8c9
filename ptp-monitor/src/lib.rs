//! PTP Log Monitor Library
//!
//! Watches the text log of a running ptp4l daemon and turns it into health
//! events: offset warnings and alarms, servo state notices, port state
//! changes and loss-of-sync alarms.
//!
//! # Architecture
//!
//! The pipeline runs strictly in order, one line at a time:
//! - [`LogFollower`] yields complete lines from a growing file (replay or tail)
//! - [`parser`] turns a line into a [`Measurement`] or [`StateTransition`]
//! - [`EventEngine`] applies thresholds and detects prolonged silence
//! - [`Monitor`] hands resulting events to its sinks, such as the durable
//!   [`EventLog`] (one JSON record per line, see [`codec`])
//!
//! Every piece of state lives in a constructed value owned by the caller, so
//! several logs can be monitored side by side with one monitor each.
//!
//! The library does NOT:
//! - Parse command-line arguments or config files
//! - Render reports or plots
//!
//! # Example Usage
//!
//! ```no_run
//! use ptp_monitor::{EventLog, FollowMode, LogFollower, Monitor, Thresholds};
//! use std::path::Path;
//!
//! let thresholds = Thresholds::new().with_warn_ms(0.5).with_alarm_ms(2.0);
//! let event_log = EventLog::open(Path::new("events.jsonl")).unwrap();
//! let mut monitor = Monitor::new(thresholds).unwrap().with_sink(Box::new(event_log));
//!
//! let mut follower = LogFollower::open(Path::new("/var/log/ptp4l.log"), FollowMode::Replay).unwrap();
//! let stats = monitor.run(&mut follower).unwrap();
//! println!("{} measurements, {} events", stats.measurements, stats.events);
//! ```

// Public modules
pub mod analysis;
pub mod codec;
pub mod config;
pub mod engine;
pub mod follower;
pub mod monitor;
pub mod parser;
pub mod types;

// Re-export main types for convenience
pub use analysis::{EventSummary, OffsetSeries};
pub use codec::{read_events, EventLog};
pub use config::{FollowMode, Thresholds, DEFAULT_POLL_INTERVAL};
pub use engine::{EventEngine, SyncStatus};
pub use follower::{CancelToken, LogFollower, ReadEvent, DEFAULT_MAX_LINE_LEN};
pub use monitor::{EventSink, Monitor, SessionStats};
pub use parser::ParsedLine;
pub use types::{
    Event, EventKind, Measurement, MonitorError, Result, ServoState, Severity,
    StateTransition, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
