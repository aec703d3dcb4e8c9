//! Durable event log codec
//!
//! Each event is stored as one JSON object per line:
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.250000Z","t_utc":1714564800.25,"severity":"WARN","kind":"offset_warn","message":"Offset 2.000 ms >= 1.0 ms"}
//! ```
//!
//! `timestamp` is informational; `t_utc` is the authoritative value restored on
//! decode. Readers skip blank, malformed and truncated lines so a crash in the
//! middle of a write never makes the rest of the file unreadable.

use crate::types::{to_datetime, Event, EventKind, MonitorError, Result, Severity, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

/// On-disk shape of one event
#[derive(Debug, Serialize, Deserialize)]
struct EventRecord {
    timestamp: String,
    t_utc: Timestamp,
    severity: Severity,
    kind: EventKind,
    message: String,
}

/// Format epoch seconds as ISO-8601 UTC with microseconds and a `Z` suffix
pub fn format_timestamp(t_utc: Timestamp) -> Option<String> {
    to_datetime(t_utc).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
}

/// Encode an event as a single JSON line (without the trailing newline)
///
/// Fails only for timestamps that cannot be represented (NaN, infinite or
/// outside chrono's range).
pub fn encode(event: &Event) -> Result<String> {
    let timestamp = format_timestamp(event.t_utc).ok_or_else(|| {
        MonitorError::EventLog(format!("timestamp {} cannot be encoded", event.t_utc))
    })?;
    let record = EventRecord {
        timestamp,
        t_utc: event.t_utc,
        severity: event.severity,
        kind: event.kind,
        message: event.message.clone(),
    };
    Ok(serde_json::to_string(&record)?)
}

/// Decode one line produced by [`encode`]
///
/// Returns `None` for anything that is not a complete, well-formed record.
pub fn decode(line: &str) -> Option<Event> {
    let record: EventRecord = serde_json::from_str(line.trim()).ok()?;
    if !record.t_utc.is_finite() {
        return None;
    }
    Some(Event {
        t_utc: record.t_utc,
        severity: record.severity,
        kind: record.kind,
        message: record.message,
    })
}

/// Decode every record from a reader, skipping lines that do not decode
pub fn read_events_from<R: BufRead>(mut reader: R) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        match decode(&line) {
            Some(event) => events.push(event),
            None => log::warn!("Skipping malformed event record at line {}", line_no),
        }
    }
    Ok(events)
}

/// Read all events from an event log file
///
/// A missing file yields an empty list.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Event log {:?} does not exist yet", path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let events = read_events_from(io::BufReader::new(file))?;
    log::info!("Read {} events from {:?}", events.len(), path);
    Ok(events)
}

/// Append-only writer for the durable event log
///
/// Every append is flushed before returning, so an abrupt stop loses at
/// most the event being written.
pub struct EventLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl EventLog {
    /// Open (or create) an event log for appending, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                MonitorError::EventLog(format!("cannot create directory {:?}: {}", parent, e))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| MonitorError::EventLog(format!("cannot open {:?}: {}", path, e)))?;
        log::info!("Writing events to {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event and flush it to disk
    pub fn append(&mut self, event: &Event) -> Result<()> {
        let line = encode(event)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
