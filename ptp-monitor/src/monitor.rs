//! Monitoring session
//!
//! Wires the pipeline together: follower lines go through the parser, parsed
//! records go through the event engine, and every resulting event is handed to
//! the registered sinks in order. Everything runs on the caller's thread, one
//! line at a time, so events always come out in input order.

use crate::codec::EventLog;
use crate::config::Thresholds;
use crate::engine::{EventEngine, SyncStatus};
use crate::follower::{LogFollower, ReadEvent};
use crate::parser::{parse_line, ParsedLine};
use crate::types::{now_utc, Event, Result, Timestamp};
use std::io::{Read, Seek};

/// Destination for emitted events
pub trait EventSink {
    fn emit(&mut self, event: &Event) -> Result<()>;

    /// Push buffered output to its destination
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &Event) -> Result<()> {
        self.append(event)
    }

    fn flush(&mut self) -> Result<()> {
        EventLog::flush(self)
    }
}

/// Counters for one monitoring session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub lines: usize,
    pub measurements: usize,
    pub transitions: usize,
    pub unrecognized: usize,
    pub events: usize,
}

/// One monitored log stream: an engine plus its event sinks
pub struct Monitor {
    engine: EventEngine,
    sinks: Vec<Box<dyn EventSink>>,
    stats: SessionStats,
}

impl Monitor {
    /// Create a monitor, rejecting inconsistent thresholds
    pub fn new(thresholds: Thresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self {
            engine: EventEngine::new(thresholds),
            sinks: Vec::new(),
            stats: SessionStats::default(),
        })
    }

    /// Builder method: register a sink; sinks receive events in registration order
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn status(&self) -> SyncStatus {
        self.engine.status()
    }

    /// Process one raw log line observed at `now`
    ///
    /// Returns the events emitted for this line, including a lost-sync alarm
    /// if the silence check fires.
    pub fn process_line(&mut self, line: &str, now: Timestamp) -> Result<Vec<Event>> {
        self.stats.lines += 1;
        let mut events = match parse_line(line, now) {
            Some(ParsedLine::Measurement(m)) => {
                self.stats.measurements += 1;
                log::trace!("Servo: offset {} ns, state {}", m.offset_ns, m.state);
                self.engine.on_measurement(&m)
            }
            Some(ParsedLine::Transition(t)) => {
                self.stats.transitions += 1;
                log::debug!("Port {}: {} -> {}", t.port, t.from_state, t.to_state);
                vec![Event::port_state(&t)]
            }
            None => {
                self.stats.unrecognized += 1;
                log::trace!("Ignoring line: {}", line);
                Vec::new()
            }
        };
        events.extend(self.engine.check_lost_sync(now));
        self.dispatch(&events)?;
        Ok(events)
    }

    /// Run the silence check without a new line
    pub fn tick(&mut self, now: Timestamp) -> Result<Option<Event>> {
        let lost = self.engine.check_lost_sync(now);
        if let Some(event) = &lost {
            self.dispatch(std::slice::from_ref(event))?;
        }
        Ok(lost)
    }

    /// Follow a source until it ends, using the wall clock
    pub fn run<R: Read + Seek>(&mut self, follower: &mut LogFollower<R>) -> Result<SessionStats> {
        self.run_with_clock(follower, now_utc)
    }

    /// Follow a source until it ends, timestamping with `clock`
    ///
    /// Returns when replay is exhausted or the follower's cancel token fires.
    /// Sinks are flushed before returning.
    pub fn run_with_clock<R, C>(&mut self, follower: &mut LogFollower<R>, mut clock: C) -> Result<SessionStats>
    where
        R: Read + Seek,
        C: FnMut() -> Timestamp,
    {
        log::info!("Monitoring session started ({:?} mode)", follower.mode());
        let outcome = self.follow(follower, &mut clock);
        let flushed = self.flush();
        outcome?;
        flushed?;
        log::info!(
            "Monitoring session ended: {} lines, {} measurements, {} events",
            self.stats.lines,
            self.stats.measurements,
            self.stats.events
        );
        Ok(self.stats)
    }

    fn follow<R, C>(&mut self, follower: &mut LogFollower<R>, clock: &mut C) -> Result<()>
    where
        R: Read + Seek,
        C: FnMut() -> Timestamp,
    {
        loop {
            match follower.read_next()? {
                ReadEvent::Line(line) => {
                    self.process_line(&line, clock())?;
                }
                ReadEvent::Idle => {
                    self.tick(clock())?;
                }
                ReadEvent::End => return Ok(()),
            }
        }
    }

    /// Flush every sink
    pub fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    fn dispatch(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            self.stats.events += 1;
            for sink in &mut self.sinks {
                sink.emit(event)?;
            }
        }
        Ok(())
    }
}
