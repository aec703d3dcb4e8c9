//! Console reporting
//!
//! Live events are printed one per line; the `analyze` command renders an
//! event log summary as text or JSON and can export the offset series as CSV.

use anyhow::{Context, Result};
use ptp_monitor::analysis::{EventSummary, OffsetSeries};
use ptp_monitor::codec::format_timestamp;
use ptp_monitor::{Event, EventSink, Severity};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Prints each event as `<timestamp> [<SEVERITY>] <kind>: <message>`
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

/// Render one event for the console
pub fn format_event(event: &Event) -> String {
    let ts = format_timestamp(event.t_utc).unwrap_or_else(|| format!("{}", event.t_utc));
    format!("{} [{}] {}: {}", ts, event.severity, event.kind, event.message)
}

impl<W: Write> EventSink for ConsoleReporter<W> {
    fn emit(&mut self, event: &Event) -> ptp_monitor::Result<()> {
        writeln!(self.out, "{}", format_event(event))?;
        self.out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> ptp_monitor::Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Human-readable summary of an event log
pub fn write_summary<W: Write>(out: &mut W, source: &Path, summary: &EventSummary) -> io::Result<()> {
    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  PTP Event Log Summary")?;
    writeln!(out, "═══════════════════════════════════════════════\n")?;
    writeln!(out, "Source: {:?}", source)?;
    writeln!(out, "Events: {}", summary.total)?;

    if let (Some(first), Some(last)) = (summary.first_t, summary.last_t) {
        let span = |t| format_timestamp(t).unwrap_or_else(|| format!("{}", t));
        writeln!(out, "Span:   {} .. {} ({:.1}s)", span(first), span(last), last - first)?;
    }

    writeln!(out, "\nBy severity:")?;
    for severity in [Severity::Alarm, Severity::Warn, Severity::Info] {
        let count = summary.by_severity.get(severity.as_str()).copied().unwrap_or(0);
        writeln!(out, "  {:<6} {}", severity, count)?;
    }

    writeln!(out, "\nBy kind:")?;
    for (kind, count) in &summary.by_kind {
        writeln!(out, "  {:<13} {}", kind, count)?;
    }

    writeln!(out, "\nOffset samples: {}", summary.offset_samples)?;
    if let (Some(min), Some(max), Some(mean)) =
        (summary.offset_min_ms, summary.offset_max_ms, summary.offset_mean_ms)
    {
        writeln!(out, "  min  {:.3} ms", min)?;
        writeln!(out, "  max  {:.3} ms", max)?;
        writeln!(out, "  mean {:.3} ms", mean)?;
    }
    Ok(())
}

/// Write the offset series as CSV (`t_rel_s,t_utc,offset_ms`)
pub fn write_series_csv<W: Write>(out: &mut W, series: &OffsetSeries) -> io::Result<()> {
    writeln!(out, "t_rel_s,t_utc,offset_ms")?;
    for ((t_rel, offset_ms), t_utc) in series.relative_points().into_iter().zip(&series.t) {
        writeln!(out, "{:.6},{:.6},{:.3}", t_rel, t_utc, offset_ms)?;
    }
    Ok(())
}

/// Export the offset series to a CSV file
pub fn export_series_csv(path: &Path, series: &OffsetSeries) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    let mut out = BufWriter::new(file);
    write_series_csv(&mut out, series)
        .and_then(|_| out.flush())
        .with_context(|| format!("Failed to write CSV file: {:?}", path))?;
    Ok(())
}
