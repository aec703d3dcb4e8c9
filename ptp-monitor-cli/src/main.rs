//! PTP Log Monitor CLI Application
//!
//! This is the command-line interface for the PTP log monitor.
//! It uses the ptp-monitor library and adds:
//! - Command-line and config file handling
//! - Console reporting of live events
//! - Ctrl+C handling with a clean shutdown
//! - Offline analysis of a durable event log

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ptp_monitor::{analysis, read_events, CancelToken, EventKind, EventLog, LogFollower, Monitor};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod report;

/// PTP Log Monitor - Watch ptp4l logs and raise timing health events
#[derive(Parser, Debug)]
#[command(name = "ptp-monitor")]
#[command(about = "Monitor ptp4l logs for offset drift and loss of sync", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all diagnostics except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow a ptp4l log and report events
    Monitor(MonitorArgs),
    /// Summarise an event log written by `monitor`
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Path to the ptp4l log file
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Path of the event log to append events to
    #[arg(long, value_name = "FILE")]
    event_log: Option<PathBuf>,

    /// Offset warning threshold in milliseconds [default: 1.0]
    #[arg(long, value_name = "MS")]
    warn_ms: Option<f64>,

    /// Offset alarm threshold in milliseconds [default: 5.0]
    #[arg(long, value_name = "MS")]
    alarm_ms: Option<f64>,

    /// Seconds without servo reports before sync is considered lost [default: 3.0]
    #[arg(long, value_name = "SECONDS")]
    lost_sync_s: Option<f64>,

    /// Process the whole file from the beginning instead of tailing new lines
    #[arg(long)]
    from_start: bool,

    /// Poll interval while waiting for new lines [default: 200]
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Path to configuration file (monitor.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl MonitorArgs {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            log: self.log.clone(),
            event_log: self.event_log.clone(),
            warn_ms: self.warn_ms,
            alarm_ms: self.alarm_ms,
            lost_sync_s: self.lost_sync_s,
            from_start: self.from_start,
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Path to the event log file
    #[arg(short, long, value_name = "FILE")]
    log: PathBuf,

    /// Only list events of this kind (e.g. offset_alarm, lost_sync)
    #[arg(long, value_name = "KIND", value_parser = parse_kind)]
    filter: Option<EventKind>,

    /// Export the offset series to a CSV file
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn parse_kind(tag: &str) -> std::result::Result<EventKind, String> {
    EventKind::from_tag(tag).ok_or_else(|| {
        let known: Vec<&str> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown event kind '{}' (expected one of: {})", tag, known.join(", "))
    })
}

fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    log::debug!("PTP Log Monitor CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using monitor library v{}", ptp_monitor::VERSION);

    match cli.command {
        Command::Monitor(args) => run_monitor(&args),
        Command::Analyze(args) => run_analyze(&args),
    }
}

/// Live monitoring - follow the log until it ends or Ctrl+C
fn run_monitor(args: &MonitorArgs) -> Result<ExitCode> {
    let file_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };
    let settings = config::resolve(file_config, args.overrides())?;
    log::debug!("Resolved settings: {:?}", settings);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("Failed to set Ctrl+C handler")?;

    let mut follower = LogFollower::open(&settings.log_path, settings.mode)
        .with_context(|| format!("Cannot monitor log file {:?}", settings.log_path))?
        .with_poll_interval(settings.poll_interval)
        .with_cancel_token(cancel.clone());

    let mut monitor = Monitor::new(settings.thresholds)?.with_sink(Box::new(report::ConsoleReporter::stdout()));
    if let Some(path) = &settings.event_log {
        let event_log = EventLog::open(path).with_context(|| format!("Cannot open event log {:?}", path))?;
        monitor = monitor.with_sink(Box::new(event_log));
    }

    log::info!(
        "Monitoring {:?} (warn {} ms, alarm {} ms, lost sync {} s)",
        settings.log_path,
        settings.thresholds.warn_ms,
        settings.thresholds.alarm_ms,
        settings.thresholds.lost_sync_seconds
    );

    let stats = monitor.run(&mut follower)?;

    if cancel.is_cancelled() {
        println!("\nMonitoring stopped.");
    }
    log::info!(
        "Processed {} lines: {} servo reports, {} port transitions, {} events",
        stats.lines,
        stats.measurements,
        stats.transitions,
        stats.events
    );
    Ok(ExitCode::SUCCESS)
}

/// Offline analysis - summarise an event log and export the offset series
fn run_analyze(args: &AnalyzeArgs) -> Result<ExitCode> {
    let events = read_events(&args.log)
        .with_context(|| format!("Failed to read event log: {:?}", args.log))?;
    let series = analysis::offset_series(&events);

    if series.is_empty() {
        println!("No offset events found in {:?}", args.log);
        return Ok(ExitCode::FAILURE);
    }

    let summary = analysis::EventSummary::from_events(&events);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let stdout = std::io::stdout();
        report::write_summary(&mut stdout.lock(), &args.log, &summary)?;
    }

    if let Some(kind) = args.filter {
        let matching = analysis::filter_by_kind(&events, kind);
        println!("\nFound {} {} events", matching.len(), kind);
        for event in &matching {
            println!("  {}", report::format_event(event));
        }
    }

    if let Some(csv_path) = &args.csv {
        report::export_series_csv(csv_path, &series)?;
        println!("\n✓ Wrote {} offset samples to {:?}", series.len(), csv_path);
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
