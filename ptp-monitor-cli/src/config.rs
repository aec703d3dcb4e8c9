//! Configuration loading and merging
//!
//! Settings come from an optional TOML file and are overridden by command-line
//! flags. The log source path is the only required setting.

use anyhow::{bail, Context, Result};
use ptp_monitor::{FollowMode, Thresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration (loaded from monitor.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub from_start: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            from_start: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    pub event_log: Option<PathBuf>,
}

/// Values given on the command line; `None` falls back to the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log: Option<PathBuf>,
    pub event_log: Option<PathBuf>,
    pub warn_ms: Option<f64>,
    pub alarm_ms: Option<f64>,
    pub lost_sync_s: Option<f64>,
    pub from_start: bool,
    pub poll_interval_ms: Option<u64>,
}

/// Fully resolved settings for one monitoring session
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub log_path: PathBuf,
    pub event_log: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub mode: FollowMode,
    pub poll_interval: Duration,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Merge file configuration with command-line overrides
pub fn resolve(config: AppConfig, overrides: Overrides) -> Result<MonitorSettings> {
    let Some(log_path) = overrides.log.or(config.source.path) else {
        bail!("No log file given: pass --log or set [source] path in the config file");
    };

    let mut thresholds = config.thresholds;
    if let Some(warn_ms) = overrides.warn_ms {
        thresholds = thresholds.with_warn_ms(warn_ms);
    }
    if let Some(alarm_ms) = overrides.alarm_ms {
        thresholds = thresholds.with_alarm_ms(alarm_ms);
    }
    if let Some(lost_sync_s) = overrides.lost_sync_s {
        thresholds = thresholds.with_lost_sync_seconds(lost_sync_s);
    }
    thresholds.validate()?;

    let poll_interval_ms = overrides
        .poll_interval_ms
        .unwrap_or(config.source.poll_interval_ms);
    if poll_interval_ms == 0 {
        bail!("poll interval must be at least 1 ms");
    }

    Ok(MonitorSettings {
        log_path,
        event_log: overrides.event_log.or(config.output.event_log),
        thresholds,
        mode: FollowMode::from_start(overrides.from_start || config.source.from_start),
        poll_interval: Duration::from_millis(poll_interval_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [source]
            path = "/var/log/ptp4l.log"
            from_start = true

            [thresholds]
            warn_ms = 0.5

            [output]
            event_log = "events.jsonl"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.source.path, Some(PathBuf::from("/var/log/ptp4l.log")));
        assert!(config.source.from_start);
        assert_eq!(config.source.poll_interval_ms, 200);
        assert_eq!(config.thresholds.warn_ms, 0.5);
        assert_eq!(config.thresholds.alarm_ms, 5.0);
        assert_eq!(config.output.event_log, Some(PathBuf::from("events.jsonl")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.thresholds, Thresholds::default());
        assert!(config.source.path.is_none());
    }

    #[test]
    fn test_command_line_overrides_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [source]
            path = "from-file.log"
            poll_interval_ms = 50

            [thresholds]
            warn_ms = 2.0
            alarm_ms = 8.0
        "#,
        )
        .unwrap();
        let overrides = Overrides {
            log: Some(PathBuf::from("from-cli.log")),
            alarm_ms: Some(4.0),
            ..Overrides::default()
        };

        let settings = resolve(config, overrides).unwrap();
        assert_eq!(settings.log_path, PathBuf::from("from-cli.log"));
        assert_eq!(settings.thresholds.warn_ms, 2.0);
        assert_eq!(settings.thresholds.alarm_ms, 4.0);
        assert_eq!(settings.thresholds.lost_sync_seconds, 3.0);
        assert_eq!(settings.mode, FollowMode::Tail);
        assert_eq!(settings.poll_interval, Duration::from_millis(50));
        assert!(settings.event_log.is_none());
    }

    #[test]
    fn test_missing_log_path_is_an_error() {
        assert!(resolve(AppConfig::default(), Overrides::default()).is_err());
    }

    #[test]
    fn test_inconsistent_thresholds_rejected() {
        let overrides = Overrides {
            log: Some(PathBuf::from("ptp4l.log")),
            warn_ms: Some(9.0),
            ..Overrides::default()
        };
        assert!(resolve(AppConfig::default(), overrides).is_err());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(&path, "[source]\npath = \"ptp4l.log\"\nfrom_start = true\n").unwrap();

        let settings = resolve(load_config(&path).unwrap(), Overrides::default()).unwrap();
        assert_eq!(settings.mode, FollowMode::Replay);
        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
