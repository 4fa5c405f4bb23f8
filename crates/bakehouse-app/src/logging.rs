//! Logging and tracing setup for the Bakehouse binary
//!
//! Built on `tracing-subscriber`:
//! - Pretty console output for development, JSON files for production
//! - Daily file rotation through `tracing-appender`
//! - `RUST_LOG` takes precedence over the configured filter

use bakehouse_settings::{LogProfile, LogSettings};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "bakehouse.log";

const DEVELOPMENT_FILTER: &str = "info,bakehouse_app=debug,bakehouse_data=debug,bakehouse_gateway=debug,bakehouse_drivers=debug,bakehouse_driver_sqlite=debug,bakehouse_driver_mssql=debug";

const PRODUCTION_FILTER: &str =
    "warn,bakehouse_app=info,bakehouse_data=info,bakehouse_gateway=warn,bakehouse_drivers=info";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Directory where log files are written
    pub log_dir: PathBuf,

    /// Write JSON lines to a daily-rolled file
    pub enable_json_logs: bool,

    /// Write human-readable output to stderr
    pub enable_console_logs: bool,

    /// Include file and line in console output
    pub include_location: bool,

    /// Log span open/close events
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl LoggingConfig {
    /// Verbose console output, no files
    pub fn development(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: true,
            enable_spans: true,
            default_filter: DEVELOPMENT_FILTER.to_string(),
        }
    }

    /// Quiet console, JSON files for support requests
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            enable_json_logs: true,
            enable_console_logs: true,
            include_location: false,
            enable_spans: false,
            default_filter: PRODUCTION_FILTER.to_string(),
        }
    }

    pub fn from_settings(settings: &LogSettings) -> anyhow::Result<Self> {
        let log_dir = settings.log_dir()?;
        let mut config = match settings.profile {
            LogProfile::Development => Self::development(log_dir),
            LogProfile::Production => Self::production(log_dir),
        };
        if settings.json_file {
            config.enable_json_logs = true;
        }
        if !settings.filter.trim().is_empty() {
            config.default_filter = settings.filter.clone();
        }
        Ok(config)
    }

    /// Raise the console to debug output regardless of profile
    pub fn verbose(mut self) -> Self {
        self.default_filter = DEVELOPMENT_FILTER.to_string();
        self.enable_console_logs = true;
        self
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped; hold it until
/// the program exits.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    // NEW rather than ENTER: async spans are re-entered on every poll.
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .pretty()
            .with_filter(env_filter.clone())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        console_enabled = config.enable_console_logs,
        "logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_development_config() {
        let config = LoggingConfig::development(PathBuf::from("/tmp/logs"));
        assert!(config.enable_console_logs);
        assert!(!config.enable_json_logs);
        assert!(config.include_location);
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production(PathBuf::from("/tmp/logs"));
        assert!(config.enable_json_logs);
        assert!(!config.include_location);
        assert!(config.default_filter.starts_with("warn"));
    }

    #[test]
    fn test_settings_choose_profile_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            profile: LogProfile::Production,
            filter: "bakehouse_data=trace".into(),
            json_file: false,
            directory: Some(dir.path().to_path_buf()),
        };
        let config = LoggingConfig::from_settings(&settings).unwrap();
        assert_eq!(config.log_dir, dir.path());
        assert!(config.enable_json_logs);
        assert_eq!(config.default_filter, "bakehouse_data=trace");
    }

    #[test]
    fn test_json_file_can_be_enabled_in_development() {
        let settings = LogSettings {
            json_file: true,
            directory: Some(PathBuf::from("/tmp/logs")),
            ..Default::default()
        };
        let config = LoggingConfig::from_settings(&settings).unwrap();
        assert!(config.enable_json_logs);
        assert_eq!(config.default_filter, DEVELOPMENT_FILTER);
    }

    #[test]
    fn test_verbose_overrides_quiet_profile() {
        let config = LoggingConfig::production(PathBuf::from("/tmp/logs")).verbose();
        assert_eq!(config.default_filter, DEVELOPMENT_FILTER);
    }
}
