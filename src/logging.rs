/// Structured logging for the sensor dashboard
///
/// Provides context-rich logging tagged with the component that produced
/// the message and an optional context id (route, sensor key). Installed as
/// the `log` crate backend so records from dependencies land in the same
/// console/file output.

use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::OnceLock;

use crate::model::DashboardError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses a config value; unknown names fall back to `Info`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }

    fn from_record(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug | log::Level::Trace => LogLevel::Debug,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Http,
    Database,
    Chart,
    System,
}

impl Component {
    /// Used as the `log` record target.
    pub fn target(&self) -> &'static str {
        match self {
            Component::Http => "HTTP",
            Component::Database => "DB",
            Component::Chart => "CHART",
            Component::System => "SYS",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

static LOGGER: OnceLock<Logger> = OnceLock::new();

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    fn format_entry(&self, level: LogLevel, target: &str, message: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        format!("{} {} {}: {}", timestamp, level, target, message)
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        LogLevel::from_record(metadata.level()) >= self.min_level
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = LogLevel::from_record(record.level());
        let message = record.args().to_string();
        let log_entry = self.format_entry(level, record.target(), &message);

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}: {}", record.target(), message),
                LogLevel::Warning => eprintln!("   ⚠ {}: {}", record.target(), message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn flush(&self) {}
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Install the global logger. Returns `false` if a logger was already set.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) -> bool {
    let logger = LOGGER.get_or_init(|| Logger {
        min_level,
        log_file: log_file.map(String::from),
        console_timestamps,
    });

    if log::set_logger(logger).is_err() {
        return false;
    }
    log::set_max_level(logger.min_level.to_filter());
    true
}

fn with_context(context: Option<&str>, message: &str) -> String {
    match context {
        Some(ctx) => format!("[{}] {}", ctx, message),
        None => message.to_string(),
    }
}

/// Log a general informational message
pub fn info(component: Component, context: Option<&str>, message: &str) {
    log::info!(target: component.target(), "{}", with_context(context, message));
}

/// Log a warning message
pub fn warn(component: Component, context: Option<&str>, message: &str) {
    log::warn!(target: component.target(), "{}", with_context(context, message));
}

/// Log an error message
pub fn error(component: Component, context: Option<&str>, message: &str) {
    log::error!(target: component.target(), "{}", with_context(context, message));
}

/// Log a debug message
pub fn debug(component: Component, context: Option<&str>, message: &str) {
    log::debug!(target: component.target(), "{}", with_context(context, message));
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// The request itself was malformed; nothing is wrong with the service
    Rejected,
    /// The store or chart backend failed underneath a valid request
    Unexpected,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Rejected => write!(f, "REJECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
        }
    }
}

pub fn classify_failure(err: &DashboardError) -> FailureType {
    if err.is_client_error() {
        FailureType::Rejected
    } else {
        FailureType::Unexpected
    }
}

fn failure_component(err: &DashboardError) -> Component {
    match err {
        DashboardError::StoreUnavailable { .. } => Component::Database,
        DashboardError::Chart(_) => Component::Chart,
        _ => Component::Http,
    }
}

/// Log a failed request with automatic classification
pub fn log_request_failure(route: &str, err: &DashboardError) {
    let failure_type = classify_failure(err);
    let message = format!("request failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Rejected => warn(Component::Http, Some(route), &message),
        FailureType::Unexpected => error(failure_component(err), Some(route), &message),
    }
}

/// Log a completed page with the number of rows or points it carried
pub fn log_request_summary(route: &str, rows: usize, elapsed_ms: u128) {
    debug(
        Component::Http,
        Some(route),
        &format!("served {} rows in {} ms", rows, elapsed_ms),
    );
}
