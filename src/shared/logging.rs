use std::fmt::Display;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl LogLevel {
    /// Parse a level name, falling back to `Info` for anything unrecognised.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Default filter directive used when `RUST_LOG` is not set.
pub fn default_filter(level: LogLevel) -> String {
    format!("aztfimport={},reqwest=warn,hyper=warn", level)
}

/// Install the global subscriber. Logs go to stderr so that stdout stays
/// reserved for the run report.
pub fn init(level: LogLevel) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Log debug level message
pub fn debug(message: &str) {
    tracing::debug!("{}", message);
}

/// Log info level message
pub fn info(message: &str) {
    tracing::info!("{}", message);
}

/// Log warning level message
pub fn warn(message: &str) {
    tracing::warn!("{}", message);
}

/// Log error level message
pub fn error(message: &str) {
    tracing::error!("{}", message);
}
