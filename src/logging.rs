//! Tracing subscriber setup for the `professor` binary.
//!
//! Logs go to stderr so stdout stays clean for rendered results. When a log
//! directory is configured, a daily rolling file receives the same events.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;
use crate::error::{ResearchError, Result};

/// File name prefix for rolling log files.
const LOG_FILE_PREFIX: &str = "professor.log";

/// Keeps the file writer alive; drop it only at shutdown so buffered lines
/// are flushed.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Filter from `RUST_LOG`, else the configured directive.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`ResearchError::Io`] if the log directory cannot be created and
/// [`ResearchError::Config`] if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stderr)
        .with(file_layer)
        .try_init()
        .map_err(|e| ResearchError::Config(format!("logging already initialised: {e}")))?;

    Ok(LoggingGuard { _file: guard })
}
