//! Structured logging setup
//!
//! - Human-readable console logging for development
//! - JSON logging for production
//! - Daily rotated log files
//!
//! Library code only emits `tracing` events; embedders call [`init`] once
//! with the [`LoggingConfig`] they loaded.

use std::str::FromStr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{ConfigError, LoggingConfig};

const LOG_FILE_PREFIX: &str = "ppl-engine.log";

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format for production (structured logging)
    Json,
    /// Compact format for testing
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to pretty
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        })
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stdout only
    Stdout,
    /// Log to file only
    File,
    /// Log to both stdout and file
    Both,
}

impl FromStr for LogOutput {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to stdout
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Stdout,
        })
    }
}

impl LogOutput {
    fn writes_file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

fn stdout_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer().pretty().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// Install the global subscriber described by `config`.
///
/// Returns `Ok(false)` when a global subscriber was already installed, in
/// which case the existing one stays in place.
pub fn init(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let format: LogFormat = config.format.parse().unwrap_or(LogFormat::Pretty);
    let output: LogOutput = config.output.parse().unwrap_or(LogOutput::Stdout);

    let env_filter =
        EnvFilter::try_new(&config.level).map_err(|_| ConfigError::LogFilter(config.level.clone()))?;

    let file_layer = if output.writes_file() {
        std::fs::create_dir_all(&config.directory)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, &config.directory, LOG_FILE_PREFIX);
        Some(fmt::layer().with_writer(appender).with_ansi(false).boxed())
    } else {
        None
    };
    let console_layer = match output {
        LogOutput::File => None,
        LogOutput::Stdout | LogOutput::Both => Some(stdout_layer(format)),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            format = ?format,
            output = ?output,
            level = %config.level,
            "Logging system initialized"
        );
        if output.writes_file() {
            tracing::debug!(directory = %config.directory, "Writing rotated log files");
        }
    }
    Ok(installed)
}
