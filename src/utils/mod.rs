//! Utility functions and helpers

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize logging from configuration.
///
/// When a log file is configured, output goes through a non-blocking
/// appender; keep the returned guard alive until shutdown so buffered lines
/// are flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.format == "json";

    match &config.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let builder = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
            .map_err(|e| Error::config(format!("Failed to initialize logging: {}", e)))?;
            Ok(Some(guard))
        }
        None => {
            let builder = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false);
            if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
            .map_err(|e| Error::config(format!("Failed to initialize logging: {}", e)))?;
            Ok(None)
        }
    }
}

/// Daily-rotated appender for `path`
fn file_appender(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::config(format!("Invalid log file path: {}", path.display())))?;

    Ok(tracing_appender::rolling::daily(directory, file_name))
}

/// Format a difficulty for logs, e.g. `1.25K`
pub fn format_difficulty(difficulty: &num_bigint::BigUint) -> String {
    const UNITS: [&str; 6] = ["", "K", "M", "G", "T", "P"];

    let mut value = difficulty.to_string().parse::<f64>().unwrap_or(f64::MAX);
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        difficulty.to_string()
    } else {
        format!("{:.2}{}", value, UNITS[unit])
    }
}
