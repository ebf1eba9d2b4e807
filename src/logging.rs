// src/logging.rs

//! Global `tracing` subscriber setup.
//!
//! The level comes from the `--log-level` flag when given, otherwise from
//! the `TASKFORGE_LOG` environment variable, otherwise `info`.

use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Install the global subscriber. Call once at startup; a second call
/// panics inside `tracing-subscriber`.
pub fn init_logging(cli_level: Option<LogLevel>) {
    fmt()
        .with_max_level(resolve_level(cli_level))
        .with_target(true)
        .init();
}

fn resolve_level(cli_level: Option<LogLevel>) -> Level {
    if let Some(level) = cli_level {
        return match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        };
    }
    std::env::var("TASKFORGE_LOG")
        .ok()
        .and_then(|value| parse_level(&value))
        .unwrap_or(Level::INFO)
}

fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
