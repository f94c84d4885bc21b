//! Log level handling for the `log` facade and for dashboard events.

use crate::error_classifier::LogLevel;
use std::env;

const DEFAULT_LEVEL: &str = "info";

/// Installs the process-wide logger. Honours `RUST_LOG`, defaulting to `info`.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(DEFAULT_LEVEL),
    )
    .format_timestamp_secs()
    .try_init();
}

pub fn get_rust_log_level() -> LogLevel {
    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
    parse_rust_log_level(&rust_log)
}

/// Reads the global level from a `RUST_LOG` directive list.
///
/// Only the first directive counts; `module=level` takes the level. Anything
/// unrecognised falls back to `info`.
pub fn parse_rust_log_level(rust_log: &str) -> LogLevel {
    let first = rust_log.split(',').next().unwrap_or_default();
    let level = match first.rsplit_once('=') {
        Some((_, level)) => level,
        None => first,
    };

    match level.trim().to_lowercase().as_str() {
        "trace" => LogLevel::Trace,
        "debug" => LogLevel::Debug,
        "warn" | "warning" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

pub fn should_log(event_level: LogLevel, threshold: LogLevel) -> bool {
    event_level >= threshold
}

pub fn should_log_with_env(event_level: LogLevel) -> bool {
    should_log(event_level, get_rust_log_level())
}
