//! Event System
//!
//! Events emitted while the dashboard refreshes, printed in headless mode.

use crate::dashboard::StatKind;
use crate::error_classifier::LogLevel;
use crate::logging::should_log_with_env;
use chrono::Local;
use std::fmt::Display;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Origin {
    /// Sign-in, sign-out and lifecycle messages.
    Session,
    /// A single dashboard stat.
    Stat(StatKind),
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Session => write!(f, "Session"),
            Origin::Stat(stat) => write!(f, "{}", stat),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, strum::Display)]
pub enum EventType {
    Success,
    Error,
    Refresh,
    StateChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub origin: Origin,
    pub msg: String,
    pub timestamp: String,
    pub event_type: EventType,
    pub log_level: LogLevel,
}

impl Event {
    fn new(origin: Origin, msg: String, event_type: EventType, log_level: LogLevel) -> Self {
        Self {
            origin,
            msg,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            event_type,
            log_level,
        }
    }

    pub fn session(msg: String) -> Self {
        Self::new(Origin::Session, msg, EventType::StateChange, LogLevel::Info)
    }

    pub fn stat_updated(stat: StatKind, msg: String) -> Self {
        Self::new(Origin::Stat(stat), msg, EventType::Success, LogLevel::Info)
    }

    pub fn stat_refreshing(stat: StatKind) -> Self {
        Self::new(
            Origin::Stat(stat),
            "Refreshing...".to_string(),
            EventType::Refresh,
            LogLevel::Debug,
        )
    }

    pub fn stat_failed(stat: StatKind, msg: String, log_level: LogLevel) -> Self {
        Self::new(Origin::Stat(stat), msg, EventType::Error, log_level)
    }

    pub fn should_display(&self) -> bool {
        // Always show successful updates and session changes
        if matches!(self.event_type, EventType::Success | EventType::StateChange) {
            return true;
        }
        should_log_with_env(self.log_level)
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.event_type, self.timestamp, self.origin, self.msg
        )
    }
}
