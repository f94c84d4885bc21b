use crate::aggregator::AggregationError;
use crate::sources::error::SourceError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

#[derive(Debug, Clone)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_source_error(&self, error: &SourceError) -> LogLevel {
        match error {
            // Non-critical: Temporary gateway issues
            SourceError::Http { status, .. } if *status == 429 => LogLevel::Debug,
            SourceError::Http { status, .. } if (500..=599).contains(status) => LogLevel::Warn,

            // Critical: Auth, malformed responses
            SourceError::Http { status, .. } if *status == 401 => LogLevel::Error,
            SourceError::Http { status, .. } if *status == 403 => LogLevel::Error,
            SourceError::Decode(_) => LogLevel::Error,
            SourceError::Amount(_) => LogLevel::Error,
            SourceError::Rate(_) => LogLevel::Error,

            // Network issues - usually temporary
            _ => LogLevel::Warn,
        }
    }

    pub fn classify_aggregation_error(&self, error: &AggregationError) -> LogLevel {
        match error {
            AggregationError::Source(e) => self.classify_source_error(e),
            // A broken amount contract is a bug, not a transient condition
            AggregationError::Amount(_) => LogLevel::Error,
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
