//! Error types for timeline construction.

use thiserror::Error;

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Errors raised while building a timeline.
///
/// Building performs no I/O, so the only failure is bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("validation error: {0}")]
    Validation(String),
}

impl TimelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Human-readable reason without the error prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Validation(reason) => reason,
        }
    }
}
