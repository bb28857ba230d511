//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Invalid conversation: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Render failed: {0}")]
    Media(#[from] chatclip_media::MediaError),

    #[error("Upload failed: {0}")]
    Storage(#[from] chatclip_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] chatclip_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chatclip_timeline::TimelineError> for WorkerError {
    fn from(e: chatclip_timeline::TimelineError) -> Self {
        Self::Validation(e.reason().to_string())
    }
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Storage(e) => e.is_retryable(),
            WorkerError::Queue(e) => e.is_retryable(),
            WorkerError::Io(_) | WorkerError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Check if this is a permanent failure that should NOT be retried
    /// (bad input, failed render).
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::Validation(_) | WorkerError::Media(_) | WorkerError::ConfigError(_)
        )
    }

    /// Message recorded on the failed job.
    pub fn public_message(&self) -> String {
        match self {
            WorkerError::Validation(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}
