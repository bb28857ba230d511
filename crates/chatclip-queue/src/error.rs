//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Enqueue failed: {0}")]
    EnqueueFailed(String),

    /// Carries the ID of the job already queued for the same content.
    #[error("Duplicate of job {0}")]
    DuplicateJob(String),

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn enqueue_failed(msg: impl Into<String>) -> Self {
        Self::EnqueueFailed(msg.into())
    }

    /// Whether the operation may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueueError::ConnectionFailed(_) | QueueError::EnqueueFailed(_) | QueueError::Redis(_)
        )
    }
}
