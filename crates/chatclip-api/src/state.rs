//! Application state.

use std::sync::Arc;

use chatclip_queue::{JobQueue, JobStatusStore, QueueResult, StatusStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub queue: Arc<JobQueue>,
    pub status: Arc<dyn StatusStore>,
}

impl AppState {
    /// Create state from environment variables. Does not connect to Redis.
    pub fn new(config: ApiConfig) -> QueueResult<Self> {
        let queue = JobQueue::from_env()?;
        let status = JobStatusStore::new(queue.client().clone(), queue.config().status_ttl);
        Ok(Self::with_parts(config, queue, Arc::new(status)))
    }

    pub fn with_parts(config: ApiConfig, queue: JobQueue, status: Arc<dyn StatusStore>) -> Self {
        Self {
            config,
            queue: Arc::new(queue),
            status,
        }
    }
}
