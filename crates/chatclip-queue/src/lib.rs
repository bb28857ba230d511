//! Redis Streams job queue.
//!
//! This crate provides:
//! - Job enqueueing with idempotency keys
//! - Worker consumption with retry counters and a dead letter stream
//! - Expiring job status records

pub mod error;
pub mod job;
pub mod queue;
pub mod status;

pub use error::{QueueError, QueueResult};
pub use job::RenderChatJob;
pub use queue::{JobQueue, QueueConfig, DEFAULT_JOB_STATUS_TTL_SECS};
pub use status::{JobStatusStore, StatusStore};
