//! Job status records kept in Redis.

use std::time::Duration;

use async_trait::async_trait;
use chatclip_models::{JobId, JobStatusRecord};
use redis::AsyncCommands;
use tracing::debug;

use crate::error::{QueueError, QueueResult};
use crate::queue::KEY_PREFIX;

/// Persistence of job status records.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Write `record`, replacing any previous one for the job.
    async fn save(&self, record: &JobStatusRecord) -> QueueResult<()>;

    /// Fetch the record of `job_id`, if any.
    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusRecord>>;
}

/// Stores one `JobStatusRecord` per job under an expiring Redis key.
#[derive(Clone)]
pub struct JobStatusStore {
    client: redis::Client,
    ttl: Duration,
}

impl JobStatusStore {
    pub fn new(client: redis::Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    /// Connect to `redis_url`. Does not connect until first use.
    pub fn open(redis_url: &str, ttl: Duration) -> QueueResult<Self> {
        Ok(Self::new(redis::Client::open(redis_url)?, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn connection(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }
}

#[async_trait]
impl StatusStore for JobStatusStore {
    /// Write `record`, resetting the expiry.
    async fn save(&self, record: &JobStatusRecord) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        let json = serde_json::to_string(record)?;

        conn.set_ex::<_, _, ()>(status_key(&record.job_id), json, self.ttl.as_secs().max(1))
            .await?;

        debug!(
            job_id = %record.job_id,
            status = %record.status,
            "Saved job status"
        );
        Ok(())
    }

    /// Fetch the record of `job_id`, if it has not expired.
    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusRecord>> {
        let mut conn = self.connection().await?;
        let json: Option<String> = conn.get(status_key(job_id)).await?;

        json.map(|s| serde_json::from_str(&s).map_err(QueueError::from))
            .transpose()
    }
}

/// Key of a job's status record.
pub fn status_key(job_id: &JobId) -> String {
    format!("{}:job:{}", KEY_PREFIX, job_id)
}
