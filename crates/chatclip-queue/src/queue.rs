//! Job queue using Redis Streams.

use std::time::Duration;

use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::RenderChatJob;

/// Prefix of every key this crate writes.
pub const KEY_PREFIX: &str = "chatclip";
/// Lifetime of idempotency keys.
pub const DEDUP_TTL_SECS: u64 = 3600;
/// Lifetime of per-message retry counters.
pub const RETRY_COUNTER_TTL_SECS: i64 = 86400;
/// Default lifetime of job status records (24 hours).
pub const DEFAULT_JOB_STATUS_TTL_SECS: u64 = 86400;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Max retries before DLQ
    pub max_retries: u32,
    /// Job visibility timeout
    pub visibility_timeout: Duration,
    /// Lifetime of job status records
    pub status_ttl: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "chatclip:jobs".to_string(),
            consumer_group: "chatclip:workers".to_string(),
            dlq_stream_name: "chatclip:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(600),
            status_ttl: Duration::from_secs(DEFAULT_JOB_STATUS_TTL_SECS),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            visibility_timeout: std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.visibility_timeout),
            status_ttl: std::env::var("JOB_STATUS_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.status_ttl),
        }
    }
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue. Does not connect.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Underlying Redis client, shared with the status store.
    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    async fn connection(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue a render job, returning the stream message ID.
    pub async fn enqueue(&self, job: &RenderChatJob) -> QueueResult<String> {
        let mut conn = self.connection().await?;

        let payload = serde_json::to_string(job)?;
        let idempotency_key = job.idempotency_key()?;
        let dedup_key = dedup_key(&idempotency_key);

        // SET NX doubles as the duplicate check; the value names the owner
        let fresh: bool = redis::cmd("SET")
            .arg(&dedup_key)
            .arg(job.job_id.as_str())
            .arg("NX")
            .arg("EX")
            .arg(DEDUP_TTL_SECS)
            .query_async::<Option<String>>(&mut conn)
            .await?
            .is_some();
        if !fresh {
            // The owner may have finished between SET and GET
            let existing: Option<String> = conn.get(&dedup_key).await?;
            let existing = existing.unwrap_or(idempotency_key);
            warn!(job_id = %job.job_id, existing = %existing, "Duplicate job rejected");
            return Err(QueueError::DuplicateJob(existing));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::enqueue_failed(e.to_string()))?;

        info!(
            job_id = %job.job_id,
            message_id = %message_id,
            "Enqueued render job"
        );

        Ok(message_id)
    }

    /// Acknowledge a job and drop it from the stream.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        conn.del::<_, ()>(retry_key(message_id)).await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    /// Move a job to the dead letter queue.
    pub async fn dlq(&self, message_id: &str, job: &RenderChatJob, error: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let payload = serde_json::to_string(job)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;

        warn!(job_id = %job.job_id, "Moved job to DLQ: {}", error);
        Ok(())
    }

    /// Release the idempotency key of a finished job, unless a later job
    /// has taken it over.
    pub async fn clear_dedup(&self, job: &RenderChatJob) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        let key = dedup_key(&job.idempotency_key()?);
        let owner: Option<String> = conn.get(&key).await?;
        if owner.as_deref() == Some(job.job_id.as_str()) {
            conn.del::<_, ()>(&key).await?;
        }
        Ok(())
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Read new jobs for `consumer_name`, blocking up to `block_ms`.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, RenderChatJob)>> {
        let mut conn = self.connection().await?;

        let result: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let entries = result
            .map(|reply| reply.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default();

        Ok(self.decode_entries(entries, "Consumed").await)
    }

    /// Claim pending jobs idle for at least `min_idle_ms` (crashed or
    /// stalled consumers).
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, RenderChatJob)>> {
        let mut conn = self.connection().await?;

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);
        for entry in &pending.ids {
            cmd.arg(&entry.id);
        }
        let claimed: StreamClaimReply = cmd.query_async(&mut conn).await?;

        Ok(self.decode_entries(claimed.ids, "Claimed").await)
    }

    /// Reset the idle time of a message this consumer is still working on,
    /// keeping it out of other workers' `claim_pending`.
    pub async fn touch(&self, consumer_name: &str, message_id: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let _: redis::Value = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn decode_entries(&self, entries: Vec<StreamId>, verb: &str) -> Vec<(String, RenderChatJob)> {
        let mut jobs = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some(value) = entry.map.get("job") else {
                warn!("Stream entry {} has no job field", entry.id);
                self.ack(&entry.id).await.ok();
                continue;
            };

            match decode_payload(value) {
                Ok(job) => {
                    debug!(job_id = %job.job_id, "{} job from stream", verb);
                    jobs.push((entry.id, job));
                }
                Err(e) => {
                    warn!("Failed to parse job payload {}: {}", entry.id, e);
                    // Malformed payloads would otherwise be redelivered forever
                    self.ack(&entry.id).await.ok();
                }
            }
        }

        jobs
    }

    /// Get retry count for a message.
    pub async fn get_retry_count(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.connection().await?;
        let count: Option<u32> = conn.get(retry_key(message_id)).await?;
        Ok(count.unwrap_or(0))
    }

    /// Increment retry count for a message.
    pub async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.connection().await?;

        let key = retry_key(message_id);
        let count: u32 = conn.incr(&key, 1).await?;
        conn.expire::<_, ()>(&key, RETRY_COUNTER_TTL_SECS).await?;
        Ok(count)
    }

    /// Get max retries from config.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

/// Key guarding against duplicate submissions.
pub fn dedup_key(idempotency_key: &str) -> String {
    format!("{}:dedup:{}", KEY_PREFIX, idempotency_key)
}

/// Key holding the delivery attempt counter of a stream message.
pub fn retry_key(message_id: &str) -> String {
    format!("{}:retry:{}", KEY_PREFIX, message_id)
}

/// Decode a `job` field value.
pub fn decode_payload(value: &redis::Value) -> QueueResult<RenderChatJob> {
    let job = match value {
        redis::Value::BulkString(bytes) => serde_json::from_slice(bytes)?,
        redis::Value::SimpleString(text) => serde_json::from_str(text)?,
        other => {
            return Err(QueueError::InvalidPayload(format!(
                "unexpected value type: {:?}",
                other
            )))
        }
    };
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatclip_models::{Conversation, JobId, Message};

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.stream_name, "chatclip:jobs");
        assert_eq!(config.dlq_stream_name, "chatclip:dlq");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.status_ttl, Duration::from_secs(86400));
    }

    #[test]
    fn test_keys() {
        assert_eq!(dedup_key("render:abc"), "chatclip:dedup:render:abc");
        assert_eq!(retry_key("1-0"), "chatclip:retry:1-0");
    }

    #[test]
    fn test_decode_payload() {
        let job = RenderChatJob::with_id(
            JobId::from_string("j1"),
            Conversation::new(vec![Message::you("hello")]),
        );
        let bytes = serde_json::to_vec(&job).unwrap();

        let decoded = decode_payload(&redis::Value::BulkString(bytes)).unwrap();
        assert_eq!(decoded.job_id.as_str(), "j1");

        assert!(decode_payload(&redis::Value::BulkString(b"{not json".to_vec())).is_err());
        assert!(decode_payload(&redis::Value::Int(3)).is_err());
    }

    #[test]
    fn test_new_does_not_connect() {
        let queue = JobQueue::new(QueueConfig {
            redis_url: "redis://127.0.0.1:1".into(),
            ..Default::default()
        });
        assert!(queue.is_ok());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let queue = JobQueue::new(QueueConfig {
            redis_url: "not a url".into(),
            ..Default::default()
        });
        assert!(queue.is_err());
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_enqueue_consume_ack() {
        let config = QueueConfig {
            stream_name: format!("chatclip:test:{}", JobId::new()),
            ..QueueConfig::from_env()
        };
        let queue = JobQueue::new(config).unwrap();
        queue.init().await.unwrap();

        let conversation = Conversation::new(vec![Message::them(format!("hey {}", JobId::new()))]);
        let job = RenderChatJob::new(conversation.clone());
        queue.enqueue(&job).await.unwrap();

        let resubmitted = RenderChatJob::new(conversation);
        match queue.enqueue(&resubmitted).await {
            Err(QueueError::DuplicateJob(existing)) => assert_eq!(existing, job.job_id.as_str()),
            other => panic!("expected duplicate, got {:?}", other),
        }

        let jobs = queue.consume("test-consumer", 100, 5).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].1.job_id, job.job_id);

        queue.ack(&jobs[0].0).await.unwrap();
        queue.clear_dedup(&job).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
