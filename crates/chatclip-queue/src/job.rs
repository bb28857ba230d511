//! Job payloads carried on the stream.

use chatclip_models::{Conversation, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::QueueResult;

/// Render one conversation into a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderChatJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Conversation to render
    pub conversation: Conversation,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl RenderChatJob {
    pub fn new(conversation: Conversation) -> Self {
        Self::with_id(JobId::new(), conversation)
    }

    pub fn with_id(job_id: JobId, conversation: Conversation) -> Self {
        Self {
            job_id,
            conversation,
            created_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Deduplication key derived from the conversation content, so a
    /// resubmitted conversation maps to the job already in flight.
    pub fn idempotency_key(&self) -> QueueResult<String> {
        let content = serde_json::to_vec(&self.conversation)?;
        Ok(format!("render:{}", hex::encode(Sha256::digest(&content))))
    }
}
