//! Webhook payload sent when a job finishes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus, JobStatusRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobNotification {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&JobStatusRecord> for JobNotification {
    fn from(record: &JobStatusRecord) -> Self {
        Self {
            job_id: record.job_id.clone(),
            status: record.status,
            video_url: record.video_url.clone(),
            file_id: record.file_id.clone(),
            file_size: record.file_size,
            error: record.error.clone(),
        }
    }
}
