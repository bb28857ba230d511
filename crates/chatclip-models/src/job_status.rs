//! Job status records for polling.
//!
//! A record is written when a job is queued and rewritten at every state
//! change, so clients can poll without touching the queue.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued waiting for a worker
    #[default]
    Queued,
    /// Job is actively being rendered
    Processing,
    /// Video uploaded
    Completed,
    /// Job failed with an error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a job's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatusRecord {
    /// Create a record for a freshly queued job.
    pub fn queued(job_id: JobId) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            status: JobStatus::Queued,
            video_url: None,
            file_id: None,
            file_size: None,
            duration_secs: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Update the status and bump the updated_at timestamp.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Mark job as completed with the uploaded video.
    pub fn complete(
        &mut self,
        video_url: impl Into<String>,
        file_id: impl Into<String>,
        file_size: u64,
        duration_secs: f64,
    ) {
        let now = Utc::now();
        self.status = JobStatus::Completed;
        self.video_url = Some(video_url.into());
        self.file_id = Some(file_id.into());
        self.file_size = Some(file_size);
        self.duration_secs = Some(duration_secs);
        self.error = None;
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// Mark job as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        let now = Utc::now();
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = now;
        self.completed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_record_lifecycle() {
        let mut record = JobStatusRecord::queued(JobId::new());
        assert_eq!(record.status, JobStatus::Queued);

        record.set_status(JobStatus::Processing);
        assert!(!record.is_terminal());

        record.complete("https://cdn/v.mp4", "abc", 1024, 7.5);
        assert!(record.is_terminal());
        assert_eq!(record.file_size, Some(1024));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_record_json_omits_empty_fields() {
        let mut record = JobStatusRecord::queued(JobId::from_string("j1"));
        record.fail("boom");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["jobId"], "j1");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert!(json.get("videoUrl").is_none());
    }
}
