//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Job timeout
    pub job_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Work directory for temporary files
    pub work_dir: PathBuf,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// How often a running job refreshes its pending entry; must stay
    /// below `claim_min_idle`
    pub job_heartbeat_interval: Duration,
    /// Limit on a single ffmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Font for drawtext; fontconfig's default sans when unset
    pub font_file: Option<PathBuf>,
    /// Shared secret for webhook signatures
    pub webhook_secret: Option<String>,
    /// Per-request webhook timeout
    pub webhook_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            job_timeout: Duration::from_secs(900),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: PathBuf::from("/tmp/chatclip"),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300),
            job_heartbeat_interval: Duration::from_secs(30),
            ffmpeg_timeout: Duration::from_secs(600),
            font_file: None,
            webhook_secret: None,
            webhook_timeout: Duration::from_secs(10),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_or("WORKER_MAX_JOBS", defaults.max_concurrent_jobs).max(1),
            job_timeout: env_secs("WORKER_JOB_TIMEOUT", defaults.job_timeout),
            shutdown_timeout: env_secs("WORKER_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            claim_interval: env_secs("WORKER_CLAIM_INTERVAL_SECS", defaults.claim_interval),
            claim_min_idle: env_secs("WORKER_CLAIM_MIN_IDLE_SECS", defaults.claim_min_idle),
            job_heartbeat_interval: env_secs(
                "WORKER_HEARTBEAT_INTERVAL_SECS",
                defaults.job_heartbeat_interval,
            ),
            ffmpeg_timeout: env_secs("FFMPEG_TIMEOUT_SECS", defaults.ffmpeg_timeout),
            font_file: non_empty_env("CHATCLIP_FONT_FILE").map(PathBuf::from),
            webhook_secret: non_empty_env("WEBHOOK_SECRET"),
            webhook_timeout: env_secs("WEBHOOK_TIMEOUT_SECS", defaults.webhook_timeout),
        }
    }

    /// Reject settings under which a healthy job could be claimed by
    /// another worker while it is still running.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.job_heartbeat_interval.is_zero() {
            return Err(WorkerError::config_error(
                "WORKER_HEARTBEAT_INTERVAL_SECS must be greater than zero",
            ));
        }
        if self.job_heartbeat_interval >= self.claim_min_idle {
            return Err(WorkerError::config_error(format!(
                "heartbeat interval ({}s) must be shorter than claim min idle ({}s)",
                self.job_heartbeat_interval.as_secs(),
                self.claim_min_idle.as_secs()
            )));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}
