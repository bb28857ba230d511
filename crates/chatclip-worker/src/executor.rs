//! Job executor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use chatclip_queue::{JobQueue, RenderChatJob};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::RenderPipeline;

/// Jobs read per XREADGROUP call.
const MAX_BATCH: usize = 5;
/// How long a read blocks waiting for new jobs.
const CONSUME_BLOCK_MS: u64 = 1000;
/// Consecutive consume errors logged before the executor goes quiet.
const LOGGED_CONSUME_ERRORS: u32 = 5;

/// Whether the `streak`-th consecutive consume error is worth logging.
fn should_log_consume_error(streak: u32) -> bool {
    streak <= LOGGED_CONSUME_ERRORS
}

/// Run `touch` every `every` until the returned handle is aborted. The
/// first touch happens one full interval after the start.
fn spawn_heartbeat<F, Fut>(every: Duration, mut touch: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        loop {
            interval.tick().await;
            touch().await;
        }
    })
}

/// Shared handles a running job needs.
#[derive(Clone)]
struct JobContext {
    pipeline: Arc<RenderPipeline>,
    queue: Arc<JobQueue>,
    consumer_name: String,
    job_timeout: Duration,
    heartbeat_interval: Duration,
}

/// What to do with a job whose attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Leave pending; the claim loop redelivers it.
    Retry { attempt: u32, max_retries: u32 },
    /// Give up: dead-letter and record the failure.
    DeadLetter,
}

/// Decide between retrying and dead-lettering after `attempt` failures.
pub fn failure_action(error: &WorkerError, attempt: u32, max_retries: u32) -> FailureAction {
    if error.is_permanent_failure() || attempt >= max_retries {
        FailureAction::DeadLetter
    } else {
        FailureAction::Retry {
            attempt,
            max_retries,
        }
    }
}

/// Job executor that processes jobs from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    pipeline: Arc<RenderPipeline>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, queue: JobQueue, pipeline: RenderPipeline) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            pipeline: Arc::new(pipeline),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    fn job_context(&self) -> JobContext {
        JobContext {
            pipeline: Arc::clone(&self.pipeline),
            queue: Arc::clone(&self.queue),
            consumer_name: self.consumer_name.clone(),
            job_timeout: self.config.job_timeout,
            heartbeat_interval: self.config.job_heartbeat_interval,
        }
    }

    /// Consume jobs until shutdown is signalled, then drain in-flight jobs.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let claim_task = self.spawn_claim_task();
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut error_streak = 0u32;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    match result {
                        Ok(()) => error_streak = 0,
                        Err(e) => {
                            error_streak += 1;
                            if should_log_consume_error(error_streak) {
                                error!("Error consuming jobs: {}", e);
                            } else if error_streak == LOGGED_CONSUME_ERRORS + 1 {
                                warn!(
                                    "Suppressing consume errors after {} in a row",
                                    LOGGED_CONSUME_ERRORS
                                );
                            }
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("Shutdown timeout reached with jobs still running");
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Periodically claim jobs orphaned by crashed workers or left pending
    /// for a retry.
    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let context = self.job_context();
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.claim_interval);
            let min_idle_ms = config.claim_min_idle.as_millis() as u64;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_pending(&consumer_name, min_idle_ms, MAX_BATCH).await {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!("Claimed {} pending jobs", jobs.len());
                                for (message_id, job) in jobs {
                                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                                        break;
                                    };
                                    Self::spawn_job(permit, context.clone(), message_id, job);
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Failed to claim pending jobs: {}", e),
                        }
                    }
                }
            }
        })
    }

    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(&self.consumer_name, CONSUME_BLOCK_MS, available.min(MAX_BATCH))
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let permit = Arc::clone(&self.job_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

            Self::spawn_job(permit, self.job_context(), message_id, job);
        }

        Ok(())
    }

    fn spawn_job(permit: OwnedSemaphorePermit, context: JobContext, message_id: String, job: RenderChatJob) {
        tokio::spawn(async move {
            let _permit = permit;
            Self::execute_job(context, message_id, job).await;
        });
    }

    /// Execute a single job with retry and DLQ handling.
    async fn execute_job(context: JobContext, message_id: String, job: RenderChatJob) {
        let JobContext {
            pipeline,
            queue,
            consumer_name,
            job_timeout,
            heartbeat_interval,
        } = context;
        let job_id = job.job_id.clone();
        info!(job_id = %job_id, "Executing job");

        let heartbeat = {
            let queue = Arc::clone(&queue);
            let message_id = message_id.clone();
            let job_id = job_id.clone();
            spawn_heartbeat(heartbeat_interval, move || {
                let queue = Arc::clone(&queue);
                let consumer_name = consumer_name.clone();
                let message_id = message_id.clone();
                let job_id = job_id.clone();
                async move {
                    if let Err(e) = queue.touch(&consumer_name, &message_id).await {
                        warn!(job_id = %job_id, "Job heartbeat failed: {}", e);
                    }
                }
            })
        };

        let result = match tokio::time::timeout(job_timeout, pipeline.run(&job)).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout(job_timeout.as_secs())),
        };
        heartbeat.abort();

        let error = match result {
            Ok(_) => {
                if let Err(e) = queue.ack(&message_id).await {
                    error!(job_id = %job_id, "Failed to ack job: {}", e);
                }
                if let Err(e) = queue.clear_dedup(&job).await {
                    warn!(job_id = %job_id, "Failed to clear dedup key: {}", e);
                }
                return;
            }
            Err(e) => e,
        };

        let attempt = if error.is_permanent_failure() {
            0
        } else {
            queue.increment_retry(&message_id).await.unwrap_or(u32::MAX)
        };

        match failure_action(&error, attempt, queue.max_retries()) {
            FailureAction::Retry {
                attempt,
                max_retries,
            } => {
                metrics::counter!("chatclip_jobs_retried_total").increment(1);
                warn!(
                    job_id = %job_id,
                    "Job failed, will be retried (attempt {}/{}): {}",
                    attempt, max_retries, error
                );
            }
            FailureAction::DeadLetter => {
                error!(job_id = %job_id, "Job failed permanently: {}", error);
                if let Err(e) = queue.dlq(&message_id, &job, &error.to_string()).await {
                    error!(job_id = %job_id, "Failed to move job to DLQ: {}", e);
                }
                if let Err(e) = queue.clear_dedup(&job).await {
                    warn!(job_id = %job_id, "Failed to clear dedup key: {}", e);
                }
                if let Err(e) = pipeline.fail(&job, &error).await {
                    error!(job_id = %job_id, "Failed to record job failure: {}", e);
                }
            }
        }
    }

    async fn wait_for_jobs(&self) {
        while self.job_semaphore.available_permits() < self.config.max_concurrent_jobs {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
