//! Per-job render pipeline.
//!
//! `processing` -> build timeline -> render -> probe -> upload ->
//! `completed` -> notify. Failures are recorded by [`RenderPipeline::fail`]
//! once the executor gives up on a job.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chatclip_media::{probe_video, FfmpegRenderer, RenderSpec, Renderer};
use chatclip_models::{JobNotification, JobStatus, JobStatusRecord, Timeline};
use chatclip_queue::{JobQueue, JobStatusStore, RenderChatJob, StatusStore};
use chatclip_storage::{R2Uploader, UploadedMedia, Uploader};
use chatclip_timeline::build_timeline;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::notifier::{Notifier, WebhookNotifier};

/// Operation name recorded on every job span.
pub const OPERATION: &str = "render_chat";

/// Everything a job needs, shared by all in-flight jobs.
pub struct RenderPipeline {
    work_dir: PathBuf,
    renderer: Arc<dyn Renderer>,
    uploader: Arc<dyn Uploader>,
    status: Arc<dyn StatusStore>,
    notifier: Arc<dyn Notifier>,
    probe_output: bool,
}

impl RenderPipeline {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        renderer: Arc<dyn Renderer>,
        uploader: Arc<dyn Uploader>,
        status: Arc<dyn StatusStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            renderer,
            uploader,
            status,
            notifier,
            probe_output: true,
        }
    }

    /// Production wiring: ffmpeg renderer, R2 uploader, Redis status
    /// store sharing the queue's connection, webhook notifier.
    pub fn from_config(config: &WorkerConfig, queue: &JobQueue) -> WorkerResult<Self> {
        let mut renderer = FfmpegRenderer::new().with_timeout(config.ffmpeg_timeout.as_secs());
        if let Some(font) = &config.font_file {
            renderer = renderer.with_font_file(font.clone());
        }

        let uploader = R2Uploader::from_env()?;
        let status = JobStatusStore::new(queue.client().clone(), queue.config().status_ttl);
        let notifier = WebhookNotifier::new(config.webhook_secret.clone(), config.webhook_timeout)
            .map_err(|e| WorkerError::config_error(e.to_string()))?;

        Ok(Self::new(
            config.work_dir.clone(),
            Arc::new(renderer),
            Arc::new(uploader),
            Arc::new(status),
            Arc::new(notifier),
        ))
    }

    /// Skip the ffprobe pass and report the planned duration instead.
    pub fn without_probe(mut self) -> Self {
        self.probe_output = false;
        self
    }

    /// Scratch directory of one job.
    pub fn job_dir(&self, job: &RenderChatJob) -> PathBuf {
        self.work_dir.join(job.job_id.as_str())
    }

    /// Run a job to completion, returning its final record.
    pub async fn run(&self, job: &RenderChatJob) -> WorkerResult<JobStatusRecord> {
        let span = info_span!("render_job", job_id = %job.job_id, operation = OPERATION);
        self.run_inner(job).instrument(span).await
    }

    async fn run_inner(&self, job: &RenderChatJob) -> WorkerResult<JobStatusRecord> {
        let started = Instant::now();
        info!(messages = job.conversation.messages.len(), "Render job started");

        let mut record = self.current_record(job).await;
        record.set_status(JobStatus::Processing);
        self.status.save(&record).await?;

        if let Some(reason) = job.conversation.validation_message() {
            return Err(WorkerError::validation(reason));
        }
        let timeline = build_timeline(&job.conversation.messages, &job.conversation.timeline_config())?;
        info!(
            stage = "timeline",
            events = timeline.events().len(),
            duration = timeline.total_duration(),
            "Timeline built"
        );

        let job_dir = self.job_dir(job);
        tokio::fs::create_dir_all(&job_dir).await?;
        let result = self.render_and_upload(job, &timeline, &job_dir).await;
        if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
            warn!("Failed to remove {}: {}", job_dir.display(), e);
        }
        let (media, duration) = result?;

        record.complete(&media.url, &media.id, media.size, duration);
        self.status.save(&record).await?;
        self.notify(job, &record).await;

        metrics::counter!("chatclip_jobs_completed_total").increment(1);
        info!(
            stage = "completed",
            url = %media.url,
            size = media.size,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Render job completed"
        );
        Ok(record)
    }

    async fn render_and_upload(
        &self,
        job: &RenderChatJob,
        timeline: &Timeline,
        job_dir: &Path,
    ) -> WorkerResult<(UploadedMedia, f64)> {
        let conversation = &job.conversation;
        let output = job_dir.join(format!("{}.mp4", job.job_id));
        let spec = RenderSpec::new(
            conversation.preset.preset(),
            conversation.theme.theme(),
            conversation.contact_name.clone(),
        );

        let rendered = self
            .renderer
            .render(timeline, &conversation.messages, &spec, &output)
            .await?;

        let duration = if self.probe_output {
            let info = probe_video(&rendered).await?;
            info!(
                stage = "render",
                width = info.width,
                height = info.height,
                duration = info.duration,
                "Video rendered"
            );
            info.duration
        } else {
            timeline.total_duration()
        };

        let media = self.uploader.upload(&rendered).await?;
        Ok((media, duration))
    }

    /// Record a terminal failure and notify the caller.
    pub async fn fail(&self, job: &RenderChatJob, error: &WorkerError) -> WorkerResult<JobStatusRecord> {
        let mut record = self.current_record(job).await;
        record.fail(error.public_message());
        self.status.save(&record).await?;
        self.notify(job, &record).await;

        metrics::counter!("chatclip_jobs_failed_total").increment(1);
        error!(job_id = %job.job_id, operation = OPERATION, "Render job failed: {}", error);
        if let WorkerError::Media(media) = error {
            if let Some(stderr) = media.diagnostics() {
                error!(job_id = %job.job_id, "ffmpeg stderr:\n{}", stderr);
            }
        }
        Ok(record)
    }

    async fn current_record(&self, job: &RenderChatJob) -> JobStatusRecord {
        match self.status.get(&job.job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => JobStatusRecord::queued(job.job_id.clone()),
            Err(e) => {
                warn!(job_id = %job.job_id, "Failed to load job status: {}", e);
                JobStatusRecord::queued(job.job_id.clone())
            }
        }
    }

    /// Webhook errors are logged, never propagated.
    async fn notify(&self, job: &RenderChatJob, record: &JobStatusRecord) {
        let Some(url) = job.conversation.webhook_url.as_deref() else {
            return;
        };

        if let Err(e) = self.notifier.notify(url, &JobNotification::from(record)).await {
            metrics::counter!("chatclip_webhook_failures_total").increment(1);
            warn!(job_id = %job.job_id, "Webhook notification failed: {}", e);
        }
    }
}
