//! Render job submission and status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatclip_models::{Conversation, JobId, JobStatus, JobStatusRecord};
use chatclip_queue::RenderChatJob;
use chatclip_timeline::build_timeline;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderAccepted {
    pub job_id: JobId,
    pub status: JobStatus,
    pub estimated_duration: f64,
}

/// Validate a conversation and queue it for rendering.
pub async fn submit_render(
    State(state): State<AppState>,
    Json(conversation): Json<Conversation>,
) -> ApiResult<(StatusCode, Json<RenderAccepted>)> {
    if let Some(message) = conversation.validation_message() {
        metrics::record_job_rejected();
        return Err(ApiError::validation(message));
    }

    // Surfaces pacing errors now rather than in the worker
    let timeline = build_timeline(&conversation.messages, &conversation.timeline_config())
        .inspect_err(|_| metrics::record_job_rejected())?;

    let preset = conversation.preset.as_str();
    let message_count = conversation.messages.len();
    let job = RenderChatJob::new(conversation);
    let mut record = JobStatusRecord::queued(job.job_id.clone());
    state.status.save(&record).await?;

    if let Err(e) = state.queue.enqueue(&job).await {
        record.fail(format!("Failed to enqueue job: {}", e));
        if let Err(save_err) = state.status.save(&record).await {
            warn!(job_id = %job.job_id, "Failed to record enqueue failure: {}", save_err);
        }
        return Err(e.into());
    }

    metrics::record_job_enqueued(preset);
    info!(
        job_id = %job.job_id,
        messages = message_count,
        duration_secs = timeline.total_duration(),
        "Render job queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(RenderAccepted {
            job_id: job.job_id,
            status: JobStatus::Queued,
            estimated_duration: timeline.total_duration(),
        }),
    ))
}

/// Current state of a render job.
pub async fn get_render_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusRecord>> {
    let job_id =
        JobId::parse(&job_id).ok_or_else(|| ApiError::bad_request("job id must be a UUID"))?;

    state
        .status
        .get(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("job {}", job_id)))
}
