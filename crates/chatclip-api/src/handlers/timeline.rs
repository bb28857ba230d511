//! Timeline preview handlers.

use axum::Json;
use chatclip_models::{Conversation, Message, Timeline, TimelineConfig};
use chatclip_timeline::{build_timeline, estimate_duration, TimelineSummary};
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct TimelineRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub config: Option<TimelineConfig>,
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    #[serde(flatten)]
    pub timeline: Timeline,
    pub summary: TimelineSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub estimated_duration: f64,
}

/// Build the timeline for a message list without rendering.
pub async fn preview_timeline(
    Json(request): Json<TimelineRequest>,
) -> ApiResult<Json<TimelineResponse>> {
    let config = request.config.unwrap_or_default();
    let timeline = build_timeline(&request.messages, &config)?;
    metrics::record_timeline_built();

    let summary = TimelineSummary::from_timeline(&timeline);
    Ok(Json(TimelineResponse { timeline, summary }))
}

/// Clip length for a message list.
pub async fn estimate(Json(request): Json<TimelineRequest>) -> ApiResult<Json<EstimateResponse>> {
    let config = request.config.unwrap_or_default();
    let estimated_duration = estimate_duration(&request.messages, &config)?;
    Ok(Json(EstimateResponse { estimated_duration }))
}

/// JSON Schema of the render request body.
pub async fn conversation_schema() -> Json<RootSchema> {
    Json(schemars::schema_for!(Conversation))
}
