//! API router tests.
//!
//! Redis is never reachable here: the queue points at a closed port and
//! job status lives in memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chatclip_api::{create_router, ApiConfig, AppState};
use chatclip_models::{JobId, JobStatus, JobStatusRecord};
use chatclip_queue::{JobQueue, QueueConfig, QueueResult, StatusStore};
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Default)]
struct MemoryStatus {
    records: Mutex<HashMap<String, JobStatusRecord>>,
}

#[async_trait]
impl StatusStore for MemoryStatus {
    async fn save(&self, record: &JobStatusRecord) -> QueueResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.job_id.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusRecord>> {
        Ok(self.records.lock().unwrap().get(job_id.as_str()).cloned())
    }
}

fn test_app(status: Arc<MemoryStatus>) -> Router {
    let queue = JobQueue::new(QueueConfig {
        redis_url: "redis://127.0.0.1:1".to_string(),
        ..QueueConfig::default()
    })
    .unwrap();
    let state = AppState::with_parts(ApiConfig::default(), queue, status);
    create_router(state, None)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(Arc::default());
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = test_app(Arc::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
}

#[tokio::test]
async fn test_ready_without_redis() {
    let app = test_app(Arc::default());
    let response = app.oneshot(get("/ready")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["redis"]["status"], "error");
}

#[tokio::test]
async fn test_metrics_route_absent_without_handle() {
    let app = test_app(Arc::default());
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_timeline_preview() {
    let app = test_app(Arc::default());
    let response = app
        .oneshot(post_json(
            "/api/timeline",
            json!({
                "messages": [
                    {"sender": "them", "text": "Hey! How are you?"},
                    {"sender": "you", "text": "I'm doing great!"}
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["events"].as_array().unwrap().len() > 2);
    assert!(body["totalDuration"].as_f64().unwrap() >= 5.0);
    assert_eq!(body["summary"]["messageCount"], 2);
    assert_eq!(body["summary"]["outboundCount"], 1);
}

#[tokio::test]
async fn test_timeline_rejects_empty_messages() {
    let app = test_app(Arc::default());
    let response = app
        .oneshot(post_json("/api/timeline", json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("messages"));
}

#[tokio::test]
async fn test_timeline_config_override() {
    let app = test_app(Arc::default());
    let response = app
        .oneshot(post_json(
            "/api/timeline/estimate",
            json!({
                "messages": [{"sender": "them", "text": "hi"}],
                "config": {"minClipLength": 12.0}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["estimatedDuration"].as_f64().unwrap(), 12.0);
}

#[tokio::test]
async fn test_conversation_schema() {
    let app = test_app(Arc::default());
    let response = app.oneshot(get("/api/schema/conversation")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["properties"]["messages"].is_object());
}

#[tokio::test]
async fn test_render_rejects_invalid_conversation() {
    let status = Arc::new(MemoryStatus::default());
    let app = test_app(status.clone());
    let response = app
        .oneshot(post_json("/api/render", json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("messages"));
    assert!(status.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_render_rejects_bad_webhook_url() {
    let app = test_app(Arc::default());
    let response = app
        .oneshot(post_json(
            "/api/render",
            json!({
                "messages": [{"sender": "you", "text": "hi"}],
                "webhookUrl": "not a url"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("webhookUrl"));
}

#[tokio::test]
async fn test_render_queue_unavailable_marks_job_failed() {
    let status = Arc::new(MemoryStatus::default());
    let app = test_app(status.clone());
    let response = app
        .oneshot(post_json(
            "/api/render",
            json!({"messages": [{"sender": "you", "text": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let records = status.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    let record = records.values().next().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("enqueue"));
}

#[tokio::test]
async fn test_render_status_lookup() {
    let status = Arc::new(MemoryStatus::default());
    let job_id = JobId::new();
    let mut record = JobStatusRecord::queued(job_id.clone());
    record.complete("https://cdn.example.com/renders/x.mp4", "x", 2048, 6.5);
    tokio_test::assert_ok!(status.save(&record).await);

    let app = test_app(status);
    let response = app
        .oneshot(get(&format!("/api/render/{}/status", job_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["jobId"], job_id.as_str());
    assert_eq!(body["status"], "completed");
    assert_eq!(body["videoUrl"], "https://cdn.example.com/renders/x.mp4");
}

#[tokio::test]
async fn test_render_status_not_found() {
    let app = test_app(Arc::default());
    let response = app
        .oneshot(get(&format!("/api/render/{}/status", JobId::new())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_render_status_rejects_malformed_id() {
    let app = test_app(Arc::default());
    let response = app
        .oneshot(get("/api/render/not-a-uuid/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
