//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use uuid::Uuid;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "chatclip_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "chatclip_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "chatclip_http_requests_in_flight";

    pub const JOBS_ENQUEUED_TOTAL: &str = "chatclip_jobs_enqueued_total";
    pub const JOBS_REJECTED_TOTAL: &str = "chatclip_jobs_rejected_total";
    pub const TIMELINES_BUILT_TOTAL: &str = "chatclip_timelines_built_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "chatclip_rate_limit_hits_total";
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_enqueued(preset: &str) {
    let labels = [("preset", preset.to_string())];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Record a render submission that failed validation.
pub fn record_job_rejected() {
    counter!(names::JOBS_REJECTED_TOTAL).increment(1);
}

pub fn record_timeline_built() {
    counter!(names::TIMELINES_BUILT_TOTAL).increment(1);
}

pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Replace ids in a path so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let is_id = Uuid::parse_str(segment).is_ok()
                || (!segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()));
            if is_id {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/render/550e8400-e29b-41d4-a716-446655440000/status"),
            "/api/render/:id/status"
        );
        assert_eq!(sanitize_path("/api/render/42/status"), "/api/render/:id/status");
        assert_eq!(sanitize_path("/api/timeline"), "/api/timeline");
        assert_eq!(sanitize_path("/"), "/");
    }
}
