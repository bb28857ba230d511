//! Webhook delivery of job results.
//!
//! Requests carry `x-chatclip-signature: t=<unix>,v1=<hex>` where the hex
//! value is HMAC-SHA256 over `"<t>.<body>"` keyed by the shared secret.

use std::time::Duration;

use async_trait::async_trait;
use chatclip_models::JobNotification;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Signature header name.
pub const SIGNATURE_HEADER: &str = "x-chatclip-signature";
/// Retries after the first delivery attempt.
pub const WEBHOOK_MAX_RETRIES: u32 = 2;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    Status(u16),

    #[error("Failed to serialize notification: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
}

impl NotifyError {
    /// Client errors other than timeouts and rate limits are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Request(_) => true,
            NotifyError::Status(code) => !(400..500).contains(code) || *code == 408 || *code == 429,
            NotifyError::Serialization(_) | NotifyError::InvalidKey(_) => false,
        }
    }
}

/// Redelivery schedule for a failed webhook.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: WEBHOOK_MAX_RETRIES,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl DeliveryPolicy {
    /// Wait before redelivery number `retry` (zero-based), doubling each time.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay)
    }
}

/// Delivers job notifications to a caller-supplied endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, webhook_url: &str, notification: &JobNotification) -> Result<(), NotifyError>;
}

/// Notifier POSTing JSON over HTTP.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    secret: Option<String>,
    policy: DeliveryPolicy,
}

impl WebhookNotifier {
    pub fn new(secret: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chatclip-worker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            secret,
            policy: DeliveryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn send_once(&self, webhook_url: &str, body: &[u8]) -> Result<(), NotifyError> {
        let mut request = self
            .http
            .post(webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());

        if let Some(secret) = &self.secret {
            let timestamp = chrono::Utc::now().timestamp();
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, timestamp, body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        debug!(status = status.as_u16(), "Webhook accepted");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, webhook_url: &str, notification: &JobNotification) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(notification)?;

        let mut retry = 0;
        while let Err(e) = self.send_once(webhook_url, &body).await {
            if retry >= self.policy.max_retries || !e.is_retryable() {
                return Err(e);
            }
            let delay = self.policy.backoff(retry);
            warn!(
                job_id = %notification.job_id,
                attempt = retry + 1,
                "Webhook delivery failed, retrying in {:?}: {}",
                delay,
                e
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }

        info!(
            job_id = %notification.job_id,
            status = %notification.status,
            "Webhook delivered"
        );
        Ok(())
    }
}

/// Signature header value for `body` sent at `timestamp`.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> Result<String, NotifyError> {
    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotifyError::InvalidKey(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);

    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatclip_models::{JobId, JobStatus};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification() -> JobNotification {
        JobNotification {
            job_id: JobId::from_string("abc"),
            status: JobStatus::Completed,
            video_url: Some("https://cdn.example.com/renders/abc.mp4".into()),
            file_id: Some("abc".into()),
            file_size: Some(1024),
            error: None,
        }
    }

    fn notifier(secret: Option<&str>) -> WebhookNotifier {
        let _ = rustls::crypto::ring::default_provider().install_default();
        WebhookNotifier::new(secret.map(String::from), Duration::from_secs(5))
            .unwrap()
            .with_policy(DeliveryPolicy {
                base_delay: Duration::from_millis(1),
                ..DeliveryPolicy::default()
            })
    }

    #[test]
    fn test_sign_payload_known_vector() {
        let body = br#"{"jobId":"abc","status":"completed"}"#;
        assert_eq!(
            sign_payload("topsecret", 1_700_000_000, body).unwrap(),
            "t=1700000000,v1=f2e35d1ad287c631f06b2097c2370fa9d73b866a86fa1bfa11fdb82705d2026d"
        );
    }

    #[tokio::test]
    async fn test_delivers_signed_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        notifier(Some("topsecret"))
            .notify(&format!("{}/hook", server.uri()), &notification())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["jobId"], "abc");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["fileSize"], 1024);

        let signature = requests[0]
            .headers
            .get(SIGNATURE_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let timestamp: i64 = signature
            .trim_start_matches("t=")
            .split(',')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(
            signature,
            sign_payload("topsecret", timestamp, &requests[0].body).unwrap()
        );
    }

    #[tokio::test]
    async fn test_unsigned_without_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        notifier(None).notify(&server.uri(), &notification()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get(SIGNATURE_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(u64::from(WEBHOOK_MAX_RETRIES) + 1)
            .mount(&server)
            .await;

        let result = notifier(None).notify(&server.uri(), &notification()).await;
        assert!(matches!(result, Err(NotifyError::Status(500))));
    }

    #[tokio::test]
    async fn test_client_error_not_redelivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410))
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier(None).notify(&server.uri(), &notification()).await;
        assert!(matches!(result, Err(NotifyError::Status(410))));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = DeliveryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(10), Duration::from_secs(5));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(NotifyError::Status(503).is_retryable());
        assert!(NotifyError::Status(429).is_retryable());
        assert!(NotifyError::Status(408).is_retryable());
        assert!(!NotifyError::Status(404).is_retryable());
        assert!(!NotifyError::InvalidKey("short".into()).is_retryable());
    }
}
