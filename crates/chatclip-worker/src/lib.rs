//! Chat video render worker.
//!
//! This crate provides:
//! - Job executor consuming render jobs from the queue
//! - The render pipeline (timeline, render, upload, status, webhook)
//! - Signed webhook notifications
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod notifier;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use notifier::{DeliveryPolicy, Notifier, NotifyError, WebhookNotifier};
pub use pipeline::RenderPipeline;

/// Install the global tracing subscriber; `LOG_FORMAT=json` switches to
/// JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,chatclip=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}
