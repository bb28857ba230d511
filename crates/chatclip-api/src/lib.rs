//! Axum HTTP API for chat video rendering.
//!
//! This crate provides:
//! - Timeline previews and duration estimates
//! - Render job submission and status lookup
//! - Health and readiness probes
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
