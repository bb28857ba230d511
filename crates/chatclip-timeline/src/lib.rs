//! Timeline construction for chat videos.
//!
//! Turns an ordered list of messages into timestamped visual and audio
//! events plus a total clip duration. Everything here is pure and
//! deterministic; renderers consume the result read-only.

pub mod builder;
pub mod error;
pub mod estimator;

pub use builder::build_timeline;
pub use error::{TimelineError, TimelineResult};
pub use estimator::{estimate_duration, TimelineSummary};
