//! Shared data models for the ChatClip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Chat messages and render requests
//! - Timeline events and pacing configuration
//! - Quality presets and themes
//! - Job identifiers, status records and webhook payloads

pub mod conversation;
pub mod event;
pub mod job;
pub mod job_status;
pub mod message;
pub mod notification;
pub mod preset;
pub mod theme;
pub mod timing;

// Re-export common types
pub use conversation::Conversation;
pub use event::{EventKind, Side, Timeline, TimelineEvent};
pub use job::JobId;
pub use job_status::{JobStatus, JobStatusRecord};
pub use message::{Message, Sender, MAX_MESSAGE_CHARS};
pub use notification::JobNotification;
pub use preset::{PresetName, VideoPreset};
pub use theme::{ChatTheme, ThemeName};
pub use timing::TimelineConfig;
