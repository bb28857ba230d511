//! Chat video rendering on top of the FFmpeg CLI.
//!
//! This crate provides:
//! - A `Renderer` capability and its FFmpeg implementation
//! - FFmpeg command building with progress tracking and cancellation
//! - Procedural sound cues and soundtrack mixing
//! - Static bubble layout and the drawbox/drawtext scene graph
//! - Video probing

pub mod command;
pub mod error;
pub mod layout;
pub mod mixer;
pub mod probe;
pub mod progress;
pub mod renderer;
pub mod scene;
pub mod sounds;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use layout::{BubbleLayout, ChatLayout, Rect};
pub use mixer::{mix_timeline, write_wav};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use renderer::{FfmpegRenderer, RenderSpec, Renderer};
pub use sounds::{CueBank, SAMPLE_RATE};
