//! Output quality presets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Hardware video codec
pub const NVENC_VIDEO_CODEC: &str = "h264_nvenc";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Pixel format accepted by every mobile player
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Named quality level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Fast low-resolution draft
    Preview,
    #[default]
    Standard,
    High,
    /// 60 fps, slow encode
    Ultra,
}

impl PresetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Preview => "preview",
            PresetName::Standard => "standard",
            PresetName::High => "high",
            PresetName::Ultra => "ultra",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "preview" => Some(PresetName::Preview),
            "standard" => Some(PresetName::Standard),
            "high" => Some(PresetName::High),
            "ultra" => Some(PresetName::Ultra),
            _ => None,
        }
    }

    pub fn preset(&self) -> VideoPreset {
        VideoPreset::for_name(*self)
    }
}

impl std::fmt::Display for PresetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolution, frame rate and encoder settings for one preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoPreset {
    pub name: PresetName,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Constant Rate Factor (quality, 0-51, lower is better)
    pub crf: u8,
    /// x264 speed preset (e.g., "veryfast", "medium")
    pub encoder_preset: String,
    pub audio_bitrate: String,
    /// Use hardware acceleration (NVENC)
    #[serde(default)]
    pub use_nvenc: bool,
}

impl VideoPreset {
    pub fn for_name(name: PresetName) -> Self {
        let (width, height, fps, crf, encoder_preset, audio_bitrate) = match name {
            PresetName::Preview => (720, 1280, 30, 28, "veryfast", "128k"),
            PresetName::Standard => (1080, 1920, 30, 23, "fast", "160k"),
            PresetName::High => (1080, 1920, 30, 18, "medium", "192k"),
            PresetName::Ultra => (1080, 1920, 60, 15, "slow", "256k"),
        };

        Self {
            name,
            width,
            height,
            fps,
            crf,
            encoder_preset: encoder_preset.to_string(),
            audio_bitrate: audio_bitrate.to_string(),
            use_nvenc: false,
        }
    }

    /// Enable NVENC hardware acceleration.
    pub fn with_nvenc(mut self) -> Self {
        self.use_nvenc = true;
        self
    }

    pub fn video_codec(&self) -> &'static str {
        if self.use_nvenc {
            NVENC_VIDEO_CODEC
        } else {
            DEFAULT_VIDEO_CODEC
        }
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.video_codec().to_string(),
            "-preset".to_string(),
            self.encoder_preset.clone(),
        ];

        // NVENC has no CRF, it takes -cq
        if self.use_nvenc {
            args.extend_from_slice(&["-cq".to_string(), self.crf.to_string()]);
        } else {
            args.extend_from_slice(&["-crf".to_string(), self.crf.to_string()]);
        }

        args.extend_from_slice(&[
            "-pix_fmt".to_string(),
            DEFAULT_PIXEL_FORMAT.to_string(),
            "-r".to_string(),
            self.fps.to_string(),
            "-c:a".to_string(),
            DEFAULT_AUDIO_CODEC.to_string(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);

        args
    }
}

impl Default for VideoPreset {
    fn default() -> Self {
        Self::for_name(PresetName::default())
    }
}
