//! FFmpeg progress reporting.

use serde::{Deserialize, Serialize};

/// Progress snapshot parsed from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Encoded output position in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_ms.max(0) as f64 / 1000.0
    }

    /// Progress percentage of a clip `total_secs` long.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_secs() / total_secs * 100.0).min(100.0)
    }

    /// Estimated seconds until the encode finishes.
    pub fn eta_seconds(&self, total_secs: f64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }
        let remaining = total_secs - self.out_time_secs();
        Some((remaining / self.speed).max(0.0))
    }
}
