//! Rendering a timeline into an MP4.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chatclip_models::{ChatTheme, Message, Timeline, VideoPreset};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::layout::ChatLayout;
use crate::mixer::{mix_timeline, write_wav};
use crate::scene::{background_source, build_filter_graph, SceneAssets, VIDEO_LABEL};
use crate::sounds::{CueBank, DEFAULT_NOISE_SEED};

/// Prefix of the scratch directory created next to the output.
pub const SCRATCH_PREFIX: &str = ".chatclip-";

/// Frame and styling parameters for a render.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub preset: VideoPreset,
    pub theme: ChatTheme,
    pub contact_name: String,
}

impl RenderSpec {
    /// Frame size and rate follow the preset.
    pub fn new(preset: VideoPreset, theme: ChatTheme, contact_name: impl Into<String>) -> Self {
        Self {
            width: preset.width,
            height: preset.height,
            fps: preset.fps,
            preset,
            theme,
            contact_name: contact_name.into(),
        }
    }

    /// Override the frame size.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Turns a timeline into a playable media file.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `timeline` for `messages` into `output`, returning the path
    /// of the finished file.
    async fn render(
        &self,
        timeline: &Timeline,
        messages: &[Message],
        spec: &RenderSpec,
        output: &Path,
    ) -> MediaResult<PathBuf>;
}

/// Renderer driving the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    timeout_secs: Option<u64>,
    cancel_rx: Option<watch::Receiver<bool>>,
    font_file: Option<PathBuf>,
    noise_seed: u64,
}

impl Default for FfmpegRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRenderer {
    pub fn new() -> Self {
        Self {
            timeout_secs: None,
            cancel_rx: None,
            font_file: None,
            noise_seed: DEFAULT_NOISE_SEED,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }

    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = seed;
        self
    }

    /// Write the soundtrack and text files, returning the audio path and
    /// scene assets.
    pub async fn prepare_assets(
        &self,
        timeline: &Timeline,
        layout: &ChatLayout,
        spec: &RenderSpec,
        dir: &Path,
    ) -> MediaResult<(PathBuf, SceneAssets)> {
        tokio::fs::create_dir_all(dir).await?;

        let audio_path = dir.join("soundtrack.wav");
        let bank = CueBank::synthesize(self.noise_seed);
        let samples = mix_timeline(timeline, &bank);
        let wav_path = audio_path.clone();
        tokio::task::spawn_blocking(move || write_wav(&wav_path, &samples))
            .await
            .map_err(|e| MediaError::internal(format!("Audio writer task failed: {}", e)))??;

        let title_file = dir.join("title.txt");
        tokio::fs::write(&title_file, spec.contact_name.as_bytes()).await?;

        let mut bubble_files = Vec::with_capacity(layout.bubbles.len());
        for bubble in &layout.bubbles {
            let path = dir.join(format!("bubble_{}.txt", bubble.message_index));
            tokio::fs::write(&path, bubble.text().as_bytes()).await?;
            bubble_files.push(path);
        }

        Ok((
            audio_path,
            SceneAssets {
                title_file,
                bubble_files,
                font_file: self.font_file.clone(),
            },
        ))
    }

    /// Assemble the full ffmpeg invocation.
    pub fn build_command(
        &self,
        timeline: &Timeline,
        layout: &ChatLayout,
        spec: &RenderSpec,
        audio_path: &Path,
        assets: &SceneAssets,
        output: &Path,
    ) -> FfmpegCommand {
        let duration = timeline.total_duration();
        let graph = build_filter_graph(timeline, layout, &spec.theme, assets);

        FfmpegCommand::new(output)
            .lavfi_input(background_source(
                spec.theme.background,
                spec.width,
                spec.height,
                spec.fps,
                duration,
            ))
            .input(audio_path)
            .filter_complex(graph)
            .map(VIDEO_LABEL)
            .map("1:a")
            .output_args(spec.preset.to_ffmpeg_args())
            .duration(duration)
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn render(
        &self,
        timeline: &Timeline,
        messages: &[Message],
        spec: &RenderSpec,
        output: &Path,
    ) -> MediaResult<PathBuf> {
        if spec.width == 0 || spec.height == 0 || spec.fps == 0 {
            return Err(MediaError::invalid_input(format!(
                "invalid frame {}x{}@{}",
                spec.width, spec.height, spec.fps
            )));
        }

        let started = Instant::now();
        let work_dir = output.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(work_dir)?;
        let assets_dir = scratch.path().to_path_buf();

        let layout = ChatLayout::compute(messages, spec.width, spec.height);
        let hidden = layout.bubbles.iter().filter(|b| !b.visible).count();
        if hidden > 0 {
            debug!(hidden, "Bubbles below the visible area are not drawn");
        }

        let (audio_path, assets) = self
            .prepare_assets(timeline, &layout, spec, &assets_dir)
            .await?;
        let cmd = self.build_command(timeline, &layout, spec, &audio_path, &assets, output);

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if let Some(cancel_rx) = &self.cancel_rx {
            runner = runner.with_cancel(cancel_rx.clone());
        }

        let total = timeline.total_duration();
        let result = runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    percent = progress.percentage(total),
                    speed = progress.speed,
                    "Render progress"
                );
            })
            .await;

        if let Err(e) = scratch.close() {
            warn!("Failed to remove {}: {}", assets_dir.display(), e);
        }
        result?;

        if !output.exists() {
            return Err(MediaError::FileNotFound(output.to_path_buf()));
        }

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("chatclip_render_duration_seconds").record(elapsed);
        info!(
            output = %output.display(),
            duration_secs = total,
            elapsed_secs = elapsed,
            "Rendered chat video"
        );

        Ok(output.to_path_buf())
    }
}
