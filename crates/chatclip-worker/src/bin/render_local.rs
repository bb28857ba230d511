//! Render a conversation file to an MP4 without the queue.
//!
//! Usage: `chatclip-render <conversation.json> <output.mp4> [preset]`

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chatclip_media::{probe_video, FfmpegRenderer, RenderSpec, Renderer};
use chatclip_models::{Conversation, PresetName};
use chatclip_timeline::{build_timeline, TimelineSummary};
use chatclip_worker::{init_tracing, WorkerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        bail!("usage: chatclip-render <conversation.json> <output.mp4> [preview|standard|high|ultra]");
    };
    let output = PathBuf::from(output);

    let raw = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("failed to read {}", input))?;
    let mut conversation: Conversation =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", input))?;

    if let Some(name) = args.next() {
        conversation.preset =
            PresetName::parse(&name).ok_or_else(|| anyhow!("unknown preset '{}'", name))?;
    }
    if let Some(reason) = conversation.validation_message() {
        bail!("invalid conversation: {}", reason);
    }

    let timeline = build_timeline(&conversation.messages, &conversation.timeline_config())?;
    let summary = TimelineSummary::from_timeline(&timeline);
    info!(
        events = timeline.events().len(),
        duration_secs = summary.total_duration,
        "Timeline built"
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let config = WorkerConfig::from_env();
    let mut renderer = FfmpegRenderer::new().with_timeout(config.ffmpeg_timeout.as_secs());
    if let Some(font) = config.font_file {
        renderer = renderer.with_font_file(font);
    }

    let spec = RenderSpec::new(
        conversation.preset.preset(),
        conversation.theme.theme(),
        conversation.contact_name.clone(),
    );
    let rendered = renderer
        .render(&timeline, &conversation.messages, &spec, &output)
        .await?;

    let info = probe_video(&rendered).await?;
    println!(
        "{} {}x{} {:.2}s {} bytes",
        rendered.display(),
        info.width,
        info.height,
        info.duration,
        info.size
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
