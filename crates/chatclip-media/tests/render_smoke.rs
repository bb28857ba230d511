//! Full renders through the real ffmpeg binary.

use chatclip_media::{probe_video, FfmpegRenderer, RenderSpec, Renderer};
use chatclip_models::{Message, PresetName, ThemeName, TimelineConfig};
use chatclip_timeline::build_timeline;

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_render_preview_clip() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("chat.mp4");

    let messages = vec![
        Message::them("Hey! How are you?"),
        Message::you("I'm doing great!"),
        Message::them("Glad to hear it"),
    ];
    let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
    let spec = RenderSpec::new(PresetName::Preview.preset(), ThemeName::Whatsapp.theme(), "Alex");

    let path = FfmpegRenderer::new()
        .with_timeout(120)
        .render(&timeline, &messages, &spec, &output)
        .await
        .unwrap();

    let info = probe_video(&path).await.unwrap();
    assert_eq!((info.width, info.height), (720, 1280));
    assert!(info.has_audio);
    assert!((info.duration - timeline.total_duration()).abs() < 0.5);
}
