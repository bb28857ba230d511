//! FFmpeg filter graph for a chat scene.
//!
//! Every visual element is a `drawbox`/`drawtext` filter on a solid
//! background, switched on by an `enable` expression derived from the
//! timeline. Text is read from files to avoid filtergraph escaping of
//! user content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chatclip_models::{ChatTheme, EventKind, Side, Timeline};

use crate::layout::{ChatLayout, Rect};

/// Output label of the composed video stream.
pub const VIDEO_LABEL: &str = "[v]";

/// Files the scene reads at render time.
#[derive(Debug, Clone, Default)]
pub struct SceneAssets {
    /// Contact name shown in the header
    pub title_file: PathBuf,
    /// Wrapped text per message, indexed by message
    pub bubble_files: Vec<PathBuf>,
    /// Font to draw with; fontconfig's default sans when absent
    pub font_file: Option<PathBuf>,
}

/// Visibility windows derived from the timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneTimes {
    pub bubbles: HashMap<usize, f64>,
    pub typing: Vec<(usize, f64, f64)>,
    pub keyboard: Option<(f64, f64)>,
    pub delivered: Option<(usize, f64)>,
}

impl SceneTimes {
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let mut times = Self::default();
        let mut typing_start: HashMap<usize, f64> = HashMap::new();
        let mut keyboard_show = None;

        for event in timeline.events() {
            match event.kind {
                EventKind::BubbleAppear => {
                    times.bubbles.insert(event.message_index, event.time);
                }
                EventKind::TypingIndicatorStart => {
                    typing_start.insert(event.message_index, event.time);
                }
                EventKind::TypingIndicatorEnd => {
                    if let Some(start) = typing_start.remove(&event.message_index) {
                        times.typing.push((event.message_index, start, event.time));
                    }
                }
                EventKind::KeyboardShow => keyboard_show = Some(event.time),
                EventKind::KeyboardHide => {
                    if let Some(show) = keyboard_show.take() {
                        times.keyboard = Some((show, event.time));
                    }
                }
                EventKind::DeliveredShown => {
                    times.delivered = Some((event.message_index, event.time));
                }
                EventKind::KeyClick | EventKind::SendChime | EventKind::ReceiveChime => {}
            }
        }

        times
    }
}

/// Build the `-filter_complex` graph reading the background from input 0.
pub fn build_filter_graph(
    timeline: &Timeline,
    layout: &ChatLayout,
    theme: &ChatTheme,
    assets: &SceneAssets,
) -> String {
    let times = SceneTimes::from_timeline(timeline);
    let font = font_option(assets.font_file.as_deref());
    let mut filters = Vec::new();

    // Message text is user input; `%{...}` must not be expanded.
    filters.push(drawbox(&layout.header, theme.header_background, None));
    filters.push(format!(
        "drawtext={}:expansion=none:textfile='{}':fontcolor={}:fontsize={}:x=(w-text_w)/2:y={}",
        font,
        escape_path(&assets.title_file),
        ffmpeg_color(theme.header_text),
        layout.font_size,
        layout.title_y,
    ));

    for &(index, start, end) in &times.typing {
        let Some(rect) = layout
            .typing_rect(index)
            .filter(|r| r.bottom() <= layout.content_bottom)
        else {
            continue;
        };
        let enable = format!("between(t,{:.3},{:.3})", start, end);
        filters.push(drawbox(&rect, theme.received_bubble, Some(&enable)));
        filters.push(format!(
            "drawtext={}:expansion=none:text='...':fontcolor={}:fontsize={}:x={}+({}-text_w)/2:y={}+({}-text_h)/2:enable='{}'",
            font,
            ffmpeg_color(theme.typing_dot),
            layout.font_size,
            rect.x,
            rect.width,
            rect.y,
            rect.height,
            enable,
        ));
    }

    for bubble in layout.bubbles.iter().filter(|b| b.visible) {
        let Some(appear) = times.bubbles.get(&bubble.message_index) else {
            continue;
        };
        let Some(text_file) = assets.bubble_files.get(bubble.message_index) else {
            continue;
        };

        let (fill, text_color) = match bubble.side {
            Side::Right => (theme.sent_bubble, theme.sent_text),
            Side::Left => (theme.received_bubble, theme.received_text),
        };
        let enable = format!("gte(t,{:.3})", appear);

        filters.push(drawbox(&bubble.rect, fill, Some(&enable)));
        filters.push(format!(
            "drawtext={}:expansion=none:textfile='{}':fontcolor={}:fontsize={}:line_spacing={}:x={}:y={}:enable='{}'",
            font,
            escape_path(text_file),
            ffmpeg_color(text_color),
            layout.font_size,
            layout.line_spacing,
            bubble.text_x,
            bubble.text_y,
            enable,
        ));
    }

    if let Some((index, at)) = times.delivered {
        if let Some(bubble) = layout.bubble(index).filter(|b| b.visible) {
            filters.push(format!(
                "drawtext={}:expansion=none:text='Delivered':fontcolor={}:fontsize={}:x={}-text_w:y={}:enable='gte(t,{:.3})'",
                font,
                ffmpeg_color(theme.delivered_text),
                layout.delivered_font_size,
                bubble.rect.x + bubble.rect.width,
                bubble.rect.bottom() + layout.delivered_offset,
                at,
            ));
        }
    }

    // Drawn last so it covers bubbles underneath
    if let Some((show, hide)) = times.keyboard {
        let enable = format!("between(t,{:.3},{:.3})", show, hide);
        filters.push(drawbox(&layout.keyboard, theme.keyboard_background, Some(&enable)));
    }

    format!("[0:v]{}{}", filters.join(","), VIDEO_LABEL)
}

/// Background source for input 0.
pub fn background_source(color: &str, width: u32, height: u32, fps: u32, duration: f64) -> String {
    format!(
        "color=c={}:s={}x{}:r={}:d={:.3}",
        ffmpeg_color(color),
        width,
        height,
        fps,
        duration
    )
}

fn drawbox(rect: &Rect, color: &str, enable: Option<&str>) -> String {
    let mut filter = format!(
        "drawbox=x={}:y={}:w={}:h={}:color={}:t=fill",
        rect.x,
        rect.y,
        rect.width,
        rect.height,
        ffmpeg_color(color)
    );
    if let Some(enable) = enable {
        filter.push_str(&format!(":enable='{}'", enable));
    }
    filter
}

fn font_option(font_file: Option<&Path>) -> String {
    match font_file {
        Some(path) => format!("fontfile='{}'", escape_path(path)),
        None => "font='Sans'".to_string(),
    }
}

/// Convert `#RRGGBB` to FFmpeg's `0xRRGGBB`.
pub fn ffmpeg_color(hex: &str) -> String {
    format!("0x{}", hex.trim_start_matches('#'))
}

/// Escape a path for use inside a quoted filter option.
fn escape_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}
