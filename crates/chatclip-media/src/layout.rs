//! Static screen layout of the chat.
//!
//! Geometry is designed on a 390-point-wide phone screen and scaled to the
//! output width. Bubbles stack top-down under the header in conversation
//! order; a bubble that would extend past the bottom of the frame is marked
//! hidden and never drawn.

use chatclip_models::{Message, Side};

/// Width of the reference phone screen in points.
const DESIGN_WIDTH: f64 = 390.0;
const STATUS_BAR_HEIGHT: f64 = 44.0;
const HEADER_HEIGHT: f64 = 52.0;
const FONT_SIZE: f64 = 17.0;
const LINE_HEIGHT: f64 = 1.25;
const PADDING_X: f64 = 14.0;
const PADDING_Y: f64 = 8.0;
const SIDE_MARGIN: f64 = 12.0;
const BUBBLE_GAP: f64 = 8.0;
/// Bubble text wraps at this share of the screen width.
const MAX_BUBBLE_WIDTH_RATIO: f64 = 0.78;
/// Average glyph advance relative to font size.
const CHAR_WIDTH_RATIO: f64 = 0.55;
const KEYBOARD_HEIGHT: f64 = 300.0;
const TYPING_BUBBLE_WIDTH: f64 = 64.0;
const TYPING_BUBBLE_HEIGHT: f64 = 38.0;
const DELIVERED_FONT_SIZE: f64 = 11.0;

/// Axis-aligned rectangle in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Placement of one message bubble.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleLayout {
    pub message_index: usize,
    pub side: Side,
    pub rect: Rect,
    /// Wrapped text, one entry per line
    pub lines: Vec<String>,
    pub text_x: u32,
    pub text_y: u32,
    /// False when the bubble falls below the visible area
    pub visible: bool,
}

impl BubbleLayout {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Full-frame layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatLayout {
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    pub line_spacing: u32,
    pub header: Rect,
    /// Baseline area of the contact name inside the header
    pub title_y: u32,
    pub keyboard: Rect,
    /// Lowest pixel row a bubble may reach; the keyboard top whenever a
    /// sent message makes it slide in
    pub content_bottom: u32,
    pub bubbles: Vec<BubbleLayout>,
    pub delivered_font_size: u32,
    /// Extra pixels between a bubble's bottom and the "Delivered" label
    pub delivered_offset: u32,
    pub typing_size: (u32, u32),
}

impl ChatLayout {
    /// Lay out `messages` on a `width` x `height` frame.
    pub fn compute(messages: &[Message], width: u32, height: u32) -> Self {
        let scale = width as f64 / DESIGN_WIDTH;
        let px = |points: f64| (points * scale).round() as u32;

        let font_size = px(FONT_SIZE).max(1);
        let line_height = (FONT_SIZE * LINE_HEIGHT * scale).round() as u32;
        let char_width = FONT_SIZE * CHAR_WIDTH_RATIO * scale;

        let header_bottom = px(STATUS_BAR_HEIGHT + HEADER_HEIGHT);
        let header = Rect {
            x: 0,
            y: 0,
            width,
            height: header_bottom,
        };

        let keyboard_height = px(KEYBOARD_HEIGHT).min(height);
        let keyboard = Rect {
            x: 0,
            y: height - keyboard_height,
            width,
            height: keyboard_height,
        };

        let uses_keyboard = messages.iter().any(|m| m.sender.side() == Side::Right);
        let content_bottom = if uses_keyboard { keyboard.y } else { height };

        let pad_x = px(PADDING_X);
        let pad_y = px(PADDING_Y);
        let margin = px(SIDE_MARGIN);
        let gap = px(BUBBLE_GAP);

        let max_text_width = width as f64 * MAX_BUBBLE_WIDTH_RATIO - 2.0 * pad_x as f64;
        let max_chars = ((max_text_width / char_width).floor() as usize).max(1);

        let mut y = header_bottom + gap;
        let mut bubbles = Vec::with_capacity(messages.len());

        for (index, message) in messages.iter().enumerate() {
            let lines = wrap_text(&message.text, max_chars);
            let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

            let text_width = (longest as f64 * char_width).ceil() as u32;
            let bubble_width = (text_width + 2 * pad_x).min(width.saturating_sub(2 * margin));
            let bubble_height = lines.len() as u32 * line_height + 2 * pad_y;

            let side = message.sender.side();
            let x = match side {
                Side::Right => width.saturating_sub(margin + bubble_width),
                Side::Left => margin,
            };

            let rect = Rect {
                x,
                y,
                width: bubble_width,
                height: bubble_height,
            };

            bubbles.push(BubbleLayout {
                message_index: index,
                side,
                rect,
                lines,
                text_x: x + pad_x,
                text_y: y + pad_y,
                visible: rect.bottom() <= content_bottom,
            });

            y += bubble_height + gap;
        }

        Self {
            width,
            height,
            font_size,
            line_spacing: line_height.saturating_sub(font_size),
            header,
            title_y: px(STATUS_BAR_HEIGHT) + (px(HEADER_HEIGHT).saturating_sub(font_size)) / 2,
            keyboard,
            content_bottom,
            bubbles,
            delivered_font_size: px(DELIVERED_FONT_SIZE).max(1),
            delivered_offset: px(2.0),
            typing_size: (px(TYPING_BUBBLE_WIDTH), px(TYPING_BUBBLE_HEIGHT)),
        }
    }

    pub fn bubble(&self, message_index: usize) -> Option<&BubbleLayout> {
        self.bubbles.get(message_index)
    }

    /// Rectangle of the "..." bubble shown before a message arrives.
    pub fn typing_rect(&self, message_index: usize) -> Option<Rect> {
        let bubble = self.bubble(message_index)?;
        let (width, height) = self.typing_size;
        Some(Rect {
            x: bubble.rect.x,
            y: bubble.rect.y,
            width,
            height,
        })
    }
}

/// Greedy word wrap at `max_chars` characters per line.
///
/// Words longer than a line are split. Explicit newlines are kept.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.trim().lines() {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };

            if needed > max_chars && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }

            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }

        if current_len > 0 || lines.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_short_text() {
        assert_eq!(wrap_text("hello world", 20), vec!["hello world"]);
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(wrap_text("abcdefghij xy", 4), vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_wrap_keeps_newlines() {
        assert_eq!(wrap_text("one\ntwo", 20), vec!["one", "two"]);
    }

    #[test]
    fn test_sides_and_stacking() {
        let messages = vec![Message::them("hi"), Message::you("hello there")];
        let layout = ChatLayout::compute(&messages, 1080, 1920);

        let left = layout.bubble(0).unwrap();
        let right = layout.bubble(1).unwrap();
        assert_eq!(left.side, Side::Left);
        assert_eq!(right.side, Side::Right);
        assert!(left.rect.x < right.rect.x);
        assert!(right.rect.x + right.rect.width <= 1080);
        assert!(right.rect.y > left.rect.bottom());
        assert!(left.rect.y >= layout.header.bottom());
        assert!(left.visible && right.visible);
    }

    #[test]
    fn test_bubble_width_capped() {
        let long = "word ".repeat(80);
        let layout = ChatLayout::compute(&[Message::you(long)], 1080, 1920);
        let bubble = layout.bubble(0).unwrap();
        assert!(bubble.lines.len() > 1);
        assert!(bubble.rect.width as f64 <= 1080.0 * MAX_BUBBLE_WIDTH_RATIO + 1.0);
    }

    #[test]
    fn test_overflow_marked_hidden() {
        let messages: Vec<Message> = (0..40).map(|i| Message::them(format!("line {}", i))).collect();
        let layout = ChatLayout::compute(&messages, 720, 1280);
        assert!(layout.bubbles[0].visible);
        assert!(!layout.bubbles[39].visible);
    }

    #[test]
    fn test_scales_with_width() {
        let small = ChatLayout::compute(&[Message::you("x")], 720, 1280);
        let large = ChatLayout::compute(&[Message::you("x")], 1080, 1920);
        assert!(large.font_size > small.font_size);
        assert_eq!(large.keyboard.bottom(), 1920);
    }

    #[test]
    fn test_bubbles_under_keyboard_hidden() {
        let mut messages: Vec<Message> = (0..40).map(|i| Message::them(format!("m{}", i))).collect();
        messages.push(Message::you("sent"));
        let layout = ChatLayout::compute(&messages, 720, 1280);

        assert_eq!(layout.content_bottom, layout.keyboard.y);
        assert!(layout.keyboard.y < 1280);
        for bubble in &layout.bubbles {
            assert_eq!(bubble.visible, bubble.rect.bottom() <= layout.keyboard.y);
        }
        let crossing = layout
            .bubbles
            .iter()
            .find(|b| b.rect.bottom() > layout.keyboard.y)
            .unwrap();
        assert!(!crossing.visible);
    }

    #[test]
    fn test_no_keyboard_without_sent_messages() {
        let layout = ChatLayout::compute(&[Message::them("hi")], 720, 1280);
        assert_eq!(layout.content_bottom, 1280);
    }
}
