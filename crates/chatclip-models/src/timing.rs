//! Tunable pacing constants for timeline construction.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default pause between consecutive messages (seconds)
pub const DEFAULT_INTER_MESSAGE_GAP: f64 = 2.0;
/// Default simulated typing speed for outbound messages
pub const DEFAULT_TYPING_CHARS_PER_SECOND: f64 = 11.0;
/// Default delay between end of typing and the bubble appearing
pub const DEFAULT_POST_TYPING_GAP: f64 = 0.18;
/// Default "..." display time before an inbound reply
pub const DEFAULT_INCOMING_TYPING_INDICATOR: f64 = 1.2;
/// Default delay before the "Delivered" label
pub const DEFAULT_DELIVERED_TAIL_DELAY: f64 = 0.6;
/// Default silence at the end of the clip
pub const DEFAULT_TRAILING_BUFFER: f64 = 2.0;
/// Default minimum clip length
pub const DEFAULT_MIN_CLIP_LENGTH: f64 = 5.0;
/// Default cap on messages per conversation
pub const DEFAULT_MAX_MESSAGES: usize = 100;
/// Default keyboard slide-up time before typing starts
pub const DEFAULT_KEYBOARD_LEAD: f64 = 0.8;
/// Default keyboard linger time after typing ends
pub const DEFAULT_KEYBOARD_TRAIL: f64 = 0.3;

/// Pacing configuration for the timeline builder.
///
/// Every field may be overridden individually in JSON; missing fields fall
/// back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineConfig {
    pub inter_message_gap: f64,
    pub typing_chars_per_second: f64,
    pub post_typing_gap: f64,
    pub incoming_typing_indicator_duration: f64,
    pub delivered_tail_delay: f64,
    /// Appearance offset of the first message
    pub initial_lead_in: f64,
    pub trailing_buffer: f64,
    pub min_clip_length: f64,
    pub max_messages: usize,
    pub keyboard_lead: f64,
    pub keyboard_trail: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            inter_message_gap: DEFAULT_INTER_MESSAGE_GAP,
            typing_chars_per_second: DEFAULT_TYPING_CHARS_PER_SECOND,
            post_typing_gap: DEFAULT_POST_TYPING_GAP,
            incoming_typing_indicator_duration: DEFAULT_INCOMING_TYPING_INDICATOR,
            delivered_tail_delay: DEFAULT_DELIVERED_TAIL_DELAY,
            initial_lead_in: 0.0,
            trailing_buffer: DEFAULT_TRAILING_BUFFER,
            min_clip_length: DEFAULT_MIN_CLIP_LENGTH,
            max_messages: DEFAULT_MAX_MESSAGES,
            keyboard_lead: DEFAULT_KEYBOARD_LEAD,
            keyboard_trail: DEFAULT_KEYBOARD_TRAIL,
        }
    }
}

impl TimelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with a different message cap.
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// Returns a new config with a different first-message offset.
    pub fn with_initial_lead_in(mut self, seconds: f64) -> Self {
        self.initial_lead_in = seconds;
        self
    }

    /// Check that all values are usable.
    ///
    /// Durations must be finite and non-negative, the typing speed strictly
    /// positive, and the message cap at least one.
    pub fn validate(&self) -> Result<(), String> {
        let durations = [
            ("interMessageGap", self.inter_message_gap),
            ("postTypingGap", self.post_typing_gap),
            (
                "incomingTypingIndicatorDuration",
                self.incoming_typing_indicator_duration,
            ),
            ("deliveredTailDelay", self.delivered_tail_delay),
            ("initialLeadIn", self.initial_lead_in),
            ("trailingBuffer", self.trailing_buffer),
            ("minClipLength", self.min_clip_length),
            ("keyboardLead", self.keyboard_lead),
            ("keyboardTrail", self.keyboard_trail),
        ];

        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "config.{} must be a finite, non-negative number (got {})",
                    name, value
                ));
            }
        }

        if !self.typing_chars_per_second.is_finite() || self.typing_chars_per_second <= 0.0 {
            return Err(format!(
                "config.typingCharsPerSecond must be greater than zero (got {})",
                self.typing_chars_per_second
            ));
        }

        if self.max_messages == 0 {
            return Err("config.maxMessages must be at least 1".to_string());
        }

        Ok(())
    }
}
