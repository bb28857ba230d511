//! Chat messages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::Side;

/// Maximum characters allowed in a single message.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The device owner (outbound, typed on screen).
    #[serde(alias = "self")]
    You,
    /// The contact (inbound).
    #[serde(alias = "other")]
    Them,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::You => "you",
            Sender::Them => "them",
        }
    }

    /// Outbound messages are typed on the on-screen keyboard.
    pub fn is_outbound(&self) -> bool {
        matches!(self, Sender::You)
    }

    /// Screen side the bubble is drawn on.
    pub fn side(&self) -> Side {
        match self {
            Sender::You => Side::Right,
            Sender::Them => Side::Left,
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One chat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    /// Author of the message
    pub sender: Sender,

    /// Message body
    pub text: String,

    /// Explicit appearance time in seconds from the start of the clip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Message {
    /// Create a message without an explicit timestamp.
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: None,
        }
    }

    /// Shorthand for an outbound message.
    pub fn you(text: impl Into<String>) -> Self {
        Self::new(Sender::You, text)
    }

    /// Shorthand for an inbound message.
    pub fn them(text: impl Into<String>) -> Self {
        Self::new(Sender::Them, text)
    }

    /// Pin the message to an explicit appearance time.
    pub fn at(mut self, seconds: f64) -> Self {
        self.timestamp = Some(seconds);
        self
    }

    /// Text length in characters (not bytes).
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_outbound(&self) -> bool {
        self.sender.is_outbound()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_wire_names() {
        let msg: Message = serde_json::from_str(r#"{"sender":"you","text":"hi"}"#).unwrap();
        assert_eq!(msg.sender, Sender::You);
        assert!(msg.timestamp.is_none());

        let msg: Message =
            serde_json::from_str(r#"{"sender":"them","text":"yo","timestamp":3.5}"#).unwrap();
        assert_eq!(msg.sender, Sender::Them);
        assert_eq!(msg.timestamp, Some(3.5));
    }

    #[test]
    fn test_sender_aliases() {
        let msg: Message = serde_json::from_str(r#"{"sender":"self","text":"a"}"#).unwrap();
        assert_eq!(msg.sender, Sender::You);
        let msg: Message = serde_json::from_str(r#"{"sender":"other","text":"b"}"#).unwrap();
        assert_eq!(msg.sender, Sender::Them);
    }

    #[test]
    fn test_timestamp_omitted_when_absent() {
        let json = serde_json::to_string(&Message::you("hello")).unwrap();
        assert_eq!(json, r#"{"sender":"you","text":"hello"}"#);
    }

    #[test]
    fn test_char_count_is_unicode_aware() {
        assert_eq!(Message::you("héllo 👋").char_count(), 7);
    }

    #[test]
    fn test_side_from_sender() {
        assert_eq!(Sender::You.side(), Side::Right);
        assert_eq!(Sender::Them.side(), Side::Left);
    }
}
