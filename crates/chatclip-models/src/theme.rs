//! Visual themes for chat rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Named chat look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Imessage,
    Whatsapp,
    Snapchat,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Imessage => "imessage",
            ThemeName::Whatsapp => "whatsapp",
            ThemeName::Snapchat => "snapchat",
        }
    }

    /// Parse a theme name, falling back to `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "imessage" => Some(ThemeName::Imessage),
            "whatsapp" => Some(ThemeName::Whatsapp),
            "snapchat" => Some(ThemeName::Snapchat),
            _ => None,
        }
    }

    /// Resolve the color palette.
    pub fn theme(&self) -> ChatTheme {
        ChatTheme::for_name(*self)
    }
}

impl std::fmt::Display for ThemeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Color palette of a theme. Colors are `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTheme {
    pub name: ThemeName,
    pub sent_bubble: &'static str,
    pub received_bubble: &'static str,
    pub sent_text: &'static str,
    pub received_text: &'static str,
    pub background: &'static str,
    pub header_background: &'static str,
    pub header_text: &'static str,
    pub typing_dot: &'static str,
    pub keyboard_background: &'static str,
    pub delivered_text: &'static str,
}

impl ChatTheme {
    pub fn for_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Imessage => Self {
                name,
                sent_bubble: "#007AFF",
                received_bubble: "#E5E5EA",
                sent_text: "#FFFFFF",
                received_text: "#000000",
                background: "#FFFFFF",
                header_background: "#F2F2F7",
                header_text: "#007AFF",
                typing_dot: "#6E6E73",
                keyboard_background: "#D1D4DA",
                delivered_text: "#8E8E93",
            },
            ThemeName::Whatsapp => Self {
                name,
                sent_bubble: "#25D366",
                received_bubble: "#FFFFFF",
                sent_text: "#FFFFFF",
                received_text: "#000000",
                background: "#E5DDD5",
                header_background: "#075E54",
                header_text: "#FFFFFF",
                typing_dot: "#9E9E9E",
                keyboard_background: "#F0F0F0",
                delivered_text: "#9E9E9E",
            },
            ThemeName::Snapchat => Self {
                name,
                sent_bubble: "#FFFC00",
                received_bubble: "#F5F5F5",
                sent_text: "#000000",
                received_text: "#000000",
                background: "#FFFFFF",
                header_background: "#FFFC00",
                header_text: "#000000",
                typing_dot: "#9E9E9E",
                keyboard_background: "#F8F8F8",
                delivered_text: "#9E9E9E",
            },
        }
    }
}

impl Default for ChatTheme {
    fn default() -> Self {
        Self::for_name(ThemeName::default())
    }
}
