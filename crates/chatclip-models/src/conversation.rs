//! Render request body.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Message, PresetName, ThemeName, TimelineConfig};

fn default_contact_name() -> String {
    "Contact".to_string()
}

/// A conversation to render into a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Messages in conversation order
    #[validate(length(min = 1, message = "messages must not be empty"))]
    pub messages: Vec<Message>,

    /// Name shown in the chat header
    #[serde(default = "default_contact_name")]
    #[validate(length(min = 1, max = 64, message = "contactName must be 1-64 characters"))]
    pub contact_name: String,

    #[serde(default)]
    pub theme: ThemeName,

    #[serde(default)]
    pub preset: PresetName,

    /// Pacing overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TimelineConfig>,

    /// Endpoint notified when the render finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "webhookUrl must be a valid URL"))]
    pub webhook_url: Option<String>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            contact_name: default_contact_name(),
            theme: ThemeName::default(),
            preset: PresetName::default(),
            config: None,
            webhook_url: None,
        }
    }

    pub fn with_contact_name(mut self, name: impl Into<String>) -> Self {
        self.contact_name = name.into();
        self
    }

    pub fn with_theme(mut self, theme: ThemeName) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_preset(mut self, preset: PresetName) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Pacing config, falling back to defaults.
    pub fn timeline_config(&self) -> TimelineConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Flatten validator errors into one human-readable line.
    pub fn validation_message(&self) -> Option<String> {
        let errors = self.validate().err()?;
        let mut parts: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        parts.sort();
        Some(parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let conv: Conversation =
            serde_json::from_str(r#"{"messages":[{"sender":"you","text":"hi"}]}"#).unwrap();
        assert_eq!(conv.contact_name, "Contact");
        assert_eq!(conv.theme, ThemeName::Imessage);
        assert_eq!(conv.preset, PresetName::Standard);
        assert!(conv.config.is_none());
        assert!(conv.validate().is_ok());
    }

    #[test]
    fn test_empty_messages_rejected() {
        let conv = Conversation::new(vec![]);
        let msg = conv.validation_message().unwrap();
        assert!(msg.contains("messages"));
    }

    #[test]
    fn test_bad_webhook_rejected() {
        let conv = Conversation::new(vec![Message::you("hi")]).with_webhook("not a url");
        assert!(conv.validation_message().unwrap().contains("webhookUrl"));
    }

    #[test]
    fn test_long_contact_name_rejected() {
        let conv = Conversation::new(vec![Message::you("hi")]).with_contact_name("x".repeat(65));
        assert!(conv.validate().is_err());
    }

    #[test]
    fn test_camel_case_fields() {
        let conv = Conversation::new(vec![Message::them("yo")])
            .with_contact_name("Sam")
            .with_webhook("https://example.com/hook");
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["contactName"], "Sam");
        assert_eq!(json["webhookUrl"], "https://example.com/hook");
        assert!(json.get("config").is_none());
    }
}
