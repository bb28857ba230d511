//! Duration estimation and timeline summaries.

use chatclip_models::{EventKind, Message, Side, Timeline, TimelineConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::builder::build_timeline;
use crate::error::TimelineResult;

/// Compact description of a built timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSummary {
    pub total_duration: f64,
    /// Appearance time of the final bubble
    pub last_bubble_time: f64,
    pub message_count: usize,
    pub outbound_count: usize,
    pub inbound_count: usize,
    pub typing_indicator_count: usize,
    pub key_click_count: usize,
}

impl TimelineSummary {
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let mut summary = Self {
            total_duration: timeline.total_duration(),
            last_bubble_time: 0.0,
            message_count: 0,
            outbound_count: 0,
            inbound_count: 0,
            typing_indicator_count: 0,
            key_click_count: 0,
        };

        for event in timeline.events() {
            match event.kind {
                EventKind::BubbleAppear => {
                    summary.message_count += 1;
                    summary.last_bubble_time = summary.last_bubble_time.max(event.time);
                    match event.side {
                        Side::Right => summary.outbound_count += 1,
                        Side::Left => summary.inbound_count += 1,
                    }
                }
                EventKind::TypingIndicatorStart => summary.typing_indicator_count += 1,
                EventKind::KeyClick => summary.key_click_count += 1,
                _ => {}
            }
        }

        summary
    }
}

/// Clip length the given messages would render to.
///
/// Runs the full builder, so it fails exactly when building would.
pub fn estimate_duration(messages: &[Message], config: &TimelineConfig) -> TimelineResult<f64> {
    build_timeline(messages, config).map(|timeline| timeline.total_duration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimelineError;

    #[test]
    fn test_summary_counts() {
        let messages = vec![
            Message::them("Hey! How are you?"),
            Message::you("I'm doing great!"),
            Message::them("Nice"),
        ];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        let summary = TimelineSummary::from_timeline(&timeline);

        assert_eq!(summary.message_count, 3);
        assert_eq!(summary.outbound_count, 1);
        assert_eq!(summary.inbound_count, 2);
        assert_eq!(summary.typing_indicator_count, 1);
        assert_eq!(summary.key_click_count, 6);
        assert_eq!(Some(summary.last_bubble_time), timeline.bubble_time(2));
        assert_eq!(summary.total_duration, timeline.total_duration());
    }

    #[test]
    fn test_estimate_matches_builder() {
        let messages = vec![Message::you("ping"), Message::them("pong")];
        let config = TimelineConfig::default();
        let built = build_timeline(&messages, &config).unwrap();
        assert_eq!(estimate_duration(&messages, &config).unwrap(), built.total_duration());
    }

    #[test]
    fn test_estimate_propagates_validation() {
        let err = estimate_duration(&[], &TimelineConfig::default()).unwrap_err();
        assert!(matches!(err, TimelineError::Validation(_)));
    }

    #[test]
    fn test_summary_json_shape() {
        let timeline = build_timeline(&[Message::them("hi")], &TimelineConfig::default()).unwrap();
        let json = serde_json::to_value(TimelineSummary::from_timeline(&timeline)).unwrap();
        assert_eq!(json["messageCount"], 1);
        assert_eq!(json["totalDuration"], 5.0);
    }
}
