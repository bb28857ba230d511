//! Timeline events consumed by renderers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of a scheduled occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// "..." bubble starts showing (contact is typing)
    TypingIndicatorStart,
    /// "..." bubble disappears
    TypingIndicatorEnd,
    /// Message bubble slides in
    BubbleAppear,
    /// Keyboard click sound while typing an outbound message
    KeyClick,
    /// Outbound "whoosh" chime
    SendChime,
    /// Inbound chime
    ReceiveChime,
    /// On-screen keyboard slides up
    KeyboardShow,
    /// On-screen keyboard slides down
    KeyboardHide,
    /// "Delivered" label under the final outbound bubble
    DeliveredShown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TypingIndicatorStart => "typingIndicatorStart",
            EventKind::TypingIndicatorEnd => "typingIndicatorEnd",
            EventKind::BubbleAppear => "bubbleAppear",
            EventKind::KeyClick => "keyClick",
            EventKind::SendChime => "sendChime",
            EventKind::ReceiveChime => "receiveChime",
            EventKind::KeyboardShow => "keyboardShow",
            EventKind::KeyboardHide => "keyboardHide",
            EventKind::DeliveredShown => "deliveredShown",
        }
    }

    /// Nominal length of the occurrence in seconds.
    ///
    /// Audio cues last as long as their sample; the bubble entry animation
    /// takes a little under half a second. Markers have no length.
    pub fn nominal_duration(&self) -> f64 {
        match self {
            EventKind::SendChime => 0.3,
            EventKind::ReceiveChime => 0.2,
            EventKind::KeyClick => 0.008,
            EventKind::BubbleAppear => 0.4,
            EventKind::TypingIndicatorStart
            | EventKind::TypingIndicatorEnd
            | EventKind::KeyboardShow
            | EventKind::KeyboardHide
            | EventKind::DeliveredShown => 0.0,
        }
    }

    /// Whether the event triggers a sound.
    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            EventKind::KeyClick | EventKind::SendChime | EventKind::ReceiveChime
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Screen side of a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// One schedulable occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub kind: EventKind,
    /// Seconds from timeline start
    pub time: f64,
    /// Index of the originating message
    pub message_index: usize,
    pub side: Side,
}

impl TimelineEvent {
    pub fn new(kind: EventKind, time: f64, message_index: usize, side: Side) -> Self {
        Self {
            kind,
            time,
            message_index,
            side,
        }
    }

    /// Time at which the occurrence is over.
    pub fn end_time(&self) -> f64 {
        self.time + self.kind.nominal_duration()
    }
}

/// Complete plan driving a render.
///
/// Events are grouped per message in conversation order. A timeline is
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    total_duration: f64,
}

impl Timeline {
    /// Assemble a timeline from already-scheduled events.
    pub fn from_parts(events: Vec<TimelineEvent>, total_duration: f64) -> Self {
        Self {
            events,
            total_duration,
        }
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Clip length in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Events of one kind, in timeline order.
    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &TimelineEvent> + '_ {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// Events belonging to one message.
    pub fn events_for_message(&self, index: usize) -> impl Iterator<Item = &TimelineEvent> + '_ {
        self.events.iter().filter(move |e| e.message_index == index)
    }

    /// Appearance time of a message's bubble.
    pub fn bubble_time(&self, index: usize) -> Option<f64> {
        self.events_for_message(index)
            .find(|e| e.kind == EventKind::BubbleAppear)
            .map(|e| e.time)
    }

    /// Latest end time over all events.
    pub fn last_event_end(&self) -> f64 {
        self.events
            .iter()
            .map(TimelineEvent::end_time)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = TimelineEvent::new(EventKind::BubbleAppear, 1.5, 2, Side::Right);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "bubbleAppear");
        assert_eq!(json["time"], 1.5);
        assert_eq!(json["messageIndex"], 2);
        assert_eq!(json["side"], "right");
    }

    #[test]
    fn test_timeline_json_shape() {
        let timeline = Timeline::from_parts(
            vec![TimelineEvent::new(EventKind::ReceiveChime, 0.0, 0, Side::Left)],
            5.0,
        );
        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json["totalDuration"], 5.0);
        assert_eq!(json["events"][0]["kind"], "receiveChime");
    }

    #[test]
    fn test_bubble_time_lookup() {
        let timeline = Timeline::from_parts(
            vec![
                TimelineEvent::new(EventKind::KeyClick, 0.0, 0, Side::Right),
                TimelineEvent::new(EventKind::BubbleAppear, 1.2, 0, Side::Right),
                TimelineEvent::new(EventKind::BubbleAppear, 3.4, 1, Side::Left),
            ],
            6.0,
        );
        assert_eq!(timeline.bubble_time(0), Some(1.2));
        assert_eq!(timeline.bubble_time(1), Some(3.4));
        assert_eq!(timeline.bubble_time(2), None);
        assert!((timeline.last_event_end() - 3.8).abs() < 1e-9);
    }
}
