//! Timeline builder.
//!
//! A single left-to-right pass over the messages. The running cursor is the
//! appearance time of the previous message; each message's auxiliary events
//! (typing indicator, key clicks, keyboard) are scheduled relative to its own
//! appearance time, so an explicit timestamp moves the whole group with it.

use chatclip_models::{
    EventKind, Message, Side, Timeline, TimelineConfig, TimelineEvent, MAX_MESSAGE_CHARS,
};
use tracing::debug;

use crate::error::{TimelineError, TimelineResult};

/// Fewest key clicks emitted for an outbound message.
const MIN_KEY_CLICKS: usize = 4;
/// Most key clicks emitted for an outbound message.
const MAX_KEY_CLICKS: usize = 8;
/// One extra click per this many characters.
const CHARS_PER_EXTRA_CLICK: usize = 6;

/// Build the event timeline for a conversation.
///
/// Fails with [`TimelineError::Validation`] on an empty or oversized message
/// list, empty text, over-long text, an unusable explicit timestamp or an
/// invalid config. No partial timeline is ever returned.
pub fn build_timeline(messages: &[Message], config: &TimelineConfig) -> TimelineResult<Timeline> {
    validate(messages, config)?;

    let first_outbound = messages.iter().position(Message::is_outbound);
    let last_outbound = messages.iter().rposition(Message::is_outbound);

    let mut groups: Vec<Vec<TimelineEvent>> = Vec::with_capacity(messages.len());
    let mut cursor = 0.0_f64;

    for (index, message) in messages.iter().enumerate() {
        let base = if index == 0 {
            config.initial_lead_in
        } else {
            cursor + config.inter_message_gap
        };
        let side = message.sender.side();

        let (appear_time, mut group) = if message.is_outbound() {
            schedule_outbound(
                index,
                message,
                base,
                config,
                Some(index) == first_outbound,
                Some(index) == last_outbound,
            )
        } else {
            let after_outbound = index > 0 && messages[index - 1].is_outbound();
            schedule_inbound(index, message, base, config, after_outbound)
        };

        group.push(TimelineEvent::new(
            EventKind::BubbleAppear,
            appear_time,
            index,
            side,
        ));
        groups.push(group);
        cursor = appear_time;
    }

    let last_index = messages.len() - 1;
    if messages[last_index].is_outbound() {
        cursor += config.delivered_tail_delay;
        if let Some(group) = groups.last_mut() {
            group.push(TimelineEvent::new(
                EventKind::DeliveredShown,
                cursor,
                last_index,
                Side::Right,
            ));
        }
    }

    let mut events = Vec::new();
    for mut group in groups {
        // Stable: ties keep their emission order (chime before bubble).
        group.sort_by(|a, b| a.time.total_cmp(&b.time));
        events.extend(group);
    }

    let last_event_end = events
        .iter()
        .map(TimelineEvent::end_time)
        .fold(0.0, f64::max);
    let total_duration = (cursor + config.trailing_buffer)
        .max(config.min_clip_length)
        .max(last_event_end);

    debug!(
        messages = messages.len(),
        events = events.len(),
        total_duration,
        "Built timeline"
    );

    Ok(Timeline::from_parts(events, total_duration))
}

/// Schedule an outbound message: keyboard, key clicks and send chime.
///
/// Returns the bubble appearance time and the events that precede it.
fn schedule_outbound(
    index: usize,
    message: &Message,
    base: f64,
    config: &TimelineConfig,
    first_outbound: bool,
    last_outbound: bool,
) -> (f64, Vec<TimelineEvent>) {
    let chars = message.char_count();
    let typing = chars as f64 / config.typing_chars_per_second;

    let appear_time = message
        .timestamp
        .unwrap_or(base + typing + config.post_typing_gap);
    let typing_end = (appear_time - config.post_typing_gap).max(0.0);
    let typing_start = (typing_end - typing).max(0.0);

    let mut events = Vec::new();

    if first_outbound {
        events.push(TimelineEvent::new(
            EventKind::KeyboardShow,
            (typing_start - config.keyboard_lead).max(0.0),
            index,
            Side::Right,
        ));
    }

    let clicks = key_click_count(chars);
    let step = (typing_end - typing_start) / clicks as f64;
    for k in 0..clicks {
        events.push(TimelineEvent::new(
            EventKind::KeyClick,
            typing_start + step * k as f64,
            index,
            Side::Right,
        ));
    }

    events.push(TimelineEvent::new(
        EventKind::SendChime,
        appear_time,
        index,
        Side::Right,
    ));

    if last_outbound {
        events.push(TimelineEvent::new(
            EventKind::KeyboardHide,
            typing_end + config.keyboard_trail,
            index,
            Side::Right,
        ));
    }

    (appear_time, events)
}

/// Schedule an inbound message: optional typing indicator and receive chime.
fn schedule_inbound(
    index: usize,
    message: &Message,
    base: f64,
    config: &TimelineConfig,
    after_outbound: bool,
) -> (f64, Vec<TimelineEvent>) {
    let indicator = config.incoming_typing_indicator_duration;
    let appear_time = match message.timestamp {
        Some(ts) => ts,
        None if after_outbound => base + indicator,
        None => base,
    };

    let mut events = Vec::new();

    if after_outbound {
        events.push(TimelineEvent::new(
            EventKind::TypingIndicatorStart,
            (appear_time - indicator).max(0.0),
            index,
            Side::Left,
        ));
        events.push(TimelineEvent::new(
            EventKind::TypingIndicatorEnd,
            appear_time,
            index,
            Side::Left,
        ));
    }

    events.push(TimelineEvent::new(
        EventKind::ReceiveChime,
        appear_time,
        index,
        Side::Left,
    ));

    (appear_time, events)
}

/// Number of key clicks for a message of `chars` characters.
pub fn key_click_count(chars: usize) -> usize {
    (MIN_KEY_CLICKS + chars / CHARS_PER_EXTRA_CLICK).min(MAX_KEY_CLICKS)
}

fn validate(messages: &[Message], config: &TimelineConfig) -> TimelineResult<()> {
    config
        .validate()
        .map_err(|reason| TimelineError::validation(format!("invalid config: {}", reason)))?;

    if messages.is_empty() {
        return Err(TimelineError::validation("no messages"));
    }

    if messages.len() > config.max_messages {
        return Err(TimelineError::validation(format!(
            "too many messages: {} exceeds the limit of {}",
            messages.len(),
            config.max_messages
        )));
    }

    for (index, message) in messages.iter().enumerate() {
        if message.text.trim().is_empty() {
            return Err(TimelineError::validation(format!(
                "message {} has empty text",
                index
            )));
        }

        let chars = message.char_count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(TimelineError::validation(format!(
                "message {} is {} characters long (limit {})",
                index, chars, MAX_MESSAGE_CHARS
            )));
        }

        if let Some(ts) = message.timestamp {
            if !ts.is_finite() || ts < 0.0 {
                return Err(TimelineError::validation(format!(
                    "message {} has invalid timestamp {}",
                    index, ts
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn kinds(timeline: &Timeline, index: usize) -> Vec<EventKind> {
        timeline.events_for_message(index).map(|e| e.kind).collect()
    }

    #[test]
    fn test_reference_scenario() {
        let messages = vec![Message::them("Hey! How are you?"), Message::you("I'm doing great!")];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();

        assert_eq!(timeline.bubble_time(0), Some(0.0));
        let expected = 2.0 + 16.0 / 11.0 + 0.18;
        let bubble1 = timeline.bubble_time(1).unwrap();
        assert!((bubble1 - expected).abs() < EPS, "bubble1 = {}", bubble1);

        let delivered = timeline
            .events_of(EventKind::DeliveredShown)
            .next()
            .unwrap();
        assert!((delivered.time - (expected + 0.6)).abs() < EPS);
        assert!((timeline.total_duration() - (expected + 0.6 + 2.0)).abs() < EPS);
    }

    #[test]
    fn test_single_inbound_message() {
        let timeline = build_timeline(&[Message::them("hi")], &TimelineConfig::default()).unwrap();
        assert_eq!(timeline.events_of(EventKind::BubbleAppear).count(), 1);
        assert_eq!(timeline.events_of(EventKind::TypingIndicatorStart).count(), 0);
        assert_eq!(timeline.events_of(EventKind::TypingIndicatorEnd).count(), 0);
        assert_eq!(kinds(&timeline, 0), vec![EventKind::ReceiveChime, EventKind::BubbleAppear]);
        // 0 + trailing 2.0 is below the 5 s floor
        assert_eq!(timeline.total_duration(), 5.0);
    }

    #[test]
    fn test_single_outbound_message() {
        let timeline = build_timeline(&[Message::you("hello")], &TimelineConfig::default()).unwrap();
        assert_eq!(timeline.events_of(EventKind::BubbleAppear).count(), 1);
        assert_eq!(timeline.events_of(EventKind::TypingIndicatorStart).count(), 0);
        assert_eq!(timeline.events_of(EventKind::KeyClick).count(), 4);
        assert_eq!(timeline.events_of(EventKind::SendChime).count(), 1);
        assert_eq!(timeline.events_of(EventKind::KeyboardShow).count(), 1);
        assert_eq!(timeline.events_of(EventKind::KeyboardHide).count(), 1);
    }

    #[test]
    fn test_all_outbound_has_no_typing_indicator() {
        let messages = vec![Message::you("one"), Message::you("two"), Message::you("three")];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        assert_eq!(timeline.events_of(EventKind::TypingIndicatorStart).count(), 0);
        assert_eq!(timeline.events_of(EventKind::SendChime).count(), 3);
    }

    #[test]
    fn test_inbound_after_inbound_has_no_indicator() {
        let messages = vec![Message::you("q"), Message::them("a"), Message::them("b")];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        assert_eq!(
            kinds(&timeline, 1),
            vec![
                EventKind::TypingIndicatorStart,
                EventKind::TypingIndicatorEnd,
                EventKind::ReceiveChime,
                EventKind::BubbleAppear,
            ]
        );
        assert_eq!(kinds(&timeline, 2), vec![EventKind::ReceiveChime, EventKind::BubbleAppear]);

        let b1 = timeline.bubble_time(1).unwrap();
        let b2 = timeline.bubble_time(2).unwrap();
        assert!((b2 - (b1 + 2.0)).abs() < EPS);
    }

    #[test]
    fn test_indicator_window() {
        let messages = vec![Message::you("hey"), Message::them("yo")];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        let b0 = timeline.bubble_time(0).unwrap();
        let start = timeline
            .events_of(EventKind::TypingIndicatorStart)
            .next()
            .unwrap();
        let end = timeline.events_of(EventKind::TypingIndicatorEnd).next().unwrap();
        assert!((start.time - (b0 + 2.0)).abs() < EPS);
        assert!((end.time - (b0 + 3.2)).abs() < EPS);
        assert_eq!(end.time, timeline.bubble_time(1).unwrap());
    }

    #[test]
    fn test_key_clicks_spaced_within_typing_window() {
        let text = "a".repeat(30);
        let timeline = build_timeline(&[Message::you(text)], &TimelineConfig::default()).unwrap();
        let clicks: Vec<f64> = timeline.events_of(EventKind::KeyClick).map(|e| e.time).collect();
        assert_eq!(clicks.len(), 8);
        let typing_end = 30.0 / 11.0;
        assert!(clicks[0].abs() < EPS);
        for pair in clicks.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(*clicks.last().unwrap() < typing_end);
    }

    #[test]
    fn test_key_click_count_bounds() {
        assert_eq!(key_click_count(1), 4);
        assert_eq!(key_click_count(6), 5);
        assert_eq!(key_click_count(17), 6);
        assert_eq!(key_click_count(500), 8);
    }

    #[test]
    fn test_keyboard_spans_outbound_run() {
        let messages = vec![
            Message::them("hi"),
            Message::you("first"),
            Message::them("ok"),
            Message::you("last"),
            Message::them("bye"),
        ];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        let show = timeline.events_of(EventKind::KeyboardShow).collect::<Vec<_>>();
        let hide = timeline.events_of(EventKind::KeyboardHide).collect::<Vec<_>>();
        assert_eq!(show.len(), 1);
        assert_eq!(hide.len(), 1);
        assert_eq!(show[0].message_index, 1);
        assert_eq!(hide[0].message_index, 3);
        // typing of message 1 starts at 2.0, keyboard leads by 0.8
        assert!((show[0].time - 1.2).abs() < EPS);
        // inbound last message: no delivered label
        assert_eq!(timeline.events_of(EventKind::DeliveredShown).count(), 0);
    }

    #[test]
    fn test_explicit_timestamp_respected() {
        let messages = vec![
            Message::them("a"),
            Message::you("b").at(10.0),
            Message::them("c").at(12.5),
        ];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        assert_eq!(timeline.bubble_time(1), Some(10.0));
        assert_eq!(timeline.bubble_time(2), Some(12.5));

        let start = timeline
            .events_of(EventKind::TypingIndicatorStart)
            .next()
            .unwrap();
        assert!((start.time - 11.3).abs() < EPS);

        let first_click = timeline.events_of(EventKind::KeyClick).next().unwrap();
        let expected = 10.0 - 0.18 - 1.0 / 11.0;
        assert!((first_click.time - expected).abs() < EPS);
    }

    #[test]
    fn test_explicit_timestamp_moves_cursor() {
        let messages = vec![Message::them("a").at(7.0), Message::them("b")];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        assert_eq!(timeline.bubble_time(1), Some(9.0));
    }

    #[test]
    fn test_backward_events_clamped_at_zero() {
        let messages = vec![Message::you("a fairly long opening line").at(0.5)];
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        assert!(timeline.events().iter().all(|e| e.time >= 0.0));
        assert_eq!(timeline.bubble_time(0), Some(0.5));
    }

    #[test]
    fn test_times_non_decreasing_per_group() {
        let config = TimelineConfig::default();
        assert!(config.keyboard_trail > 0.0);
        let messages = vec![Message::you("hello there"), Message::them("hi"), Message::you("bye")];
        let timeline = build_timeline(&messages, &config).unwrap();
        for index in 0..messages.len() {
            let times: Vec<f64> = timeline.events_for_message(index).map(|e| e.time).collect();
            assert!(times.windows(2).all(|w| w[0] <= w[1]), "group {}: {:?}", index, times);
        }
    }

    #[test]
    fn test_bubbles_non_decreasing_without_overrides() {
        let messages: Vec<Message> = (0..20)
            .map(|i| {
                if i % 3 == 0 {
                    Message::you(format!("message number {}", i))
                } else {
                    Message::them(format!("reply {}", i))
                }
            })
            .collect();
        let timeline = build_timeline(&messages, &TimelineConfig::default()).unwrap();
        let bubbles: Vec<f64> = timeline.events_of(EventKind::BubbleAppear).map(|e| e.time).collect();
        assert_eq!(bubbles.len(), 20);
        assert!(bubbles.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_duration_covers_last_event() {
        let messages = vec![Message::them("x").at(30.0)];
        let config = TimelineConfig {
            trailing_buffer: 0.0,
            ..Default::default()
        };
        let timeline = build_timeline(&messages, &config).unwrap();
        assert!(timeline.total_duration() >= timeline.last_event_end());
        assert!((timeline.total_duration() - 30.4).abs() < EPS);
    }

    #[test]
    fn test_idempotent() {
        let messages = vec![Message::you("same"), Message::them("input")];
        let config = TimelineConfig::default();
        assert_eq!(
            build_timeline(&messages, &config).unwrap(),
            build_timeline(&messages, &config).unwrap()
        );
    }

    #[test]
    fn test_initial_lead_in() {
        let config = TimelineConfig::default().with_initial_lead_in(1.5);
        let timeline = build_timeline(&[Message::them("hi")], &config).unwrap();
        assert_eq!(timeline.bubble_time(0), Some(1.5));
    }

    #[test]
    fn test_empty_messages_rejected() {
        let err = build_timeline(&[], &TimelineConfig::default()).unwrap_err();
        assert_eq!(err, TimelineError::Validation("no messages".to_string()));
        assert!(err.to_string().contains("messages"));
    }

    #[test]
    fn test_message_cap() {
        let messages: Vec<Message> = (0..101).map(|i| Message::them(format!("m{}", i))).collect();
        let err = build_timeline(&messages, &TimelineConfig::default()).unwrap_err();
        assert!(err.reason().contains("100"));

        assert!(build_timeline(&messages[..100], &TimelineConfig::default()).is_ok());
    }

    #[test]
    fn test_whitespace_text_rejected() {
        let err = build_timeline(&[Message::you("   \n")], &TimelineConfig::default()).unwrap_err();
        assert!(err.reason().contains("empty"));
    }

    #[test]
    fn test_long_text_rejected() {
        let err = build_timeline(&[Message::you("x".repeat(501))], &TimelineConfig::default())
            .unwrap_err();
        assert!(err.reason().contains("500"));
        assert!(build_timeline(&[Message::you("x".repeat(500))], &TimelineConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let messages = vec![Message::them("a").at(-1.0)];
        assert!(build_timeline(&messages, &TimelineConfig::default()).is_err());
        let messages = vec![Message::them("a").at(f64::INFINITY)];
        assert!(build_timeline(&messages, &TimelineConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TimelineConfig {
            typing_chars_per_second: 0.0,
            ..Default::default()
        };
        let err = build_timeline(&[Message::you("hi")], &config).unwrap_err();
        assert!(err.reason().starts_with("invalid config"));
    }
}
