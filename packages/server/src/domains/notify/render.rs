//! Chat message rendering.
//!
//! Output is Telegram legacy Markdown. Values are placed inside inline code
//! spans, which cannot escape a backtick, so backticks in values are replaced.

use chrono::{DateTime, FixedOffset, Utc};
use url::form_urlencoded;

use crate::common::{CandidateRecord, NotificationEvent};
use crate::kernel::{MessageAction, OutboundMessage};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Placeholder used in every field of the startup message
pub const STARTUP_MARK: &str = "✅";

/// `DD/MM/YYYY, HH:MM:SS` in the display offset.
pub fn format_timestamp(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

/// Sentinel event announcing that monitoring started.
pub fn startup_event(timestamp: impl Into<String>) -> NotificationEvent {
    NotificationEvent::new(
        CandidateRecord {
            service_label: STARTUP_MARK.to_string(),
            destination: STARTUP_MARK.to_string(),
            code: Some(STARTUP_MARK.to_string()),
            raw_message: "Relay is online and monitoring the live SMS feed.".to_string(),
        },
        timestamp,
    )
}

/// Render an event; `with_actions` adds the copy-number / copy-code buttons.
pub fn render(event: &NotificationEvent, with_actions: bool) -> OutboundMessage {
    let record = &event.record;
    let code = record.code.as_deref().unwrap_or("-");

    let text = [
        "*OTP Received*".to_string(),
        String::new(),
        format!("Time: `{}`", inline(&event.timestamp)),
        format!("Number: `{}`", inline(&record.destination)),
        format!("Service: `{}`", inline(&record.service_label)),
        format!("OTP Code: *{}*", code.replace('*', "")),
        format!("Message: `{}`", inline(&record.raw_message)),
    ]
    .join("\n");

    let actions = if with_actions {
        vec![
            copy_action("Copy Number", &record.destination),
            copy_action("Copy OTP", code),
        ]
    } else {
        Vec::new()
    };

    OutboundMessage { text, actions }
}

fn inline(value: &str) -> String {
    value.replace('`', "'")
}

fn copy_action(label: &str, value: &str) -> MessageAction {
    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    MessageAction {
        label: label.to_string(),
        url: format!("tg://msg?text={}", encoded),
    }
}
