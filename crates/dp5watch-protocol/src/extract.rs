//! Event extraction from reassembled messages.
//!
//! Server messages carry their JSON payload after a frame header, so the
//! extractor discards everything before the first `{`. Control frames
//! (receipts, errors, heart-beats) either contain no JSON at all or carry a
//! discriminator outside the allow-list; both are ignored, never errors.

use dp5watch_core::{DISCRIMINATOR_FIELD, EventRecord, NotificationType, UnknownNotificationType};
use serde_json::Value;

/// Outcome of inspecting one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A recognized event to hand to the sink.
    Event(EventRecord),
    /// Content that is not a domain event.
    Ignored(IgnoreReason),
}

/// Why a message produced no event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No `{` in the message.
    NoJson,
    /// The text from the first `{` is not a single JSON value.
    Malformed(String),
    /// The object has no string `notificationType`.
    MissingDiscriminator,
    /// The discriminator is not on the allow-list.
    UnknownType(String),
}

/// Extracts an allow-listed event from a complete message.
///
/// Trailing NUL terminators and whitespace after the JSON value are
/// tolerated; any other trailing text makes the message malformed.
pub fn extract_event(message: &str) -> Extraction {
    let Some(start) = message.find('{') else {
        return Extraction::Ignored(IgnoreReason::NoJson);
    };

    let candidate = message[start..].trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
    let payload: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(err) => return Extraction::Ignored(IgnoreReason::Malformed(err.to_string())),
    };

    let Some(kind) = payload.get(DISCRIMINATOR_FIELD).and_then(Value::as_str) else {
        return Extraction::Ignored(IgnoreReason::MissingDiscriminator);
    };

    match kind.parse::<NotificationType>() {
        Ok(notification_type) => {
            Extraction::Event(EventRecord::new(notification_type, payload, message))
        }
        Err(UnknownNotificationType(name)) => {
            Extraction::Ignored(IgnoreReason::UnknownType(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(message: &str) -> EventRecord {
        match extract_event(message) {
            Extraction::Event(record) => record,
            Extraction::Ignored(reason) => panic!("expected an event, got {reason:?}"),
        }
    }

    fn ignored(message: &str) -> IgnoreReason {
        match extract_event(message) {
            Extraction::Ignored(reason) => reason,
            Extraction::Event(record) => panic!("expected no event, got {record:?}"),
        }
    }

    #[test]
    fn every_allow_listed_kind_is_accepted() {
        for kind in NotificationType::ALL {
            let payload = json!({"notificationType": kind.as_str(), "uid": "rack-1", "n": [1, 2]});
            let record = event(&format!("garbage-prefix{payload}"));
            assert_eq!(record.notification_type, kind);
            assert_eq!(record.payload, payload);
        }
    }

    #[test]
    fn message_frame_payload() {
        let message = "MESSAGE\ndestination:/topic/events\ncontent-type:application/json\nsubscription:sub-1\n\n{\"notificationType\":\"LINEAR_NEW_BARCODE\",\"barcode\":\"FR0001\"}\0";
        let record = event(message);
        assert_eq!(record.notification_type, NotificationType::LinearNewBarcode);
        assert_eq!(record.field("barcode"), Some(&json!("FR0001")));
        assert_eq!(record.raw, message);
    }

    #[test]
    fn payload_is_returned_unchanged() {
        let record = event(r#"{"notificationType":"SCAN_MILESTONE","x":1}"#);
        insta::assert_json_snapshot!(record.payload, @r#"
        {
          "notificationType": "SCAN_MILESTONE",
          "x": 1
        }
        "#);
    }

    #[test]
    fn control_frame_without_json() {
        assert_eq!(ignored("ERROR\nmessage:bad\n\n\0"), IgnoreReason::NoJson);
        assert_eq!(ignored(""), IgnoreReason::NoJson);
        assert_eq!(ignored("\n"), IgnoreReason::NoJson);
    }

    #[test]
    fn unknown_discriminator_is_dropped() {
        assert_eq!(
            ignored(r#"{"notificationType":"HEARTBEAT"}"#),
            IgnoreReason::UnknownType("HEARTBEAT".to_string())
        );
        assert_eq!(
            ignored(r#"{"notificationType":"scan_milestone"}"#),
            IgnoreReason::UnknownType("scan_milestone".to_string())
        );
    }

    #[test]
    fn missing_or_non_string_discriminator() {
        assert_eq!(ignored(r#"{"type":"SCAN_MILESTONE"}"#), IgnoreReason::MissingDiscriminator);
        assert_eq!(ignored(r#"{"notificationType":7}"#), IgnoreReason::MissingDiscriminator);
        assert_eq!(ignored(r#"{"notificationType":null}"#), IgnoreReason::MissingDiscriminator);
    }

    #[test]
    fn malformed_json_is_ignored() {
        assert!(matches!(ignored("prefix {not json"), IgnoreReason::Malformed(_)));
        assert!(matches!(
            ignored(r#"{"notificationType":"SCAN_MILESTONE""#),
            IgnoreReason::Malformed(_)
        ));
        assert!(matches!(
            ignored(r#"{"notificationType":"SCAN_MILESTONE"} trailing"#),
            IgnoreReason::Malformed(_)
        ));
    }

    #[test]
    fn first_brace_starts_the_payload() {
        // The payload starts at the header brace, which is not valid JSON.
        assert!(matches!(
            ignored("MESSAGE\nselector:{x}\n\n{\"notificationType\":\"SCAN_MILESTONE\"}\0"),
            IgnoreReason::Malformed(_)
        ));
    }
}
