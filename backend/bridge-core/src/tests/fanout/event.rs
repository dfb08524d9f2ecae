// Unit tests for inbound frame parsing and dispatch

use crate::error::protocol::ProtocolError;
use crate::fanout::{BridgeEvent, EventKind, InboundEvent, dispatch};

use serde_json::json;

fn dispatch_text(text: &str) -> BridgeEvent {
    dispatch(InboundEvent::parse(text).expect("frame parses"))
}

/// **VALUE**: Non-JSON and type-less frames are rejected with distinct errors.
///
/// **WHY THIS MATTERS**: Both are dropped by the channel, but the log should
/// say whether the worker sent garbage or an unexpected shape.
#[test]
fn given_malformed_frames_when_parse_then_parse_and_schema_errors() {
    // GIVEN/WHEN: Invalid JSON, and JSON without a type
    let garbage = InboundEvent::parse("not json");
    let missing_type = InboundEvent::parse(r#"{"event":"ready"}"#);
    let wrong_type = InboundEvent::parse(r#"{"type":42}"#);

    // THEN
    assert!(matches!(garbage, Err(ProtocolError::Parse { .. })));
    assert!(matches!(missing_type, Err(ProtocolError::Schema { .. })));
    assert!(matches!(wrong_type, Err(ProtocolError::Schema { .. })));
}

/// **VALUE**: A deploy_detected frame maps to exactly that event with its data.
#[test]
fn given_deploy_detected_frame_when_dispatch_then_deploy_detected_with_data() {
    // GIVEN: A deploy frame
    let text = r#"{"type":"deploy_detected","data":{"command":"vercel --prod","project":"site"}}"#;

    // WHEN: Dispatching
    let event = dispatch_text(text);

    // THEN: DeployDetected with the frame's data
    assert_eq!(
        event,
        BridgeEvent::DeployDetected {
            data: json!({"command": "vercel --prod", "project": "site"})
        }
    );
    assert_eq!(event.kind(), EventKind::DeployDetected);
}

/// **VALUE**: Responses keep the command they answer so callers can correlate.
#[test]
fn given_response_frame_when_dispatch_then_response_keyed_by_command() {
    // GIVEN/WHEN
    let event = dispatch_text(r#"{"type":"response","command":"status","data":{"running":true}}"#);

    // THEN
    assert_eq!(
        event,
        BridgeEvent::Response {
            command: "status".to_string(),
            data: json!({"running": true})
        }
    );
}

/// **VALUE**: Worker errors carry the worker's message, with a fallback when absent.
#[test]
fn given_error_frames_when_dispatch_then_error_message_preserved_or_defaulted() {
    // GIVEN/WHEN
    let with_message = dispatch_text(r#"{"type":"error","message":"timer not running"}"#);
    let without_message = dispatch_text(r#"{"type":"error"}"#);

    // THEN
    assert_eq!(
        with_message,
        BridgeEvent::Error {
            message: "timer not running".to_string()
        }
    );
    assert_eq!(
        without_message,
        BridgeEvent::Error {
            message: "Unknown worker error".to_string()
        }
    );
}

/// **VALUE**: System and notification frames keep their sub-event name.
#[test]
fn given_system_and_notification_frames_when_dispatch_then_event_name_kept() {
    // GIVEN/WHEN
    let system = dispatch_text(r#"{"type":"system","event":"ready"}"#);
    let notification = dispatch_text(
        r#"{"type":"notification","event":"show_custom","data":{"notification":{"id":"n1"}}}"#,
    );

    // THEN: Missing data becomes an empty object
    assert_eq!(
        system,
        BridgeEvent::System {
            event: Some("ready".to_string()),
            data: json!({})
        }
    );
    assert_eq!(notification.kind(), EventKind::Notification);
}

/// **VALUE**: Unknown worker event types still reach subscribers, verbatim.
///
/// **BUG THIS CATCHES**: A newer worker adding an event type must not have its
/// frames dropped by an older host.
#[test]
fn given_unknown_type_when_dispatch_then_message_with_raw_payload() {
    // GIVEN: A frame of a type this host doesn't know
    let text = r#"{"type":"timer_tick","data":{"remaining":300},"extra":"kept"}"#;

    // WHEN
    let event = dispatch_text(text);

    // THEN: The whole frame is carried
    assert_eq!(
        event,
        BridgeEvent::Message {
            payload: json!({"type": "timer_tick", "data": {"remaining": 300}, "extra": "kept"})
        }
    );
}

/// **VALUE**: Events serialize with a snake_case `type` tag for the UI.
#[test]
fn given_bridge_event_when_serialized_then_tagged_by_type() {
    // GIVEN
    let event = BridgeEvent::Disconnected {
        reason: "manual disconnect".to_string(),
    };

    // WHEN
    let value = serde_json::to_value(&event).expect("serializes");

    // THEN
    assert_eq!(
        value,
        json!({"type": "disconnected", "reason": "manual disconnect"})
    );
}
