// Unit tests for outbound message construction

use crate::error::command::CommandError;
use crate::router::{CommandReceipt, Message};

use std::collections::{HashMap, HashSet};

use serde_json::{Value, json};

/// **VALUE**: The wire frame carries exactly `{command, data, id, timestamp}`.
///
/// **WHY THIS MATTERS**: The worker dispatches on `command` and echoes nothing
/// else back; any renamed field silently breaks every command.
#[test]
fn given_message_when_to_frame_then_matches_wire_format() {
    // GIVEN: A status command
    let message = Message::new("status", json!({"verbose": true}));

    // WHEN: Encoding
    let frame: Value =
        serde_json::from_str(&message.to_frame().expect("encodes")).expect("valid JSON");

    // THEN: Four fields with the expected values
    let object = frame.as_object().expect("frame is an object");
    assert_eq!(object.len(), 4);
    assert_eq!(frame["command"], "status");
    assert_eq!(frame["data"], json!({"verbose": true}));
    assert_eq!(frame["id"], message.id());

    let timestamp = frame["timestamp"].as_str().expect("timestamp is a string");
    assert!(
        humantime::parse_rfc3339(timestamp).is_ok(),
        "timestamp should be RFC 3339, got {timestamp}"
    );
}

/// **VALUE**: Ids are time-based with a random suffix and don't collide.
#[test]
fn given_many_messages_when_created_then_ids_are_unique_and_prefixed() {
    // GIVEN/WHEN: A burst of messages within the same millisecond range
    let ids: Vec<String> = (0..1_000)
        .map(|_| Message::new("ping", Value::Null).id().to_string())
        .collect();

    // THEN: All distinct, all shaped msg_<millis>_<suffix>
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());

    for id in &ids {
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3, "unexpected id shape: {id}");
        assert_eq!(parts[0], "msg");
        assert!(parts[1].parse::<u128>().is_ok(), "millis part: {id}");
        assert_eq!(parts[2].len(), 9, "suffix length: {id}");
    }
}

/// **VALUE**: Payloads that JSON can't represent fail at construction, before
/// anything is queued.
#[test]
fn given_unserializable_data_when_from_serializable_then_returns_serialization_error() {
    // GIVEN: A map with non-string keys
    let data: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);

    // WHEN: Building a message
    let result = Message::from_serializable("bad", &data);

    // THEN: Serialization error naming the command
    match result {
        Err(CommandError::Serialization { message, .. }) => assert!(message.contains("bad")),
        other => panic!("expected serialization error, got {other:?}"),
    }
}

/// **VALUE**: Receipts serialize in the camelCase shape the UI reads.
#[test]
fn given_receipts_when_serialized_then_camel_case_with_flags() {
    // GIVEN: A sent and a queued receipt
    let sent = serde_json::to_value(CommandReceipt::sent("msg_1_a")).expect("serializes");
    let queued = serde_json::to_value(CommandReceipt::queued("msg_2_b")).expect("serializes");

    // THEN: success/queued flags are mutually exclusive
    assert_eq!(
        sent,
        json!({"success": true, "queued": false, "commandId": "msg_1_a"})
    );
    assert_eq!(
        queued,
        json!({"success": false, "queued": true, "commandId": "msg_2_b"})
    );
}
