use crate::bridge_tests::helpers::{EventProbe, MockWorker, test_config};

use bridge_core::channel::BridgeHandle;
use bridge_core::error::command::CommandError;
use bridge_core::fanout::{EventBus, EventKind};

use std::time::Duration;

use serde_json::json;

// ============================================================================
// request(): command plus matching response frame
// ============================================================================

/// **VALUE**: Verifies `request()` resolves with the data of the worker's response to
/// that command.
///
/// **BUG THIS CATCHES**: Would catch if a response to a different command resolved the
/// request, or if the response subscription leaked after completion.
#[tokio::test]
async fn given_worker_answers_when_request_then_returns_response_data() {
    // GIVEN: An open channel
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(bridge.bus(), &[EventKind::Connected]);
    bridge.connect().await.expect("connect");
    let mut connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    let responder = tokio::spawn(async move {
        let frame = connection.recv_json().await;
        assert_eq!(frame["command"], "status");
        connection.send_json(json!({
            "type": "response",
            "command": "unrelated",
            "data": { "running": false }
        }));
        connection.send_json(json!({
            "type": "response",
            "command": "status",
            "data": { "running": true, "deploys": 2 }
        }));
        connection
    });

    // WHEN: Requesting status
    let data = bridge
        .request("status", &json!({}), Duration::from_secs(5))
        .await
        .expect("request");

    // THEN: The status response's data comes back and the subscription is gone
    assert_eq!(data["running"], true);
    assert_eq!(data["deploys"], 2);
    assert_eq!(bridge.bus().subscriber_count(EventKind::Response), 0);
    let _connection = responder.await.expect("responder");
}

/// **VALUE**: Verifies a response with `success: false` becomes `CommandError::Worker`.
#[tokio::test]
async fn given_worker_reports_failure_when_request_then_worker_error() {
    // GIVEN: An open channel whose worker rejects the command
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(bridge.bus(), &[EventKind::Connected]);
    bridge.connect().await.expect("connect");
    let mut connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    let responder = tokio::spawn(async move {
        let _frame = connection.recv_json().await;
        connection.send_json(json!({
            "type": "response",
            "command": "deploy",
            "data": { "success": false, "message": "branch not found" }
        }));
        connection
    });

    // WHEN: Requesting a deploy
    let result = bridge
        .request("deploy", &json!({ "branch": "gone" }), Duration::from_secs(5))
        .await;

    // THEN: Worker error carrying the worker's message
    match result {
        Err(CommandError::Worker {
            command, message, ..
        }) => {
            assert_eq!(command, "deploy");
            assert_eq!(message, "branch not found");
        }
        other => panic!("Expected CommandError::Worker, got {other:?}"),
    }
    let _connection = responder.await.expect("responder");
}

/// **VALUE**: Verifies `request()` gives up with `CommandError::Timeout` when the worker
/// never answers.
#[tokio::test]
async fn given_worker_silent_when_request_then_timeout() {
    // GIVEN: An open channel whose worker never answers
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(bridge.bus(), &[EventKind::Connected]);
    bridge.connect().await.expect("connect");
    let _connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: Requesting with a short timeout
    let result = bridge
        .request("status", &json!({}), Duration::from_millis(200))
        .await;

    // THEN: Timeout and no leftover subscription
    assert!(
        matches!(result, Err(CommandError::Timeout { .. })),
        "Expected timeout, got {result:?}"
    );
    assert_eq!(bridge.bus().subscriber_count(EventKind::Response), 0);
}
