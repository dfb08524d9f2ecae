use crate::bridge_tests::helpers::{
    EventProbe, MockWorker, QUIET_PERIOD, free_port, test_config,
};

use bridge_core::channel::{BridgeHandle, ChannelState, MANUAL_DISCONNECT_REASON};
use bridge_core::config::OverflowPolicy;
use bridge_core::fanout::{BridgeEvent, EventBus, EventKind};

use serde_json::json;

// ============================================================================
// Channel lifecycle against a real WebSocket worker
// ============================================================================

// ----------------------------------------------------------------------------
// Queueing while not open
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies that a command sent while the handshake is in flight is queued,
/// then delivered exactly once when the connection opens.
///
/// **WHY THIS MATTERS**: Commands issued right after start-up race the connection. They
/// must neither be lost nor delivered twice.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `send_command()` fails instead of queueing while `CONNECTING`
/// - The flush on open skips the queue or sends it twice
/// - `Connected` is published before the queued frames go out
#[tokio::test]
async fn given_handshake_in_flight_when_send_command_then_queued_and_delivered_once() {
    // GIVEN: A worker that holds the handshake
    let mut worker = MockWorker::start_gated().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(bridge.bus(), &[EventKind::Connected]);
    bridge.connect().await.expect("connect");

    // WHEN: A command is sent before the socket opens
    let receipt = bridge
        .send_command("status", &json!({}))
        .await
        .expect("send_command");

    // THEN: It is reported as queued
    assert!(!receipt.success);
    assert!(receipt.queued);
    let status = bridge.status().await.expect("status");
    assert_eq!(status.state, ChannelState::Connecting);
    assert_eq!(status.queued_messages, 1);
    assert!(!status.has_reconnect_timer);

    // WHEN: The handshake completes
    worker.open_gate();
    let mut connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // THEN: The worker receives the command exactly once and the queue is empty
    let frame = connection.recv_json().await;
    assert_eq!(frame["command"], "status");
    assert_eq!(frame["id"], receipt.command_id.as_str());
    assert!(connection.recv_json_within(QUIET_PERIOD).await.is_none());
    assert_eq!(bridge.status().await.expect("status").queued_messages, 0);
}

/// **VALUE**: Verifies queued commands are flushed in the order they were sent.
///
/// **BUG THIS CATCHES**: Would catch if the queue were drained LIFO or in hash order.
#[tokio::test]
async fn given_several_queued_commands_when_connection_opens_then_flushed_in_fifo_order() {
    // GIVEN: Three commands queued during the handshake
    let mut worker = MockWorker::start_gated().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    bridge.connect().await.expect("connect");
    for command in ["first", "second", "third"] {
        bridge
            .send_command(command, &json!({}))
            .await
            .expect("send_command");
    }

    // WHEN: The handshake completes
    worker.open_gate();
    let mut connection = worker.next_connection().await;

    // THEN: Frames arrive first, second, third
    let mut received = Vec::new();
    for _ in 0..3 {
        let frame = connection.recv_json().await;
        received.push(frame["command"].as_str().unwrap_or_default().to_string());
    }
    assert_eq!(received, ["first", "second", "third"]);
}

/// **VALUE**: Verifies that a bounded drop-oldest queue keeps the newest commands only.
#[tokio::test]
async fn given_bounded_drop_oldest_queue_when_overfilled_then_oldest_commands_dropped() {
    // GIVEN: A queue of two that evicts the oldest
    let mut worker = MockWorker::start_gated().await;
    let mut config = test_config(worker.port);
    config.queue.capacity = Some(2);
    config.queue.overflow = OverflowPolicy::DropOldest;
    let bridge = BridgeHandle::spawn(&config, EventBus::new()).expect("Failed to spawn bridge");
    bridge.connect().await.expect("connect");

    // WHEN: Three commands are queued
    for command in ["a", "b", "c"] {
        bridge
            .send_command(command, &json!({}))
            .await
            .expect("send_command");
    }
    assert_eq!(bridge.status().await.expect("status").queued_messages, 2);

    // THEN: Only the two newest reach the worker
    worker.open_gate();
    let mut connection = worker.next_connection().await;
    assert_eq!(connection.recv_json().await["command"], "b");
    assert_eq!(connection.recv_json().await["command"], "c");
    assert!(connection.recv_json_within(QUIET_PERIOD).await.is_none());
}

// ----------------------------------------------------------------------------
// Sending while open
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies an open channel sends immediately and reports success.
#[tokio::test]
async fn given_open_channel_when_send_command_then_sent_with_envelope() {
    // GIVEN: An open channel
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(bridge.bus(), &[EventKind::Connected]);
    bridge.connect().await.expect("connect");
    let mut connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: A command is sent
    let receipt = bridge
        .send_command("deploy", &json!({ "branch": "main" }))
        .await
        .expect("send_command");

    // THEN: The receipt says sent and the frame carries the full envelope
    assert!(receipt.success);
    assert!(!receipt.queued);
    let frame = connection.recv_json().await;
    assert_eq!(frame["id"], receipt.command_id.as_str());
    assert_eq!(frame["command"], "deploy");
    assert_eq!(frame["data"]["branch"], "main");
    assert!(frame["timestamp"].is_string());
}

/// **VALUE**: Verifies that `connect()` while already connected does not open a second socket.
#[tokio::test]
async fn given_connected_when_connect_again_then_no_second_connection() {
    // GIVEN: An open channel
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(bridge.bus(), &[EventKind::Connected]);
    bridge.connect().await.expect("connect");
    let _connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: connect() is called again
    bridge.connect().await.expect("connect");

    // THEN: The worker sees no new connection
    assert!(worker.connection_within(QUIET_PERIOD).await.is_none());
    assert_eq!(
        bridge.status().await.expect("status").state,
        ChannelState::Connected
    );
}

// ----------------------------------------------------------------------------
// Inbound fan-out
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies a typed worker frame reaches its subscribers and nothing else fires.
///
/// **BUG THIS CATCHES**: Would catch if `deploy_detected` were also re-published as a
/// generic `message` event, or dispatched to the wrong kind.
#[tokio::test]
async fn given_deploy_detected_frame_when_received_then_only_that_event_published() {
    // GIVEN: An open channel with a probe on every event kind
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach_all(bridge.bus());
    bridge.connect().await.expect("connect");
    let connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: The worker reports a deploy
    connection.send_json(json!({
        "type": "deploy_detected",
        "data": { "project": "api", "branch": "main" }
    }));

    // THEN: Exactly one DeployDetected event with the payload
    match probe.next().await {
        BridgeEvent::DeployDetected { data } => assert_eq!(data["project"], "api"),
        other => panic!("Expected DeployDetected, got {other:?}"),
    }
    assert!(probe.next_within(QUIET_PERIOD).await.is_none());
}

/// **VALUE**: Verifies malformed frames are dropped without closing the channel.
///
/// **WHY THIS MATTERS**: One bad frame from the worker must not trigger a reconnect storm.
#[tokio::test]
async fn given_malformed_frame_when_received_then_dropped_and_channel_stays_open() {
    // GIVEN: An open channel
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach_all(bridge.bus());
    bridge.connect().await.expect("connect");
    let connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: Garbage arrives, then a valid system frame
    connection.send_text("{not json");
    connection.send_json(json!({ "no_type": true }));
    connection.send_json(json!({ "type": "system", "event": "ready", "data": {} }));

    // THEN: The system frame is the next event and the channel is still open
    match probe.next().await {
        BridgeEvent::System { event, .. } => assert_eq!(event.as_deref(), Some("ready")),
        other => panic!("Expected System, got {other:?}"),
    }
    let status = bridge.status().await.expect("status");
    assert!(status.connected);
    assert_eq!(status.state, ChannelState::Connected);
}

// ----------------------------------------------------------------------------
// Reconnect
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the channel reconnects on its own after the worker closes it.
///
/// **BUG THIS CATCHES**: Would catch if a peer close left the channel `CLOSED` forever,
/// or if the reconnect timer were never armed.
#[tokio::test]
async fn given_worker_closes_connection_when_delay_elapses_then_reconnects() {
    // GIVEN: An open channel with a 100ms reconnect delay
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(
        bridge.bus(),
        &[EventKind::Connected, EventKind::Disconnected],
    );
    bridge.connect().await.expect("connect");
    let connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: The worker closes the socket
    connection.close();

    // THEN: Disconnected, then a fresh connection and Connected again
    match probe.next_of(EventKind::Disconnected).await {
        BridgeEvent::Disconnected { reason } => {
            assert_ne!(reason, MANUAL_DISCONNECT_REASON);
        }
        other => panic!("Expected Disconnected, got {other:?}"),
    }
    let _second = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;
    assert!(!bridge.status().await.expect("status").has_reconnect_timer);
}

/// **VALUE**: Verifies a refused connection schedules one reconnect, and sends while
/// waiting queue without stacking extra timers.
///
/// **WHY THIS MATTERS**: Every send while offline asks for a reconnect. Stacked timers
/// would fire parallel connection attempts.
#[tokio::test]
async fn given_nothing_listening_when_connect_then_error_and_single_reconnect_timer() {
    // GIVEN: A port nobody listens on and a long reconnect delay
    let port = free_port().await;
    let mut config = test_config(port);
    config.reconnect.initial_delay_ms = 60_000;
    config.reconnect.max_delay_ms = 60_000;
    let bridge = BridgeHandle::spawn(&config, EventBus::new()).expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(bridge.bus(), &[EventKind::Error]);

    // WHEN: Connecting
    bridge.connect().await.expect("connect");

    // THEN: An Error event and a scheduled reconnect
    assert!(matches!(
        probe.next_of(EventKind::Error).await,
        BridgeEvent::Error { .. }
    ));
    let status = bridge.status().await.expect("status");
    assert_eq!(status.state, ChannelState::ReconnectScheduled);
    assert!(status.has_reconnect_timer);

    // WHEN: Several commands are sent while waiting
    for n in 0..3 {
        let receipt = bridge
            .send_command("ping", &json!({ "n": n }))
            .await
            .expect("send_command");
        assert!(receipt.queued);
    }

    // THEN: Still one pending reconnect, all commands queued
    let status = bridge.status().await.expect("status");
    assert_eq!(status.state, ChannelState::ReconnectScheduled);
    assert!(status.has_reconnect_timer);
    assert_eq!(status.queued_messages, 3);
}

// ----------------------------------------------------------------------------
// Manual disconnect
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies a manual disconnect stays disconnected: no timer, and later
/// sends queue without dialling.
///
/// **BUG THIS CATCHES**: Would catch if `disconnect()` were treated like a peer close
/// and the channel reconnected by itself.
#[tokio::test]
async fn given_manual_disconnect_when_send_then_queued_without_reconnect() {
    // GIVEN: An open channel
    let mut worker = MockWorker::start().await;
    let bridge = BridgeHandle::spawn(&test_config(worker.port), EventBus::new())
        .expect("Failed to spawn bridge");
    let mut probe = EventProbe::attach(
        bridge.bus(),
        &[EventKind::Connected, EventKind::Disconnected],
    );
    bridge.connect().await.expect("connect");
    let _first = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: Disconnecting manually
    bridge.disconnect().await.expect("disconnect");

    // THEN: Disconnected with the manual reason, idle, no timer
    match probe.next_of(EventKind::Disconnected).await {
        BridgeEvent::Disconnected { reason } => assert_eq!(reason, MANUAL_DISCONNECT_REASON),
        other => panic!("Expected Disconnected, got {other:?}"),
    }
    let status = bridge.status().await.expect("status");
    assert_eq!(status.state, ChannelState::Idle);
    assert!(!status.has_reconnect_timer);

    // WHEN: A command is sent afterwards
    let receipt = bridge
        .send_command("status", &json!({}))
        .await
        .expect("send_command");

    // THEN: Queued, no timer, and no reconnect attempt
    assert!(receipt.queued);
    assert!(!bridge.status().await.expect("status").has_reconnect_timer);
    assert!(worker.connection_within(QUIET_PERIOD).await.is_none());

    // WHEN: Connecting again
    bridge.connect().await.expect("connect");

    // THEN: The queued command is delivered on the new connection
    let mut second = worker.next_connection().await;
    assert_eq!(second.recv_json().await["command"], "status");
}
