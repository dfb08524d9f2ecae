use crate::bridge_tests::helpers::{EventProbe, HeadlessHost, MockWorker, STEP_TIMEOUT, test_config};

use bridge_core::NOTIFICATION_ACTION_COMMAND;
use bridge_core::config::LayoutConfig;
use bridge_core::context::BridgeContext;
use bridge_core::fanout::EventKind;
use bridge_core::notification::{SurfaceEvent, SurfacePhase, SurfaceSnapshot};

use std::time::Duration;

use serde_json::json;
use tokio::time::{Instant, sleep};

async fn wait_for_surfaces(context: &BridgeContext, count: usize) -> Vec<SurfaceSnapshot> {
    let deadline = Instant::now() + STEP_TIMEOUT;
    loop {
        let snapshot = context
            .notifications()
            .snapshot()
            .await
            .expect("snapshot");
        if snapshot.len() == count {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "Expected {count} surface(s), have {}",
            snapshot.len()
        );
        sleep(Duration::from_millis(20)).await;
    }
}

// ============================================================================
// BridgeContext end to end: worker event → surface → action → worker
// ============================================================================

/// **VALUE**: Verifies the whole notification loop through a real connection: a worker
/// `show_custom` creates a surface, and a user action goes back to the worker as
/// `notification-action` and dismisses the surface.
///
/// **WHY THIS MATTERS**: This is the path every approval prompt takes. Each hop is
/// unit tested, this proves they are wired together.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The notification service is not subscribed to the context's bus
/// - Actions are not forwarded or carry the wrong notification id
/// - The surface is left open after an action
#[tokio::test]
async fn given_running_context_when_worker_shows_and_user_acts_then_action_reaches_worker() {
    // GIVEN: A started context connected to the worker
    let mut worker = MockWorker::start().await;
    let host = HeadlessHost::default();
    let context = BridgeContext::new(
        test_config(worker.port),
        LayoutConfig::default(),
        host.clone(),
    )
    .expect("Failed to build context");
    let mut probe = EventProbe::attach(context.bus(), &[EventKind::Connected]);
    assert!(context.startup().await.expect("startup").is_none());
    let mut connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    // WHEN: The worker asks for a notification
    connection.send_json(json!({
        "type": "notification",
        "event": "show_custom",
        "data": {
            "notification": {
                "id": "deploy-42",
                "template": "task_suggestion",
                "title": "Deploy detected",
                "message": "api@main is ready",
                "actions": ["Approve", "Dismiss"],
                "data": { "deploy": 42 }
            }
        }
    }));

    // THEN: One surface is created, waiting for its content
    let snapshot = wait_for_surfaces(&context, 1).await;
    assert_eq!(snapshot[0].id, "deploy-42");
    assert_eq!(snapshot[0].phase, SurfacePhase::PendingContent);
    assert_eq!(host.live_count(), 1);

    // WHEN: The surface loads and the user approves
    context
        .notifications()
        .surface_event(SurfaceEvent::ContentReady {
            id: "deploy-42".to_string(),
        })
        .await
        .expect("content ready");
    context
        .notifications()
        .surface_event(SurfaceEvent::Action {
            id: "deploy-42".to_string(),
            action: "approve".to_string(),
            data: None,
        })
        .await
        .expect("action");

    // THEN: The worker receives the action with the notification's data
    let frame = connection.recv_json().await;
    assert_eq!(frame["command"], NOTIFICATION_ACTION_COMMAND);
    assert_eq!(frame["data"]["notification_id"], "deploy-42");
    assert_eq!(frame["data"]["action"], "approve");
    assert_eq!(frame["data"]["data"]["deploy"], 42);

    // THEN: The surface fades out and is gone
    wait_for_surfaces(&context, 0).await;
    assert_eq!(host.live_count(), 0);

    context.shutdown().await.expect("shutdown");
}

/// **VALUE**: Verifies shutdown closes the channel and dismisses every surface.
#[tokio::test]
async fn given_open_surfaces_when_shutdown_then_channel_closed_and_surfaces_dismissed() {
    // GIVEN: A started context with one visible notification
    let mut worker = MockWorker::start().await;
    let host = HeadlessHost::default();
    let context = BridgeContext::new(
        test_config(worker.port),
        LayoutConfig::default(),
        host.clone(),
    )
    .expect("Failed to build context");
    let mut probe = EventProbe::attach(
        context.bus(),
        &[EventKind::Connected, EventKind::Disconnected],
    );
    context.startup().await.expect("startup");
    let _connection = worker.next_connection().await;
    probe.next_of(EventKind::Connected).await;

    let notification = serde_json::from_value(json!({
        "id": "n1",
        "title": "Heads up",
        "message": "Build finished"
    }))
    .expect("notification");
    context
        .notifications()
        .show(notification)
        .await
        .expect("show");
    context
        .notifications()
        .surface_event(SurfaceEvent::ContentReady {
            id: "n1".to_string(),
        })
        .await
        .expect("content ready");

    // WHEN: Shutting down
    context.shutdown().await.expect("shutdown");

    // THEN: Disconnected is published, the channel is idle and the surface fades away
    probe.next_of(EventKind::Disconnected).await;
    let status = context.bridge().status().await.expect("status");
    assert!(!status.connected);
    assert!(!status.has_reconnect_timer);
    wait_for_surfaces(&context, 0).await;
    assert_eq!(host.live_count(), 0);
}
