// Unit tests for the notification actor. The clock is paused, so fades
// complete as soon as the test sleeps past them.

use crate::channel::BridgeHandle;
use crate::config::{BridgeConfig, LayoutConfig};
use crate::fanout::{BridgeEvent, EventBus};
use crate::notification::{
    NotificationCommand, NotificationHandle, SurfaceEvent, SurfacePhase, command_from_event,
};
use crate::tests::notification::{HostCall, RecordingHost};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

const FADE_SETTLED: Duration = Duration::from_secs(1);

fn show_custom(id: &str) -> BridgeEvent {
    BridgeEvent::Notification {
        event: Some("show_custom".to_string()),
        data: json!({
            "notification": {
                "id": id,
                "template": "task_suggestion",
                "title": "Time to switch",
                "message": "Deploy started",
                "actions": ["Switch Now", "Dismiss"],
                "data": {"project_name": "site"}
            },
            "timestamp": "2026-01-01T00:00:00"
        }),
    }
}

fn start_service() -> (NotificationHandle, BridgeHandle, RecordingHost) {
    let host = RecordingHost::default();
    let bridge =
        BridgeHandle::spawn(&BridgeConfig::default(), EventBus::new()).expect("valid endpoint");
    let notifications = NotificationHandle::spawn(host.clone(), LayoutConfig::default(), bridge.clone());
    (notifications, bridge, host)
}

/// **VALUE**: Only show_custom, dismiss and dismiss_all drive the stack.
#[test]
fn given_notification_events_when_mapped_then_only_stack_events_produce_commands() {
    // GIVEN/WHEN
    let show = command_from_event(&show_custom("n1"));
    let dismiss = command_from_event(&BridgeEvent::Notification {
        event: Some("dismiss".to_string()),
        data: json!({"notification_id": "n1"}),
    });
    let dismiss_all = command_from_event(&BridgeEvent::Notification {
        event: Some("dismiss_all".to_string()),
        data: json!({}),
    });
    let modal = command_from_event(&BridgeEvent::Notification {
        event: Some("show_modal".to_string()),
        data: json!({"notification": {"id": "n2"}}),
    });
    let malformed = command_from_event(&BridgeEvent::Notification {
        event: Some("show_custom".to_string()),
        data: json!({"notification": {"title": "no id"}}),
    });
    let other_kind = command_from_event(&BridgeEvent::Connected);

    // THEN
    assert!(matches!(show, Some(NotificationCommand::Show(n)) if n.id == "n1"));
    assert!(matches!(dismiss, Some(NotificationCommand::Dismiss(id)) if id == "n1"));
    assert!(matches!(dismiss_all, Some(NotificationCommand::DismissAll)));
    assert!(modal.is_none());
    assert!(malformed.is_none());
    assert!(other_kind.is_none());
}

/// **VALUE**: A worker show_custom event creates a hidden surface that fades in
/// once the host reports the page loaded.
#[tokio::test(start_paused = true)]
async fn given_show_custom_event_when_content_ready_then_surface_fades_in() {
    // GIVEN: Service subscribed to the bridge's bus
    let (notifications, bridge, host) = start_service();

    // WHEN: The worker pushes show_custom
    bridge.bus().publish(&show_custom("n1"));

    // THEN: Surface created, waiting for content
    let snapshot = notifications.snapshot().await.expect("actor alive");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].phase, SurfacePhase::PendingContent);
    assert_eq!(snapshot[0].geometry.height, 180);

    // WHEN: Host reports the page is ready and the fade runs
    notifications
        .surface_event(SurfaceEvent::ContentReady {
            id: "n1".to_string(),
        })
        .await
        .expect("actor alive");
    tokio::time::sleep(FADE_SETTLED).await;

    // THEN: Fully visible
    let snapshot = notifications.snapshot().await.expect("actor alive");
    assert_eq!(snapshot[0].phase, SurfacePhase::Visible);
    assert_eq!(snapshot[0].opacity, 1.0);
    assert!(host.calls().contains(&HostCall::Show("n1".to_string())));
}

/// **VALUE**: A button click is forwarded as notification-action and the surface
/// dismissed locally without waiting for the worker.
///
/// **WHY THIS MATTERS**: With the worker down the click must still close the
/// surface, and the action must wait in the queue rather than vanish.
#[tokio::test(start_paused = true)]
async fn given_visible_surface_when_action_then_forwarded_and_dismissed() {
    // GIVEN: A visible notification, bridge never connected
    let (notifications, bridge, host) = start_service();
    bridge.bus().publish(&show_custom("n1"));
    notifications
        .surface_event(SurfaceEvent::ContentReady {
            id: "n1".to_string(),
        })
        .await
        .expect("actor alive");
    tokio::time::sleep(FADE_SETTLED).await;

    // WHEN: User clicks "Switch Now"
    notifications
        .surface_event(SurfaceEvent::Action {
            id: "n1".to_string(),
            action: "switch_now".to_string(),
            data: None,
        })
        .await
        .expect("actor alive");
    tokio::time::sleep(FADE_SETTLED).await;

    // THEN: One command queued on the bridge, surface faded out and closed
    let status = bridge.status().await.expect("channel alive");
    assert_eq!(status.queued_messages, 1);
    assert!(!status.has_reconnect_timer, "idle bridge must not start reconnecting");

    let snapshot = notifications.snapshot().await.expect("actor alive");
    assert!(snapshot.is_empty());
    assert!(host.calls().contains(&HostCall::Close("n1".to_string())));
}

/// **VALUE**: Worker-initiated dismiss and dismiss_all close surfaces.
#[tokio::test(start_paused = true)]
async fn given_visible_surfaces_when_worker_dismisses_then_closed() {
    // GIVEN: Two visible notifications
    let (notifications, bridge, host) = start_service();
    for id in ["n1", "n2"] {
        bridge.bus().publish(&show_custom(id));
        notifications
            .surface_event(SurfaceEvent::ContentReady { id: id.to_string() })
            .await
            .expect("actor alive");
    }
    tokio::time::sleep(FADE_SETTLED).await;

    // WHEN: Worker dismisses n1
    bridge.bus().publish(&BridgeEvent::Notification {
        event: Some("dismiss".to_string()),
        data: json!({"notification_id": "n1"}),
    });
    tokio::time::sleep(FADE_SETTLED).await;

    // THEN: Only n2 remains, now at the top
    let snapshot = notifications.snapshot().await.expect("actor alive");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, "n2");
    assert_eq!(snapshot[0].geometry.y, 25 + 20);

    // WHEN: Worker dismisses everything
    bridge.bus().publish(&BridgeEvent::Notification {
        event: Some("dismiss_all".to_string()),
        data: json!({}),
    });
    tokio::time::sleep(FADE_SETTLED).await;

    // THEN
    assert!(notifications.snapshot().await.expect("actor alive").is_empty());
    assert!(host.alive_ids().is_empty());
}

/// **VALUE**: After detaching, worker events no longer reach the stack.
#[tokio::test(start_paused = true)]
async fn given_detached_service_when_show_custom_then_ignored() {
    // GIVEN
    let (notifications, bridge, _host) = start_service();
    assert!(notifications.detach());

    // WHEN
    bridge.bus().publish(&show_custom("n1"));

    // THEN
    assert!(notifications.snapshot().await.expect("actor alive").is_empty());
}

/// **VALUE**: Dropping every handle stops the actor even though its bus
/// subscription is still registered.
///
/// **BUG THIS CATCHES**: Would catch the subscription keeping the actor alive, and
/// through its bridge handle the channel actor as well, for the life of the bus.
#[tokio::test(start_paused = true)]
async fn given_all_handles_dropped_when_bus_outlives_them_then_actor_stops() {
    // GIVEN: A running service whose bus is kept by the test
    let (notifications, bridge, host) = start_service();
    let bus = bridge.bus().clone();
    assert!(notifications.snapshot().await.expect("actor alive").is_empty());

    // WHEN: Every handle is dropped
    drop(notifications);
    drop(bridge);

    // THEN: The actor releases its host
    for _ in 0..100 {
        if Arc::strong_count(&host.state) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(Arc::strong_count(&host.state), 1, "actor still holds the host");

    // THEN: Events published afterwards are dropped quietly
    bus.publish(&show_custom("late"));
    assert!(host.alive_ids().is_empty());
}
