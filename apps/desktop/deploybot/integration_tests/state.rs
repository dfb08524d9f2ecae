use deploybot::error::DeployBotError;
use deploybot::state::AppState;
use deploybot::surface_host::SurfaceLabels;

use bridge_core::channel::ChannelState;
use bridge_core::config::{BridgeConfig, LayoutConfig};
use bridge_core::context::BridgeContext;
use bridge_core::error::surface::SurfaceError;
use bridge_core::notification::{Geometry, Notification, SurfaceHost, WorkArea};

use serde_json::json;

// ============================================================================
// Integration tests for AppState + bridge-core
// These wire a real BridgeContext the way setup() does, minus the windows
// ============================================================================

/// Surface host that accepts everything and shows nothing.
struct NullHost;

impl SurfaceHost for NullHost {
    fn work_area(&self) -> WorkArea {
        WorkArea {
            x: 0,
            y: 0,
            width: 1280,
            height: 800,
        }
    }

    fn create(&mut self, _id: &str, _bounds: Geometry) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn attach_content(&mut self, _id: &str, _notification: &Notification) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn show(&mut self, _id: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_opacity(&mut self, _id: &str, _opacity: f64) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_bounds(&mut self, _id: &str, _bounds: Geometry) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn close(&mut self, _id: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn is_alive(&self, _id: &str) -> bool {
        true
    }
}

fn app_state() -> AppState {
    let context = BridgeContext::new(BridgeConfig::default(), LayoutConfig::default(), NullHost)
        .expect("Failed to build context");
    AppState::new(context, SurfaceLabels::default())
}

/// **VALUE**: Commands from a window that is not a notification surface are refused
/// with a typed error, while registered surfaces resolve to their notification id.
///
/// **BUG THIS CATCHES**: Would catch `notification_action` from the main window being
/// forwarded to the worker with a made-up id.
#[tokio::test]
async fn given_app_state_when_resolving_window_labels_then_only_surfaces_resolve() {
    // GIVEN: App state with one registered surface
    let state = app_state();
    let label = state.labels().register("deploy 42");

    // WHEN / THEN: The main window is not a surface
    assert!(matches!(
        state.notification_id("main"),
        Err(DeployBotError::UnknownSurface { .. })
    ));

    // WHEN / THEN: The surface resolves to the original id
    assert_eq!(state.notification_id(&label).expect("registered"), "deploy 42");
}

/// **VALUE**: A freshly built app state holds an idle bridge that queues commands
/// until the frontend connects.
///
/// **WHY THIS MATTERS**: `setup()` manages the state before `startup()` has run. Early
/// commands from the frontend must queue, not fail.
#[tokio::test]
async fn given_fresh_app_state_when_sending_then_queued_while_idle() {
    // GIVEN: App state whose bridge never connected
    let state = app_state();

    // WHEN: Sending a command
    let receipt = state
        .context()
        .bridge()
        .send_command("status", &json!({}))
        .await
        .expect("send_command");

    // THEN: Queued, idle, no reconnect armed
    assert!(receipt.queued);
    let status = state.context().bridge().status().await.expect("status");
    assert_eq!(status.state, ChannelState::Idle);
    assert_eq!(status.queued_messages, 1);
    assert!(!status.has_reconnect_timer);
}
