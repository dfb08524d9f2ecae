//! Re-emits bridge events to the frontend.

use bridge_core::fanout::{BridgeEvent, EventBus, EventKind, SubscriptionId};

/// Tauri event name carrying every [`BridgeEvent`], tagged by `type`.
pub const BRIDGE_EVENT: &str = "bridge-event";

/// Label of the main window in `tauri.conf.json`.
pub const MAIN_WINDOW_LABEL: &str = "main";

/// Subscribe `emit` to every event kind on `bus`.
///
/// Returns one subscription per kind, in [`EventKind::ALL`] order.
pub fn forward_events<F>(bus: &EventBus, emit: F) -> Vec<SubscriptionId>
where
    F: Fn(&BridgeEvent) + Clone + Send + Sync + 'static,
{
    EventKind::ALL
        .iter()
        .map(|kind| bus.subscribe(*kind, emit.clone()))
        .collect()
}
