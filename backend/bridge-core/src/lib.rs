//! Process bridge and notification orchestrator for the DeployBot host.
//!
//! The host keeps one persistent WebSocket channel to the DeployBot worker,
//! queues commands while the worker is unreachable, fans worker events out to
//! typed subscribers, and projects `notification` events onto stacked overlay
//! surfaces.
//!
//! - [`channel`]: connection state machine and the [`channel::BridgeHandle`] command surface
//! - [`router`]: outbound [`router::Message`]s and the [`router::OutboundQueue`]
//! - [`fanout`]: [`fanout::EventBus`] and inbound frame dispatch
//! - [`notification`]: surface stacking, layout and fade animation
//! - [`worker`]: start/stop/restart of a single worker process
//! - [`context`]: wires all of the above together at process start

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod fanout;
pub mod notification;
pub mod router;
pub mod worker;

#[cfg(test)]
mod tests;

pub const WORKER_HOSTNAME: &str = "127.0.0.1";
pub const WORKER_PORT: u16 = 8765;
pub const WORKER_WS_SCHEME: &str = "ws://";
/// Endpoint of a worker started with default settings.
pub const DEFAULT_WORKER_URL: &str =
    const_format::concatcp!(WORKER_WS_SCHEME, WORKER_HOSTNAME, ":", WORKER_PORT);

/// Command the worker understands for user interaction on a notification surface.
pub const NOTIFICATION_ACTION_COMMAND: &str = "notification-action";
