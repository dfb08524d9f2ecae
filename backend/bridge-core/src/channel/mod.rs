//! Channel Client: one persistent WebSocket connection to the worker.
//!
//! # Architecture
//!
//! All connection state (current [`ChannelState`], the outbound queue, the
//! reconnect deadline and the write half of the socket) is owned by a single
//! actor task. [`BridgeHandle`] is the only way in: every operation is a
//! message to the actor, so flushes and direct sends can never interleave.
//!
//! Connecting and reading run in helper tasks that report back to the actor
//! tagged with a connection generation. Anything tagged with an older
//! generation (for example a connect that finished after `disconnect()`) is
//! discarded.

pub(crate) mod actor;
mod handle;
mod state;

pub use handle::BridgeHandle;
pub use state::{BridgeStatus, ChannelState};

/// Reason carried by the `disconnected` event after an explicit `disconnect()`.
pub const MANUAL_DISCONNECT_REASON: &str = "manual disconnect";
