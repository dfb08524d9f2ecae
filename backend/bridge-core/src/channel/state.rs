use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;

/// Connection state machine.
///
/// `Idle → Connecting → Connected → (Closed | Errored) → ReconnectScheduled → Connecting → …`
///
/// Only an explicit `disconnect()` returns to `Idle`, and nothing leaves
/// `Idle` on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelState {
    Idle,
    Connecting,
    Connected,
    Closed,
    Errored,
    ReconnectScheduled,
}

impl ChannelState {
    /// States in which a queued command should arm the reconnect timer.
    pub(crate) fn wants_reconnect(&self) -> bool {
        matches!(
            self,
            ChannelState::Closed | ChannelState::Errored | ChannelState::ReconnectScheduled
        )
    }
}

impl Display for ChannelState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ChannelState::Idle => "IDLE",
            ChannelState::Connecting => "CONNECTING",
            ChannelState::Connected => "CONNECTED",
            ChannelState::Closed => "CLOSED",
            ChannelState::Errored => "ERRORED",
            ChannelState::ReconnectScheduled => "RECONNECT_SCHEDULED",
        };
        formatter.write_str(name)
    }
}

/// Snapshot returned by `BridgeHandle::status()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatus {
    pub connected: bool,
    pub queued_messages: usize,
    pub has_reconnect_timer: bool,
    pub state: ChannelState,
}
