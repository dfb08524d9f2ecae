use crate::error::protocol::ProtocolError;

use std::fmt::{Display, Formatter, Result as FormatResult};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TYPE_SYSTEM: &str = "system";
const TYPE_RESPONSE: &str = "response";
const TYPE_ERROR: &str = "error";
const TYPE_DEPLOY_DETECTED: &str = "deploy_detected";
const TYPE_TASK_SELECTED: &str = "task_selected";
const TYPE_NOTIFICATION: &str = "notification";

const UNKNOWN_WORKER_ERROR: &str = "Unknown worker error";

/// One worker → host frame.
///
/// `type` is the only required field; everything else is optional so new
/// worker event kinds still parse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(skip)]
    pub raw: Value,
}

impl InboundEvent {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Parse`] if the frame is not JSON
    /// - [`ProtocolError::Schema`] if it is JSON but has no string `type`
    #[track_caller]
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw: Value = serde_json::from_str(text)?;
        let mut event: InboundEvent = serde_json::from_value(raw.clone())?;
        event.raw = raw;
        Ok(event)
    }

    fn data_or_empty(&self) -> Value {
        self.data
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

/// Subscription key for [`BridgeEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    System,
    Response,
    DeployDetected,
    TaskSelected,
    Notification,
    Message,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Error,
        EventKind::System,
        EventKind::Response,
        EventKind::DeployDetected,
        EventKind::TaskSelected,
        EventKind::Notification,
        EventKind::Message,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::Error => "error",
            EventKind::System => "system",
            EventKind::Response => "response",
            EventKind::DeployDetected => "deploy_detected",
            EventKind::TaskSelected => "task_selected",
            EventKind::Notification => "notification",
            EventKind::Message => "message",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

/// Local event published on the [`EventBus`](crate::fanout::EventBus).
///
/// `Connected`, `Disconnected` and (for transport failures) `Error` come from
/// the channel itself; the rest are dispatched from worker frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Connected,
    Disconnected { reason: String },
    Error { message: String },
    System { event: Option<String>, data: Value },
    Response { command: String, data: Value },
    DeployDetected { data: Value },
    TaskSelected { data: Value },
    Notification { event: Option<String>, data: Value },
    /// Any worker frame with an unrecognised `type`, carried verbatim.
    Message { payload: Value },
}

impl BridgeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BridgeEvent::Connected => EventKind::Connected,
            BridgeEvent::Disconnected { .. } => EventKind::Disconnected,
            BridgeEvent::Error { .. } => EventKind::Error,
            BridgeEvent::System { .. } => EventKind::System,
            BridgeEvent::Response { .. } => EventKind::Response,
            BridgeEvent::DeployDetected { .. } => EventKind::DeployDetected,
            BridgeEvent::TaskSelected { .. } => EventKind::TaskSelected,
            BridgeEvent::Notification { .. } => EventKind::Notification,
            BridgeEvent::Message { .. } => EventKind::Message,
        }
    }
}

/// Map a parsed worker frame to the single local event it produces.
pub fn dispatch(inbound: InboundEvent) -> BridgeEvent {
    match inbound.kind.as_str() {
        TYPE_SYSTEM => BridgeEvent::System {
            data: inbound.data_or_empty(),
            event: inbound.event,
        },
        TYPE_RESPONSE => {
            let data = inbound.data_or_empty();
            let command = inbound.command.unwrap_or_else(|| {
                debug!("Response frame without a command field");
                String::new()
            });
            BridgeEvent::Response { command, data }
        }
        TYPE_ERROR => BridgeEvent::Error {
            message: inbound
                .message
                .unwrap_or_else(|| UNKNOWN_WORKER_ERROR.to_string()),
        },
        TYPE_DEPLOY_DETECTED => BridgeEvent::DeployDetected {
            data: inbound.data_or_empty(),
        },
        TYPE_TASK_SELECTED => BridgeEvent::TaskSelected {
            data: inbound.data_or_empty(),
        },
        TYPE_NOTIFICATION => BridgeEvent::Notification {
            data: inbound.data_or_empty(),
            event: inbound.event,
        },
        other => {
            debug!("Unrecognised worker event type '{other}', publishing as message");
            BridgeEvent::Message {
                payload: inbound.raw,
            }
        }
    }
}
