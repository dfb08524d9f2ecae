use crate::error::command::CommandError;

use common::ErrorLocation;

use std::panic::Location;
use std::time::{SystemTime, UNIX_EPOCH};

use humantime::format_rfc3339_millis;
use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

const MESSAGE_ID_PREFIX: &str = "msg";
const MESSAGE_ID_SUFFIX_LEN: usize = 9;

/// One host → worker command, as sent on the wire:
/// `{command, data, id, timestamp}` with an RFC 3339 timestamp.
///
/// Immutable once built; the id and timestamp are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    command: String,
    data: Value,
    id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: SystemTime,
}

impl Message {
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        let timestamp = SystemTime::now();
        Self {
            command: command.into(),
            data,
            id: generate_id(timestamp),
            timestamp,
        }
    }

    /// Build a message from any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Serialization`] if `data` cannot be represented as JSON.
    #[track_caller]
    pub fn from_serializable<T>(command: &str, data: &T) -> Result<Self, CommandError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(data).map_err(|e| CommandError::Serialization {
            message: format!("Failed to serialize data for '{command}': {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
        Ok(Self::new(command, value))
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Text frame for the channel.
    #[track_caller]
    pub fn to_frame(&self) -> Result<String, CommandError> {
        serde_json::to_string(self).map_err(|e| CommandError::Serialization {
            message: format!("Failed to encode message {}: {e}", self.id),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Time-based id with a random suffix: `msg_<unix millis>_<9 hex chars>`.
fn generate_id(timestamp: SystemTime) -> String {
    let millis = timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{MESSAGE_ID_PREFIX}_{millis}_{}",
        &suffix[..MESSAGE_ID_SUFFIX_LEN]
    )
}

fn serialize_timestamp<S>(timestamp: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&format_rfc3339_millis(*timestamp))
}

/// Result of `send_command`: either transmitted now or parked in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReceipt {
    pub success: bool,
    pub queued: bool,
    pub command_id: String,
}

impl CommandReceipt {
    pub fn sent(command_id: impl Into<String>) -> Self {
        Self {
            success: true,
            queued: false,
            command_id: command_id.into(),
        }
    }

    pub fn queued(command_id: impl Into<String>) -> Self {
        Self {
            success: false,
            queued: true,
            command_id: command_id.into(),
        }
    }
}
