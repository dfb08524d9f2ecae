use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// A single inbound frame could not be understood. The frame is dropped and
/// the channel stays open.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Parse Error: {message} {location}")]
    Parse {
        message: String,
        location: ErrorLocation,
    },

    #[error("Schema Error: {message} {location}")]
    Schema {
        message: String,
        location: ErrorLocation,
    },
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        let location = ErrorLocation::from(Location::caller());
        if error.is_data() {
            ProtocolError::Schema {
                message: error.to_string(),
                location,
            }
        } else {
            ProtocolError::Parse {
                message: error.to_string(),
                location,
            }
        }
    }
}
