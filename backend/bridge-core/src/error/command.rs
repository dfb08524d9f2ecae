use crate::error::channel::ChannelError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },

    /// Only produced when the outbound queue is bounded with the `reject` policy.
    #[error("Queue Full Error: {message} {location}")]
    QueueFull {
        message: String,
        location: ErrorLocation,
    },

    #[error("Worker Error: {command}: {message} {location}")]
    Worker {
        command: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
