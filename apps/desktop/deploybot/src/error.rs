use bridge_core::error::CoreError;
use bridge_core::error::channel::ChannelError;
use bridge_core::error::command::CommandError;
use bridge_core::error::config::ConfigError;
use bridge_core::error::surface::SurfaceError;

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in Tauri commands.
///
/// These errors are converted to strings for IPC, but we maintain
/// structured error information and location tracking internally.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum DeployBotError {
    /// Error from this App
    #[error("DeployBot Error: {message} {location}")]
    DeployBot {
        message: String,
        location: ErrorLocation,
    },

    /// Error from bridge-core (channel, worker, config)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// A command could not be sent or was rejected by the worker
    #[error("Command Error: {message} {location}")]
    Command {
        message: String,
        location: ErrorLocation,
    },

    /// The calling window is not a live notification surface
    #[error("Unknown Surface Error: {message} {location}")]
    UnknownSurface {
        message: String,
        location: ErrorLocation,
    },

    /// The notification service is gone
    #[error("Surface Error: {message} {location}")]
    Surface {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for DeployBotError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        DeployBotError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ChannelError> for DeployBotError {
    #[track_caller]
    fn from(error: ChannelError) -> Self {
        DeployBotError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CommandError> for DeployBotError {
    #[track_caller]
    fn from(error: CommandError) -> Self {
        DeployBotError::Command {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for DeployBotError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        DeployBotError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<SurfaceError> for DeployBotError {
    #[track_caller]
    fn from(error: SurfaceError) -> Self {
        DeployBotError::Surface {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
