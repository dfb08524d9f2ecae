use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Operation on a notification surface that is missing or was destroyed by the
/// environment. The notification manager absorbs these.
#[derive(Debug, ThisError)]
pub enum SurfaceError {
    #[error("Surface Not Found Error: {id} {location}")]
    NotFound { id: String, location: ErrorLocation },

    #[error("Surface Host Error: {id}: {message} {location}")]
    Host {
        id: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Notification Service Unavailable Error: {message} {location}")]
    ServiceUnavailable {
        message: String,
        location: ErrorLocation,
    },
}
