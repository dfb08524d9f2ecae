use crate::error::DeployBotError;
use crate::surface_host::SurfaceLabels;

use bridge_core::context::BridgeContext;

use common::ErrorLocation;

use std::panic::Location;

use log::warn;

/// Tauri-managed application state.
///
/// Wraps the [`BridgeContext`] built at start-up together with the surface
/// label registry, so commands invoked from a notification window can find
/// out which notification they belong to.
#[derive(Clone)]
pub struct AppState {
    context: BridgeContext,
    labels: SurfaceLabels,
}

impl AppState {
    pub fn new(context: BridgeContext, labels: SurfaceLabels) -> Self {
        Self { context, labels }
    }

    pub fn context(&self) -> &BridgeContext {
        &self.context
    }

    pub fn labels(&self) -> &SurfaceLabels {
        &self.labels
    }

    /// Notification id shown by the window labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployBotError::UnknownSurface`] if the window is not a
    /// registered notification surface.
    #[track_caller]
    pub fn notification_id(&self, label: &str) -> Result<String, DeployBotError> {
        self.labels.notification_id(label).ok_or_else(|| {
            warn!("Window '{label}' is not a notification surface");
            DeployBotError::UnknownSurface {
                message: format!("Window '{label}' is not a notification surface"),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }
}
