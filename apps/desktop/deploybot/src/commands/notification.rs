use crate::error::DeployBotError;
use crate::state::AppState;

use bridge_core::notification::SurfaceEvent;

use log::debug;
use serde_json::Value;
use tauri::{State, WebviewWindow, command as TauriCommand};

/// Action id sent when the user closes a surface without picking a button.
const DISMISS_ACTION: &str = "dismiss";

/// Called by a notification window once its page can receive content.
#[TauriCommand]
pub async fn notification_ready(
    window: WebviewWindow,
    state: State<'_, AppState>,
) -> Result<(), DeployBotError> {
    let id = state.notification_id(window.label())?;
    debug!("Surface for {id} ready");

    state
        .context()
        .notifications()
        .surface_event(SurfaceEvent::ContentReady { id })
        .await?;
    Ok(())
}

/// The user clicked an action button on a notification window.
///
/// The action is forwarded to the worker as `notification-action` and the
/// surface fades out.
#[TauriCommand]
pub async fn notification_action(
    window: WebviewWindow,
    state: State<'_, AppState>,
    action: String,
    data: Option<Value>,
) -> Result<(), DeployBotError> {
    let id = state.notification_id(window.label())?;
    debug!("Action '{action}' on {id}");

    state
        .context()
        .notifications()
        .surface_event(SurfaceEvent::Action { id, action, data })
        .await?;
    Ok(())
}

/// The user closed a notification window.
#[TauriCommand]
pub async fn notification_dismiss(
    window: WebviewWindow,
    state: State<'_, AppState>,
) -> Result<(), DeployBotError> {
    let id = state.notification_id(window.label())?;

    state
        .context()
        .notifications()
        .surface_event(SurfaceEvent::Action {
            id,
            action: DISMISS_ACTION.to_string(),
            data: None,
        })
        .await?;
    Ok(())
}
