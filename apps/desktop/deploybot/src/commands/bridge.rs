use crate::error::DeployBotError;
use crate::state::AppState;

use bridge_core::channel::BridgeStatus;
use bridge_core::router::CommandReceipt;

use std::time::Duration;

use log::{debug, info};
use serde_json::Value;
use tauri::{State, command as TauriCommand};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Open the worker channel. No-op while connecting or connected.
///
/// Returns once the request is accepted; the frontend learns about the
/// outcome from `bridge-event` (`connected` / `error`).
#[TauriCommand]
pub async fn bridge_connect(state: State<'_, AppState>) -> Result<(), DeployBotError> {
    info!("Frontend requested connect");
    state.context().bridge().connect().await?;
    Ok(())
}

/// Close the worker channel and stay disconnected until `bridge_connect`.
#[TauriCommand]
pub async fn bridge_disconnect(state: State<'_, AppState>) -> Result<(), DeployBotError> {
    info!("Frontend requested disconnect");
    state.context().bridge().disconnect().await?;
    Ok(())
}

/// Send a command to the worker, queueing it if the channel is not open.
///
/// # Returns
///
/// * `Ok(CommandReceipt)` - `success` if transmitted now, `queued` otherwise
/// * `Err(DeployBotError)` - `data` could not be serialized, or the queue refused it
#[TauriCommand]
pub async fn bridge_send_command(
    state: State<'_, AppState>,
    command: String,
    data: Option<Value>,
) -> Result<CommandReceipt, DeployBotError> {
    let data = data.unwrap_or_else(|| Value::Object(Default::default()));
    let receipt = state
        .context()
        .bridge()
        .send_command(&command, &data)
        .await?;

    debug!(
        "Command '{command}' {} as {}",
        if receipt.queued { "queued" } else { "sent" },
        receipt.command_id
    );
    Ok(receipt)
}

/// Send a command and wait for the worker's response to it.
#[TauriCommand]
pub async fn bridge_request(
    state: State<'_, AppState>,
    command: String,
    data: Option<Value>,
    timeout_ms: Option<u64>,
) -> Result<Value, DeployBotError> {
    let data = data.unwrap_or_else(|| Value::Object(Default::default()));
    let timeout = Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS));

    let response = state
        .context()
        .bridge()
        .request(&command, &data, timeout)
        .await?;
    Ok(response)
}

#[TauriCommand]
pub async fn bridge_status(state: State<'_, AppState>) -> Result<BridgeStatus, DeployBotError> {
    let status = state.context().bridge().status().await?;
    Ok(status)
}
