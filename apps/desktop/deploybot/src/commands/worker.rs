use crate::error::DeployBotError;
use crate::state::AppState;

use bridge_core::worker::WorkerInfo;

use log::info;
use tauri::{State, command as TauriCommand};

/// The worker the bridge is using, if one was started or adopted.
#[TauriCommand]
pub async fn worker_info(state: State<'_, AppState>) -> Result<Option<WorkerInfo>, DeployBotError> {
    Ok(state.context().worker_info().await)
}

/// Stop the worker (if owned), start it again and reconnect.
#[TauriCommand]
pub async fn worker_restart(state: State<'_, AppState>) -> Result<WorkerInfo, DeployBotError> {
    info!("Frontend requested worker restart");
    let worker = state.context().restart_worker().await?;
    Ok(worker)
}
