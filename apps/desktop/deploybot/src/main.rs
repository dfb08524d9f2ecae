// Prevents additional console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use deploybot::commands;
use deploybot::error::DeployBotError;
use deploybot::events::{BRIDGE_EVENT, MAIN_WINDOW_LABEL, forward_events};
use deploybot::logger::initialize as LoggerInitialize;
use deploybot::state::AppState;
use deploybot::surface_host::{SURFACE_LABEL_PREFIX, SurfaceLabels, TauriSurfaceHost};

use bridge_core::config::{BridgeConfig, LayoutConfig};
use bridge_core::context::BridgeContext;
use bridge_core::notification::SurfaceEvent;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;

use log::{error, info, warn};
use tauri::{App, AppHandle, Emitter, EventTarget, Manager, RunEvent, Window, WindowEvent};

fn main() {
    let app = tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![
            commands::bridge::bridge_connect,
            commands::bridge::bridge_disconnect,
            commands::bridge::bridge_send_command,
            commands::bridge::bridge_request,
            commands::bridge::bridge_status,
            commands::notification::notification_ready,
            commands::notification::notification_action,
            commands::notification::notification_dismiss,
            commands::worker::worker_info,
            commands::worker::worker_restart,
        ])
        .on_window_event(on_window_event)
        .setup(|app| setup(app).map_err(Into::into))
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app_handle, event| {
        if let RunEvent::Exit = event {
            shutdown(app_handle);
        }
    });
}

fn setup(app: &mut App) -> Result<(), DeployBotError> {
    // Get app data directory for logs
    let log_dir = app
        .path()
        .app_log_dir()
        .map_err(|e| DeployBotError::DeployBot {
            message: format!("Failed to get log directory: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    // Ensure log directory exists
    create_dir_all(&log_dir).map_err(|e| DeployBotError::DeployBot {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("DeployBot desktop application starting");
    info!("Log directory: {}", log_dir.display());

    let config_dir = app
        .path()
        .app_config_dir()
        .map_err(|e| DeployBotError::DeployBot {
            message: format!("Failed to get config directory: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
    let config = BridgeConfig::load(&config_dir).unwrap_or_else(|e| {
        warn!("Ignoring unusable bridge config, using defaults: {e}");
        BridgeConfig::default()
    });

    let resource_dir = app
        .path()
        .resource_dir()
        .map_err(|e| DeployBotError::DeployBot {
            message: format!("Failed to get resource directory: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
    let layout = LayoutConfig::load(&resource_dir)?;

    let labels = SurfaceLabels::default();
    let host = TauriSurfaceHost::new(app.handle().clone(), labels.clone());

    // Actors are spawned onto Tauri's tokio runtime
    let context =
        tauri::async_runtime::block_on(async move { BridgeContext::new(config, layout, host) })?;

    let emitter = app.handle().clone();
    forward_events(context.bus(), move |event| {
        if let Err(e) = emitter.emit_to(
            EventTarget::webview_window(MAIN_WINDOW_LABEL),
            BRIDGE_EVENT,
            event.clone(),
        ) {
            warn!("Failed to emit {} to the frontend: {e}", event.kind());
        }
    });

    app.manage(AppState::new(context.clone(), labels));

    tauri::async_runtime::spawn(async move {
        match context.startup().await {
            Ok(Some(worker)) => info!(
                "Worker on port {} (pid {:?}, owned={})",
                worker.port, worker.pid, worker.owned
            ),
            Ok(None) => info!("Connecting to an externally managed worker"),
            Err(e) => error!("Bridge start-up failed: {e}"),
        }
    });

    Ok(())
}

/// Report notification windows closed outside the notification service.
fn on_window_event(window: &Window, event: &WindowEvent) {
    if !matches!(event, WindowEvent::Destroyed) || !window.label().starts_with(SURFACE_LABEL_PREFIX) {
        return;
    }

    let Some(state) = window.try_state::<AppState>() else {
        return;
    };
    let Some(id) = state.labels().release(window.label()) else {
        return;
    };

    let notifications = state.context().notifications().clone();
    tauri::async_runtime::spawn(async move {
        if let Err(e) = notifications
            .surface_event(SurfaceEvent::Closed { id })
            .await
        {
            warn!("Could not report closed surface: {e}");
        }
    });
}

fn shutdown(app_handle: &AppHandle) {
    let Some(state) = app_handle.try_state::<AppState>() else {
        return;
    };

    info!("DeployBot exiting");
    if let Err(e) = tauri::async_runtime::block_on(state.context().shutdown()) {
        error!("Bridge shutdown failed: {e}");
    }
}
