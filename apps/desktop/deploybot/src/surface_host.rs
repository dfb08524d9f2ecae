//! Notification surfaces as borderless Tauri webview windows.
//!
//! Each surface is a hidden, undecorated, always-on-top window loading
//! `notification.html`. The page calls `notification_ready` once its listeners
//! are installed; content and opacity are then pushed to it as window-targeted
//! events.

use bridge_core::error::surface::SurfaceError;
use bridge_core::notification::{Geometry, Notification, SurfaceContent, SurfaceHost, WorkArea};

use common::ErrorLocation;

use std::collections::HashMap;
use std::fmt::Display;
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use tauri::{
    AppHandle, Emitter, EventTarget, LogicalPosition, LogicalSize, Manager, WebviewUrl,
    WebviewWindow, WebviewWindowBuilder,
};

pub const SURFACE_LABEL_PREFIX: &str = "notification-";
pub const CONTENT_EVENT: &str = "notification-content";
pub const OPACITY_EVENT: &str = "notification-opacity";

const SURFACE_PAGE: &str = "notification.html";
const SURFACE_TITLE: &str = "DeployBot";

/// Used when the platform reports no primary monitor.
const FALLBACK_WORK_AREA: WorkArea = WorkArea {
    x: 0,
    y: 0,
    width: 1920,
    height: 1080,
};

/// Window label for the `sequence`-th surface window, showing notification `id`.
///
/// Tauri labels allow `a-zA-Z0-9-/:_`; anything else in `id` becomes `_`. The
/// sequence number keeps labels unique across ids that sanitize alike and
/// across re-shows of the same id.
pub fn label_for(id: &str, sequence: u64) -> String {
    let sanitized: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{SURFACE_LABEL_PREFIX}{sanitized}-{sequence}")
}

#[derive(Default)]
struct LabelRegistry {
    by_label: HashMap<String, String>,
    by_id: HashMap<String, String>,
    sequence: u64,
}

/// Which window currently shows which notification.
///
/// Shared between the host (which registers) and the window event handler
/// (which releases on destruction). Registering an id again supersedes its
/// previous window, so a late `Destroyed` for that window releases nothing.
#[derive(Clone, Default)]
pub struct SurfaceLabels {
    registry: Arc<Mutex<LabelRegistry>>,
}

impl SurfaceLabels {
    pub fn register(&self, id: &str) -> String {
        let mut registry = self.lock();
        registry.sequence += 1;
        let label = label_for(id, registry.sequence);

        if let Some(previous) = registry.by_id.insert(id.to_string(), label.clone()) {
            registry.by_label.remove(&previous);
        }
        registry.by_label.insert(label.clone(), id.to_string());
        label
    }

    /// Label of the window currently showing `id`.
    pub fn label_of(&self, id: &str) -> Option<String> {
        self.lock().by_id.get(id).cloned()
    }

    pub fn notification_id(&self, label: &str) -> Option<String> {
        self.lock().by_label.get(label).cloned()
    }

    /// Forget a destroyed window, returning the notification it showed.
    ///
    /// `None` if the window was unknown or already superseded.
    pub fn release(&self, label: &str) -> Option<String> {
        let mut registry = self.lock();
        let id = registry.by_label.remove(label)?;
        if registry.by_id.get(&id).is_some_and(|current| current == label) {
            registry.by_id.remove(&id);
        }
        Some(id)
    }

    fn lock(&self) -> MutexGuard<'_, LabelRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`SurfaceHost`] backed by Tauri webview windows.
pub struct TauriSurfaceHost {
    app: AppHandle,
    labels: SurfaceLabels,
}

impl TauriSurfaceHost {
    pub fn new(app: AppHandle, labels: SurfaceLabels) -> Self {
        Self { app, labels }
    }

    fn find_window(&self, id: &str) -> Option<WebviewWindow> {
        let label = self.labels.label_of(id)?;
        self.app.get_webview_window(&label)
    }

    #[track_caller]
    fn window(&self, id: &str) -> Result<WebviewWindow, SurfaceError> {
        self.find_window(id).ok_or_else(|| SurfaceError::NotFound {
            id: id.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn emit<P>(&self, id: &str, event: &str, payload: P) -> Result<(), SurfaceError>
    where
        P: serde::Serialize + Clone,
    {
        let window = self.window(id)?;
        self.app
            .emit_to(EventTarget::webview_window(window.label()), event, payload)
            .map_err(|e| host_error(id, e))
    }
}

impl SurfaceHost for TauriSurfaceHost {
    fn work_area(&self) -> WorkArea {
        let monitor = match self.app.primary_monitor() {
            Ok(Some(monitor)) => monitor,
            Ok(None) => {
                warn!("No primary monitor reported, using {FALLBACK_WORK_AREA:?}");
                return FALLBACK_WORK_AREA;
            }
            Err(e) => {
                warn!("Could not query primary monitor: {e}");
                return FALLBACK_WORK_AREA;
            }
        };

        let scale = monitor.scale_factor();
        let area = monitor.work_area();
        let position = area.position.to_logical::<f64>(scale);
        let size = area.size.to_logical::<f64>(scale);

        WorkArea {
            x: position.x.round() as i32,
            y: position.y.round() as i32,
            width: size.width.round() as u32,
            height: size.height.round() as u32,
        }
    }

    fn create(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError> {
        let label = self.labels.register(id);

        let built = WebviewWindowBuilder::new(&self.app, &label, WebviewUrl::App(SURFACE_PAGE.into()))
            .title(SURFACE_TITLE)
            .inner_size(f64::from(bounds.width), f64::from(bounds.height))
            .position(f64::from(bounds.x), f64::from(bounds.y))
            .decorations(false)
            .always_on_top(true)
            .skip_taskbar(true)
            .resizable(false)
            .focused(false)
            .visible(false)
            .build();

        match built {
            Ok(_) => {
                debug!("Created surface window {label}");
                Ok(())
            }
            Err(e) => {
                self.labels.release(&label);
                Err(host_error(id, e))
            }
        }
    }

    fn attach_content(&mut self, id: &str, notification: &Notification) -> Result<(), SurfaceError> {
        self.emit(id, CONTENT_EVENT, SurfaceContent::from(notification))
    }

    fn show(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.window(id)?.show().map_err(|e| host_error(id, e))
    }

    fn set_opacity(&mut self, id: &str, opacity: f64) -> Result<(), SurfaceError> {
        self.emit(id, OPACITY_EVENT, opacity)
    }

    fn set_bounds(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError> {
        let window = self.window(id)?;
        window
            .set_position(LogicalPosition::new(f64::from(bounds.x), f64::from(bounds.y)))
            .map_err(|e| host_error(id, e))?;
        window
            .set_size(LogicalSize::new(f64::from(bounds.width), f64::from(bounds.height)))
            .map_err(|e| host_error(id, e))
    }

    fn close(&mut self, id: &str) -> Result<(), SurfaceError> {
        match self.find_window(id) {
            Some(window) => window.destroy().map_err(|e| host_error(id, e)),
            None => Ok(()),
        }
    }

    fn is_alive(&self, id: &str) -> bool {
        self.find_window(id).is_some()
    }
}

#[track_caller]
fn host_error(id: &str, error: impl Display) -> SurfaceError {
    SurfaceError::Host {
        id: id.to_string(),
        message: error.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
