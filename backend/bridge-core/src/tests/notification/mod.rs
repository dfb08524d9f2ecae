mod service;

use crate::error::surface::SurfaceError;
use crate::notification::{Geometry, Notification, SurfaceHost, WorkArea};

use common::ErrorLocation;

use std::collections::{HashMap, HashSet};
use std::panic::Location;
use std::sync::{Arc, Mutex};

use serde_json::json;

/// Host call as seen by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCall {
    Create(String, Geometry),
    Attach(String),
    Show(String),
    Opacity(String, f64),
    Bounds(String, Geometry),
    Close(String),
}

#[derive(Debug, Default)]
pub(crate) struct HostState {
    pub(crate) calls: Vec<HostCall>,
    pub(crate) alive: HashMap<String, Geometry>,
    pub(crate) failing_opacity: HashSet<String>,
    pub(crate) failing_bounds: HashSet<String>,
}

/// In-memory [`SurfaceHost`] that records every call. Clones share state so a
/// test can keep one while the stack or actor owns another.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingHost {
    pub(crate) state: Arc<Mutex<HostState>>,
}

pub(crate) const WORK_AREA: WorkArea = WorkArea {
    x: 0,
    y: 25,
    width: 1440,
    height: 875,
};

impl RecordingHost {
    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Simulate the window manager destroying a surface behind our back.
    pub(crate) fn destroy_externally(&self, id: &str) {
        self.state.lock().unwrap().alive.remove(id);
    }

    /// Make every later `set_opacity` on `id` fail.
    pub(crate) fn fail_opacity(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_opacity
            .insert(id.to_string());
    }

    /// Make every later `set_bounds` on `id` fail.
    pub(crate) fn fail_bounds(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_bounds
            .insert(id.to_string());
    }

    pub(crate) fn alive_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().unwrap().alive.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[track_caller]
    fn injected_failure(&self, id: &str, operation: &str) -> SurfaceError {
        SurfaceError::Host {
            id: id.to_string(),
            message: format!("injected {operation} failure"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    fn record(&self, call: HostCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    #[track_caller]
    fn require_alive(&self, id: &str) -> Result<(), SurfaceError> {
        if self.state.lock().unwrap().alive.contains_key(id) {
            Ok(())
        } else {
            Err(SurfaceError::NotFound {
                id: id.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }
}

impl SurfaceHost for RecordingHost {
    fn work_area(&self) -> WorkArea {
        WORK_AREA
    }

    fn create(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError> {
        self.state
            .lock()
            .unwrap()
            .alive
            .insert(id.to_string(), bounds);
        self.record(HostCall::Create(id.to_string(), bounds));
        Ok(())
    }

    fn attach_content(&mut self, id: &str, _notification: &Notification) -> Result<(), SurfaceError> {
        self.require_alive(id)?;
        self.record(HostCall::Attach(id.to_string()));
        Ok(())
    }

    fn show(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.require_alive(id)?;
        self.record(HostCall::Show(id.to_string()));
        Ok(())
    }

    fn set_opacity(&mut self, id: &str, opacity: f64) -> Result<(), SurfaceError> {
        self.require_alive(id)?;
        if self.state.lock().unwrap().failing_opacity.contains(id) {
            return Err(self.injected_failure(id, "opacity"));
        }
        self.record(HostCall::Opacity(id.to_string(), opacity));
        Ok(())
    }

    fn set_bounds(&mut self, id: &str, bounds: Geometry) -> Result<(), SurfaceError> {
        self.require_alive(id)?;
        if self.state.lock().unwrap().failing_bounds.contains(id) {
            return Err(self.injected_failure(id, "bounds"));
        }
        self.state
            .lock()
            .unwrap()
            .alive
            .insert(id.to_string(), bounds);
        self.record(HostCall::Bounds(id.to_string(), bounds));
        Ok(())
    }

    fn close(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.require_alive(id)?;
        self.state.lock().unwrap().alive.remove(id);
        self.record(HostCall::Close(id.to_string()));
        Ok(())
    }

    fn is_alive(&self, id: &str) -> bool {
        self.state.lock().unwrap().alive.contains_key(id)
    }
}

pub(crate) fn notification(id: &str, kind: &str) -> Notification {
    serde_json::from_value(json!({
        "id": id,
        "template": kind,
        "title": format!("Title {id}"),
        "message": "Body",
        "actions": ["Switch Now", "Dismiss"],
        "data": {"project_name": "site"}
    }))
    .expect("valid notification")
}
