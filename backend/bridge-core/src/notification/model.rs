use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_KIND: &str = "general";
const DISMISS_ACTION: &str = "dismiss";

/// Content of one notification as the worker sends it in
/// `{type: "notification", event: "show_custom", data: {notification: {...}}}`.
///
/// The worker calls the kind `template`; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(alias = "template", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// Button labels, e.g. `"Snooze 5min"`.
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub data: Value,
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

fn default_actions() -> Vec<String> {
    vec!["Dismiss".to_string()]
}

impl Notification {
    /// Button labels paired with the action id the worker expects back.
    pub fn action_buttons(&self) -> Vec<ActionButton> {
        self.actions
            .iter()
            .map(|label| ActionButton {
                id: action_id(label),
                label: label.clone(),
            })
            .collect()
    }
}

/// `"Snooze 5min"` → `"snooze_5min"`.
pub fn action_id(label: &str) -> String {
    let id = label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");

    if id.is_empty() {
        DISMISS_ACTION.to_string()
    } else {
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub id: String,
    pub label: String,
}

/// What a surface page renders: the notification plus resolved buttons.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceContent {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub buttons: Vec<ActionButton>,
    pub category: Option<String>,
    pub data: Value,
}

impl From<&Notification> for SurfaceContent {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id.clone(),
            kind: notification.kind.clone(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            buttons: notification.action_buttons(),
            category: notification.category.clone(),
            data: notification.data.clone(),
        }
    }
}

/// Screen rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Usable part of the primary display (excludes menu bar/taskbar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WorkArea {
    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurfacePhase {
    /// Created hidden; waiting for the host to report it can take content.
    PendingContent,
    /// Shown; fading in until fully opaque.
    Visible,
    FadingOut,
}

/// Read-only view of one live surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSnapshot {
    pub id: String,
    pub kind: String,
    pub phase: SurfacePhase,
    pub opacity: f64,
    pub geometry: Geometry,
}

/// Something that happened on a surface, reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The surface page has loaded and can accept content.
    ContentReady { id: String },
    /// User clicked a button or dismissed with the keyboard.
    Action {
        id: String,
        action: String,
        data: Option<Value>,
    },
    /// The environment destroyed the surface (e.g. force-closed by the window manager).
    Closed { id: String },
}
