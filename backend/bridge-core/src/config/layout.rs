use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const LAYOUT_FILE_NAME: &str = "notification_layout.toml";

// ============================================
// LAYOUT CONFIG
// ============================================

/// Geometry and animation constants for notification surfaces.
///
/// Heights are looked up by notification kind once, when the surface is
/// created, and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_spacing")]
    pub spacing: u32,
    #[serde(default = "default_margin_top")]
    pub margin_top: u32,
    #[serde(default = "default_margin_right")]
    pub margin_right: u32,
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,
    #[serde(default = "default_fade_step_ms")]
    pub fade_step_ms: u64,
    #[serde(default = "default_height")]
    pub default_height: u32,
    #[serde(default = "default_heights")]
    pub heights: HashMap<String, u32>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_visible: default_max_visible(),
            width: default_width(),
            spacing: default_spacing(),
            margin_top: default_margin_top(),
            margin_right: default_margin_right(),
            fade_steps: default_fade_steps(),
            fade_step_ms: default_fade_step_ms(),
            default_height: default_height(),
            heights: default_heights(),
        }
    }
}

fn default_max_visible() -> usize {
    3
}
fn default_width() -> u32 {
    380
}
fn default_spacing() -> u32 {
    10
}
fn default_margin_top() -> u32 {
    20
}
fn default_margin_right() -> u32 {
    20
}
fn default_fade_steps() -> u32 {
    10
}
fn default_fade_step_ms() -> u64 {
    30
}
fn default_height() -> u32 {
    120
}
fn default_heights() -> HashMap<String, u32> {
    HashMap::from([
        ("task_suggestion".to_string(), 180),
        ("unified_suggestion".to_string(), 240),
    ])
}

// ============================================
// IMPLEMENTATION
// ============================================

impl LayoutConfig {
    /// Read `notification_layout.toml` from `config/` under the resource dir, or
    /// from the resource dir itself.
    ///
    /// A missing or unreadable file is logged and the built-in layout returned.
    pub fn load(resource_dir: &Path) -> Result<Self, ConfigError> {
        let paths = [
            resource_dir.join("config").join(LAYOUT_FILE_NAME),
            resource_dir.join(LAYOUT_FILE_NAME),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load_from_path(path) {
                    Ok(config) => {
                        info!("Notification layout loaded from {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!("Failed to load layout from {}: {}", path.display(), e);
                    }
                }
            }
        }

        warn!("No {LAYOUT_FILE_NAME} found in resource dir, using defaults");
        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: LayoutConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.max_visible == 0 {
            Some("max_visible must be at least 1".to_string())
        } else if self.fade_steps == 0 {
            Some("fade_steps must be at least 1".to_string())
        } else if self.fade_step_ms == 0 {
            Some("fade_step_ms must be at least 1".to_string())
        } else if self.width == 0 || self.default_height == 0 {
            Some("width and default_height must be greater than 0".to_string())
        } else {
            self.heights
                .iter()
                .find(|(_, height)| **height == 0)
                .map(|(kind, _)| format!("height for kind '{kind}' must be greater than 0"))
        };

        match reason {
            Some(reason) => Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Surface height for a notification kind.
    pub fn height_for(&self, kind: &str) -> u32 {
        self.heights
            .get(kind)
            .copied()
            .unwrap_or(self.default_height)
    }

    /// Duration of one opacity step; also the shared animation tick.
    pub fn fade_step(&self) -> Duration {
        Duration::from_millis(self.fade_step_ms)
    }
}
