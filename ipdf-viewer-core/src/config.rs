use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scheduler::DEFAULT_BASE_SCALE;
use crate::visibility::DEFAULT_VISIBILITY_THRESHOLD;
use crate::viewport::{Theme, ViewportRules, ZoomPolicy};

pub const DEFAULT_FILE_NAME: &str = "document.pdf";

/// Caller-supplied viewer settings. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Zoom at construction and after `reset`.
    pub initial_zoom: f32,
    /// Rotation in degrees at construction. `reset` always returns to 0.
    pub initial_rotation: i32,
    pub theme: Theme,
    /// Rasterization scale, applied once per page regardless of zoom.
    pub base_scale: f32,
    pub zoom: ZoomPolicy,
    /// Share of a page that must be on screen before it can become current.
    pub visibility_threshold: f32,
    /// Name for downloads; derived from the source when unset.
    pub file_name: Option<String>,
    pub allow_download: bool,
    pub allow_print: bool,
    pub allow_rotate: bool,
    pub allow_fullscreen: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_zoom: 1.0,
            initial_rotation: 0,
            theme: Theme::Light,
            base_scale: DEFAULT_BASE_SCALE,
            zoom: ZoomPolicy::default(),
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            file_name: None,
            allow_download: true,
            allow_print: true,
            allow_rotate: true,
            allow_fullscreen: true,
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Reject values the viewport and scheduler cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        if !(zoom.min.is_finite() && zoom.min > 0.0) {
            return Err(ConfigError::Invalid(format!("zoom.min must be a positive number, got {}", zoom.min)));
        }
        if !(zoom.max.is_finite() && zoom.max >= zoom.min) {
            return Err(ConfigError::Invalid(format!(
                "zoom.max must be a number no smaller than zoom.min ({}), got {}",
                zoom.min, zoom.max
            )));
        }
        if !(zoom.step.is_finite() && zoom.step > 1.0) {
            return Err(ConfigError::Invalid(format!("zoom.step must be greater than 1, got {}", zoom.step)));
        }
        if !self.initial_zoom.is_finite() {
            return Err(ConfigError::Invalid(format!("initial_zoom must be a number, got {}", self.initial_zoom)));
        }
        if !(self.base_scale.is_finite() && self.base_scale > 0.0) {
            return Err(ConfigError::Invalid(format!("base_scale must be positive, got {}", self.base_scale)));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(ConfigError::Invalid(format!(
                "visibility_threshold must be within [0, 1], got {}",
                self.visibility_threshold
            )));
        }
        Ok(())
    }

    pub fn viewport_rules(&self) -> ViewportRules {
        ViewportRules {
            zoom: self.zoom,
            initial_zoom: self.initial_zoom,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
