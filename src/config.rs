//! Application configuration, loaded from an optional JSON file.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::geometry::Shape;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Largest image file accepted by `load_image`, in MiB.
    #[serde(default = "default_editor_max_image_mb")]
    pub max_image_mb: u64,
    /// Rectangle placed by `add_rectangle`.
    #[serde(default)]
    pub default_rect: RectConfig,
    /// Fraction of the viewport an image may occupy when displayed.
    #[serde(default = "default_viewport_fraction")]
    pub viewport_fraction: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RectConfig {
    #[serde(default = "default_rect_offset")]
    pub left: f64,
    #[serde(default = "default_rect_offset")]
    pub top: f64,
    #[serde(default = "default_rect_size")]
    pub width: f64,
    #[serde(default = "default_rect_size")]
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Largest decoded image the store accepts, in MiB.
    #[serde(default = "default_store_max_image_mb")]
    pub max_image_mb: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

// Default value functions
fn default_editor_max_image_mb() -> u64 {
    5
}

fn default_store_max_image_mb() -> u64 {
    1
}

fn default_viewport_fraction() -> f64 {
    0.8
}

fn default_rect_offset() -> f64 {
    100.0
}

fn default_rect_size() -> f64 {
    100.0
}

fn default_max_connections() -> u32 {
    5
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_image_mb: default_editor_max_image_mb(),
            default_rect: RectConfig::default(),
            viewport_fraction: default_viewport_fraction(),
        }
    }
}

impl Default for RectConfig {
    fn default() -> Self {
        Self {
            left: default_rect_offset(),
            top: default_rect_offset(),
            width: default_rect_size(),
            height: default_rect_size(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_image_mb: default_store_max_image_mb(),
            max_connections: default_max_connections(),
        }
    }
}

impl From<RectConfig> for Shape {
    fn from(rect: RectConfig) -> Self {
        Shape::new(rect.left, rect.top, rect.width, rect.height)
    }
}

impl EditorConfig {
    pub fn max_image_bytes(&self) -> u64 {
        self.max_image_mb.saturating_mul(1024 * 1024)
    }
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
