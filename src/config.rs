// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline configuration

use crate::constants::{DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH, DESIRED_PREVIEW_FPS};
use crate::errors::{PreviewError, PreviewResult};
use crate::filters::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings applied when a preview session is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Frame rate requested from the capture device
    pub desired_fps: u32,
    /// Effect filter installed at surface creation
    pub default_filter: FilterType,
    /// View size the demo binary reports before a real surface change
    pub view_width: u32,
    /// See `view_width`
    pub view_height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            desired_fps: DESIRED_PREVIEW_FPS,
            default_filter: FilterType::Saturation,
            view_width: DEFAULT_VIEW_WIDTH,
            view_height: DEFAULT_VIEW_HEIGHT,
        }
    }
}

impl PreviewConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> PreviewResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PreviewError::Config(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| PreviewError::Config(format!("parse {}: {}", path.display(), e)))
    }
}
