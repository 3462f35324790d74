// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration.
//!
//! Stored as RON. Every section falls back to its defaults, so a config
//! file only needs the fields it changes.

use crate::camera::CameraSettings;
use crate::gizmo::{AxisConstraint, GizmoCaps, GizmoMode};
use crate::input::Key;
use crate::picking::PickMask;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "leveledit.ron";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File read/write error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Deserialization error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer editor
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },
}

/// Scratch file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingSettings {
    /// Directory holding history entries and the clipboard. Defaults to
    /// `<temp>/leveledit/<process id>`.
    pub temp_dir: PathBuf,
    /// Clipboard file name inside `temp_dir`
    pub clipboard_file: String,
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir()
                .join("leveledit")
                .join(std::process::id().to_string()),
            clipboard_file: "clipboard".to_string(),
        }
    }
}

impl StagingSettings {
    /// Full clipboard path
    pub fn clipboard_path(&self) -> PathBuf {
        self.temp_dir.join(&self.clipboard_file)
    }
}

/// Picking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingSettings {
    /// Entity types the pointer can pick
    pub mask: PickMask,
    /// Button that selects
    pub select_button: Key,
    /// Modifier that toggles entities in and out of the selection
    pub multi_select_modifier: Key,
}

impl Default for PickingSettings {
    fn default() -> Self {
        Self {
            mask: PickMask::ALL,
            select_button: Key::MouseRight,
            multi_select_modifier: Key::Shift,
        }
    }
}

/// Gizmo settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GizmoSettings {
    /// Master switch
    pub enabled: bool,
    /// Accept translation
    pub translate: bool,
    /// Accept rotation
    pub rotate: bool,
    /// Accept scaling
    pub scale: bool,
    /// Manipulation driven by a drag
    pub mode: GizmoMode,
    /// Axis constraint
    pub constraint: AxisConstraint,
    /// World units per pointer pixel
    pub translate_speed: f32,
    /// Radians per pointer pixel
    pub rotate_speed: f32,
    /// Scale factor change per pointer pixel
    pub scale_speed: f32,
}

impl Default for GizmoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            translate: true,
            rotate: true,
            scale: true,
            mode: GizmoMode::Translate,
            constraint: AxisConstraint::None,
            translate_speed: 0.01,
            rotate_speed: 0.01,
            scale_speed: 0.01,
        }
    }
}

impl GizmoSettings {
    /// Capability flags
    pub fn caps(&self) -> GizmoCaps {
        GizmoCaps {
            translate: self.translate,
            rotate: self.rotate,
            scale: self.scale,
        }
    }
}

/// Viewport size used for picking rays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Format version
    pub version: u32,
    /// Scratch files
    pub staging: StagingSettings,
    /// Camera
    pub camera: CameraSettings,
    /// Picking
    pub picking: PickingSettings,
    /// Gizmo
    pub gizmo: GizmoSettings,
    /// Viewport
    pub viewport: ViewportSettings,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            staging: StagingSettings::default(),
            camera: CameraSettings::default(),
            picking: PickingSettings::default(),
            gizmo: GizmoSettings::default(),
            viewport: ViewportSettings::default(),
        }
    }
}

impl EditorConfig {
    /// Default config staging in `temp_dir`
    pub fn with_temp_dir(temp_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.staging.temp_dir = temp_dir.into();
        config
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EditorConfig = ron::from_str(&content)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it is missing
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save to a config file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
