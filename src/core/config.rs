//! Application configuration
//!
//! Loaded from RON or JSON depending on the file extension. Every field has a
//! default, so a config file only needs the values it changes.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::{EngineConfig, FramePolicy};
use crate::renderer::BloomSettings;
use crate::scene::PortalSettings;

/// Which scene to assemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SceneVariant {
    /// Portal plane alone
    Basic,
    /// Portal inside the textured room with simple lighting
    Room,
    /// Room with the full light rig, shadows and bloom
    #[default]
    Extended,
}

impl SceneVariant {
    /// Whether the room model and its texture are loaded
    pub fn has_room(self) -> bool {
        !matches!(self, Self::Basic)
    }

    /// Whether the bloom chain is active
    pub fn has_bloom(self) -> bool {
        matches!(self, Self::Extended)
    }

    /// Whether the final image goes through ACES filmic tone mapping
    ///
    /// Only the bare portal is shown untouched; both room scenes are tone
    /// mapped whether or not bloom runs.
    pub fn has_tone_mapping(self) -> bool {
        !matches!(self, Self::Basic)
    }
}

/// Camera placement; `None` in the config picks the variant's default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl CameraSettings {
    /// Default camera of each variant
    pub fn for_variant(variant: SceneVariant) -> Self {
        let position = match variant {
            SceneVariant::Basic => Vec3::new(0.25, -0.25, 1.0),
            SceneVariant::Room => Vec3::new(0.25, 0.5, 5.0),
            SceneVariant::Extended => Vec3::new(0.25, 0.5, 4.0),
        };
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            position,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    pub vsync: bool,
    pub variant: SceneVariant,
    pub frame_policy: FramePolicy,
    /// Directory the fixed asset paths are resolved against
    pub asset_root: PathBuf,
    pub camera: Option<CameraSettings>,
    pub portal: PortalSettings,
    pub bloom: BloomSettings,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            title: String::from("Portal"),
            width: 1280,
            height: 720,
            vsync: true,
            variant: SceneVariant::default(),
            frame_policy: FramePolicy::default(),
            asset_root: PathBuf::from("assets"),
            camera: None,
            portal: PortalSettings::default(),
            bloom: BloomSettings::default(),
        }
    }
}

impl PortalConfig {
    /// Load a config file; `.json` is read as JSON, anything else as RON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        if is_json(path) {
            Self::from_json(&content)
        } else {
            Self::from_ron(&content)
        }
    }

    /// Parse a RON document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid config
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Parse a JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid config
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Write the config, format chosen by extension like [`PortalConfig::load`]
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::SerializeError(e.to_string()))?
        } else {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::SerializeError(e.to_string()))?
        };
        fs::write(path, text).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Camera placement, falling back to the variant default
    pub fn camera_settings(&self) -> CameraSettings {
        self.camera
            .clone()
            .unwrap_or_else(|| CameraSettings::for_variant(self.variant))
    }

    /// Window and loop settings for the engine
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_title(self.title.clone())
            .with_size(self.width, self.height)
            .with_vsync(self.vsync)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Errors that can occur loading or saving configuration
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Document could not be parsed
    ParseError(String),
    /// Config could not be serialized
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::ParseError(e) => write!(f, "Parse error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_mapping_per_variant() {
        assert!(!SceneVariant::Basic.has_tone_mapping());
        assert!(SceneVariant::Room.has_tone_mapping());
        assert!(SceneVariant::Extended.has_tone_mapping());
        assert!(!SceneVariant::Room.has_bloom());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = PortalConfig::from_ron(
            "(variant: room, frame_policy: capped, portal: (noise_frequency: 12.5))",
        )
        .unwrap();

        assert_eq!(config.variant, SceneVariant::Room);
        assert_eq!(config.frame_policy, FramePolicy::Capped);
        assert_eq!(config.portal.noise_frequency, 12.5);
        assert_eq!(config.portal.wave_speed, 0.1);
        assert_eq!(config.width, 1280);
        assert_eq!(config.camera_settings().position, Vec3::new(0.25, 0.5, 5.0));
    }

    #[test]
    fn test_json_config() {
        let config = PortalConfig::from_json(
            r#"{
                "variant": "basic",
                "bloom": { "strength": 0.5 },
                "camera": {
                    "fov_degrees": 60.0,
                    "near": 0.5,
                    "far": 50.0,
                    "position": [0.0, 1.0, 3.0]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.variant, SceneVariant::Basic);
        assert_eq!(config.bloom.strength, 0.5);
        assert_eq!(config.bloom.threshold, BloomSettings::default().threshold);
        assert_eq!(config.camera_settings().fov_degrees, 60.0);
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(matches!(
            PortalConfig::from_ron("(variant: nowhere)"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_variant_capabilities() {
        assert!(!SceneVariant::Basic.has_room());
        assert!(SceneVariant::Room.has_room());
        assert!(!SceneVariant::Room.has_bloom());
        assert!(SceneVariant::Extended.has_bloom());
    }
}
