//! Debug panel bindings
//!
//! The panel is a flat list of [`Tweak`] descriptors built once from the
//! scene. Each descriptor carries its own getter and setter over
//! [`PortalScene`], so the panel never needs to know what it edits.

use std::collections::BTreeMap;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::ColorParseError;
use crate::core::ConfigError;
use crate::renderer::{Light, PointLight, RectAreaLight};
use crate::scene::PortalScene;

pub type ScalarGet = Box<dyn Fn(&PortalScene) -> f32>;
pub type ScalarSet = Box<dyn Fn(&mut PortalScene, f32)>;
pub type ColorGet = Box<dyn Fn(&PortalScene) -> String>;
pub type ColorSet = Box<dyn Fn(&mut PortalScene, &str) -> Result<(), ColorParseError>>;

/// Label suffix, `(min, max, step)` and field accessor of a light tweak
type PointField = (&'static str, (f32, f32, f32), fn(&mut PointLight) -> &mut f32);
type RectField = (&'static str, (f32, f32, f32), fn(&mut RectAreaLight) -> &mut f32);

/// Panel folder names
pub mod folders {
    pub const PORTAL: &str = "Portal";
    pub const LIGHTS: &str = "Lights";
    pub const PORTAL_TRANSFORM: &str = "Portal Transform";
    pub const BLOOM: &str = "Bloom";
}

/// What a tweak edits and how
pub enum TweakKind {
    /// Number constrained to `[min, max]`, edited in `step` increments
    Scalar {
        min: f32,
        max: f32,
        step: f32,
        get: ScalarGet,
        set: ScalarSet,
    },
    /// Hex color string
    Color { get: ColorGet, set: ColorSet },
}

/// One tunable parameter
pub struct Tweak {
    pub folder: &'static str,
    pub label: String,
    pub kind: TweakKind,
}

impl Tweak {
    /// Build a scalar tweak
    pub fn scalar(
        folder: &'static str,
        label: impl Into<String>,
        (min, max, step): (f32, f32, f32),
        get: impl Fn(&PortalScene) -> f32 + 'static,
        set: impl Fn(&mut PortalScene, f32) + 'static,
    ) -> Self {
        Self {
            folder,
            label: label.into(),
            kind: TweakKind::Scalar {
                min,
                max,
                step,
                get: Box::new(get),
                set: Box::new(set),
            },
        }
    }

    /// Build a color tweak
    pub fn color(
        folder: &'static str,
        label: impl Into<String>,
        get: impl Fn(&PortalScene) -> String + 'static,
        set: impl Fn(&mut PortalScene, &str) -> Result<(), ColorParseError> + 'static,
    ) -> Self {
        Self {
            folder,
            label: label.into(),
            kind: TweakKind::Color {
                get: Box::new(get),
                set: Box::new(set),
            },
        }
    }

    /// `(min, max, step)` of a scalar tweak
    pub fn range(&self) -> Option<(f32, f32, f32)> {
        match self.kind {
            TweakKind::Scalar { min, max, step, .. } => Some((min, max, step)),
            TweakKind::Color { .. } => None,
        }
    }
}

impl std::fmt::Debug for Tweak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tweak")
            .field("folder", &self.folder)
            .field("label", &self.label)
            .field("range", &self.range())
            .finish()
    }
}

/// Errors from applying a panel edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TweakError {
    /// Index past the end of the list
    NoSuchTweak(usize),
    /// Scalar edit on a color tweak or the reverse
    WrongKind(String),
    /// Color string did not parse
    InvalidColor(ColorParseError),
}

impl std::fmt::Display for TweakError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSuchTweak(index) => write!(f, "No tweak at index {index}"),
            Self::WrongKind(label) => write!(f, "Tweak '{label}' has a different kind"),
            Self::InvalidColor(e) => write!(f, "Invalid color: {e}"),
        }
    }
}

impl std::error::Error for TweakError {}

/// Ordered list of tweaks for one scene
#[derive(Debug)]
pub struct TweakPanel {
    pub title: String,
    tweaks: Vec<Tweak>,
}

impl TweakPanel {
    /// Empty panel
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tweaks: Vec::new(),
        }
    }

    /// Register every tunable parameter of `scene`
    pub fn for_scene(scene: &PortalScene) -> Self {
        let mut panel = Self::new("Portal Noise");
        panel.add_portal_tweaks();
        for (index, light) in scene.lights.lights().iter().enumerate() {
            panel.add_light_tweaks(index, light);
        }
        if scene.variant == crate::core::SceneVariant::Extended {
            panel.add_transform_tweaks();
        }
        if scene.bloom.is_some() {
            panel.add_bloom_tweaks();
        }
        panel
    }

    /// Append a tweak; returns its index
    pub fn push(&mut self, tweak: Tweak) -> usize {
        debug_assert!(
            self.find(&tweak.label).is_none(),
            "duplicate tweak label {}",
            tweak.label
        );
        self.tweaks.push(tweak);
        self.tweaks.len() - 1
    }

    fn add_portal_tweaks(&mut self) {
        use folders::PORTAL;

        self.push(Tweak::color(
            PORTAL,
            "baseColor",
            |s| s.portal.colors.base.clone(),
            |s, hex| s.portal.set_base_color(hex),
        ));
        self.push(Tweak::color(
            PORTAL,
            "accentColor",
            |s| s.portal.colors.accent.clone(),
            |s, hex| s.portal.set_accent_color(hex),
        ));
        self.push(Tweak::scalar(
            PORTAL,
            "uWaveSpeed",
            (0.0, 2.0, 0.01),
            |s| s.portal.uniforms.wave_speed,
            |s, v| s.portal.uniforms.wave_speed = v,
        ));
        self.push(Tweak::scalar(
            PORTAL,
            "uWaveFrequencyX",
            (0.0, 20.0, 0.1),
            |s| s.portal.uniforms.wave_frequency[0],
            |s, v| s.portal.uniforms.wave_frequency[0] = v,
        ));
        self.push(Tweak::scalar(
            PORTAL,
            "uWaveFrequencyY",
            (0.0, 20.0, 0.1),
            |s| s.portal.uniforms.wave_frequency[1],
            |s, v| s.portal.uniforms.wave_frequency[1] = v,
        ));
        self.push(Tweak::scalar(
            PORTAL,
            "uWaveHeightX",
            (0.0, 0.5, 0.01),
            |s| s.portal.uniforms.wave_height[0],
            |s, v| s.portal.uniforms.wave_height[0] = v,
        ));
        self.push(Tweak::scalar(
            PORTAL,
            "uWaveHeightY",
            (0.0, 0.5, 0.01),
            |s| s.portal.uniforms.wave_height[1],
            |s, v| s.portal.uniforms.wave_height[1] = v,
        ));
        self.push(Tweak::scalar(
            PORTAL,
            "uNoiseFrequency",
            (0.0, 30.0, 0.1),
            |s| s.portal.uniforms.noise_frequency,
            |s, v| s.portal.uniforms.noise_frequency = v,
        ));
    }

    fn add_light_tweaks(&mut self, index: usize, light: &Light) {
        use folders::LIGHTS;

        match light {
            Light::Ambient(_) => {
                self.push(Tweak::scalar(
                    LIGHTS,
                    "ambient intensity",
                    (0.0, 1.0, 0.01),
                    move |s| match s.lights.get(index) {
                        Some(Light::Ambient(a)) => a.intensity,
                        _ => 0.0,
                    },
                    move |s, v| {
                        if let Some(Light::Ambient(a)) = s.lights.get_mut(index) {
                            a.intensity = v;
                        }
                    },
                ));
            }
            Light::Point(point) => {
                let fields: [PointField; 5] = [
                    ("intensity", (0.0, 10.0, 0.01), |p| &mut p.intensity),
                    ("distance", (0.0, 20.0, 0.1), |p| &mut p.distance),
                    ("x", (-5.0, 5.0, 0.01), |p| &mut p.position.x),
                    ("y", (-5.0, 5.0, 0.01), |p| &mut p.position.y),
                    ("z", (-5.0, 5.0, 0.01), |p| &mut p.position.z),
                ];
                for (field, range, access) in fields {
                    self.push(point_scalar(index, point.label, field, range, access));
                }
                if point.cast_shadow {
                    let range = (-0.01, 0.01, 0.0001);
                    self.push(point_scalar(index, point.label, "shadowBias", range, |p| {
                        &mut p.shadow_bias
                    }));
                }
            }
            Light::RectArea(rect) => {
                let fields: [RectField; 6] = [
                    ("intensity", (0.0, 10.0, 0.01), |r| &mut r.intensity),
                    ("width", (0.0, 5.0, 0.01), |r| &mut r.width),
                    ("height", (0.0, 5.0, 0.01), |r| &mut r.height),
                    ("x", (-5.0, 5.0, 0.01), |r| &mut r.position.x),
                    ("y", (-5.0, 5.0, 0.01), |r| &mut r.position.y),
                    ("z", (-5.0, 5.0, 0.01), |r| &mut r.position.z),
                ];
                for (field, range, access) in fields {
                    self.push(rect_scalar(index, rect.label, field, range, access));
                }
            }
        }
    }

    fn add_transform_tweaks(&mut self) {
        use folders::PORTAL_TRANSFORM;

        self.push(Tweak::scalar(
            PORTAL_TRANSFORM,
            "positionX",
            (-3.0, 3.0, 0.01),
            |s| s.portal_transform().position.x,
            |s, v| s.update_portal_transform(|t| t.position.x = v),
        ));
        self.push(Tweak::scalar(
            PORTAL_TRANSFORM,
            "positionY",
            (-3.0, 3.0, 0.01),
            |s| s.portal_transform().position.y,
            |s, v| s.update_portal_transform(|t| t.position.y = v),
        ));
        self.push(Tweak::scalar(
            PORTAL_TRANSFORM,
            "positionZ",
            (-3.0, 3.0, 0.01),
            |s| s.portal_transform().position.z,
            |s, v| s.update_portal_transform(|t| t.position.z = v),
        ));
        self.push(Tweak::scalar(
            PORTAL_TRANSFORM,
            "scale",
            (0.1, 3.0, 0.01),
            |s| s.portal_transform().scale.x,
            |s, v| s.update_portal_transform(|t| t.scale = Vec3::splat(v)),
        ));
    }

    fn add_bloom_tweaks(&mut self) {
        use folders::BLOOM;

        self.push(Tweak::scalar(
            BLOOM,
            "strength",
            (0.0, 3.0, 0.01),
            |s| s.bloom.as_ref().map_or(0.0, |b| b.strength),
            |s, v| {
                if let Some(bloom) = s.bloom.as_mut() {
                    bloom.strength = v;
                }
            },
        ));
        self.push(Tweak::scalar(
            BLOOM,
            "radius",
            (0.0, 1.0, 0.01),
            |s| s.bloom.as_ref().map_or(0.0, |b| b.radius),
            |s, v| {
                if let Some(bloom) = s.bloom.as_mut() {
                    bloom.radius = v;
                }
            },
        ));
        self.push(Tweak::scalar(
            BLOOM,
            "threshold",
            (0.0, 1.0, 0.01),
            |s| s.bloom.as_ref().map_or(0.0, |b| b.threshold),
            |s, v| {
                if let Some(bloom) = s.bloom.as_mut() {
                    bloom.threshold = v;
                }
            },
        ));
    }

    pub fn tweaks(&self) -> &[Tweak] {
        &self.tweaks
    }

    pub fn len(&self) -> usize {
        self.tweaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweaks.is_empty()
    }

    /// Index of the tweak with `label`
    pub fn find(&self, label: &str) -> Option<usize> {
        self.tweaks.iter().position(|t| t.label == label)
    }

    /// Folder names in registration order
    pub fn folders(&self) -> Vec<&'static str> {
        let mut seen: Vec<&'static str> = Vec::new();
        for tweak in &self.tweaks {
            if !seen.contains(&tweak.folder) {
                seen.push(tweak.folder);
            }
        }
        seen
    }

    /// Current value of a scalar tweak
    pub fn get_scalar(&self, index: usize, scene: &PortalScene) -> Option<f32> {
        match &self.tweaks.get(index)?.kind {
            TweakKind::Scalar { get, .. } => Some(get(scene)),
            TweakKind::Color { .. } => None,
        }
    }

    /// Write a scalar, clamped into its range; returns the value applied
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range or not a scalar
    pub fn set_scalar(
        &self,
        index: usize,
        value: f32,
        scene: &mut PortalScene,
    ) -> Result<f32, TweakError> {
        let tweak = self.tweaks.get(index).ok_or(TweakError::NoSuchTweak(index))?;
        match &tweak.kind {
            TweakKind::Scalar { min, max, set, .. } => {
                let value = if value.is_nan() { *min } else { value.clamp(*min, *max) };
                set(scene, value);
                Ok(value)
            }
            TweakKind::Color { .. } => Err(TweakError::WrongKind(tweak.label.clone())),
        }
    }

    /// Current value of a color tweak
    pub fn get_color(&self, index: usize, scene: &PortalScene) -> Option<String> {
        match &self.tweaks.get(index)?.kind {
            TweakKind::Color { get, .. } => Some(get(scene)),
            TweakKind::Scalar { .. } => None,
        }
    }

    /// Write a color from a hex string
    ///
    /// An invalid string is logged and leaves the scene untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of range, not a color, or `hex`
    /// does not parse
    pub fn set_color(
        &self,
        index: usize,
        hex: &str,
        scene: &mut PortalScene,
    ) -> Result<(), TweakError> {
        let tweak = self.tweaks.get(index).ok_or(TweakError::NoSuchTweak(index))?;
        match &tweak.kind {
            TweakKind::Color { set, .. } => set(scene, hex).map_err(|e| {
                log::warn!("Ignoring color '{hex}' for {}: {e}", tweak.label);
                TweakError::InvalidColor(e)
            }),
            TweakKind::Scalar { .. } => Err(TweakError::WrongKind(tweak.label.clone())),
        }
    }

    /// Snapshot every tweak's current value
    pub fn export_preset(&self, scene: &PortalScene) -> Preset {
        let values = self
            .tweaks
            .iter()
            .map(|tweak| {
                let value = match &tweak.kind {
                    TweakKind::Scalar { get, .. } => PresetValue::Scalar(get(scene)),
                    TweakKind::Color { get, .. } => PresetValue::Color(get(scene)),
                };
                (tweak.label.clone(), value)
            })
            .collect();
        Preset { values }
    }

    /// Apply a preset through the setters; returns how many values applied
    ///
    /// Unknown labels and mismatched values are logged and skipped.
    pub fn import_preset(&self, preset: &Preset, scene: &mut PortalScene) -> usize {
        let mut applied = 0;
        for (label, value) in &preset.values {
            let Some(index) = self.find(label) else {
                log::warn!("Preset has unknown tweak '{label}'");
                continue;
            };
            let result = match value {
                PresetValue::Scalar(v) => self.set_scalar(index, *v, scene).map(|_| ()),
                PresetValue::Color(hex) => self.set_color(index, hex, scene),
            };
            match result {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("Skipping preset value '{label}': {e}"),
            }
        }
        applied
    }
}

fn point_scalar(
    index: usize,
    light: &str,
    field: &str,
    range: (f32, f32, f32),
    access: fn(&mut PointLight) -> &mut f32,
) -> Tweak {
    Tweak::scalar(
        folders::LIGHTS,
        format!("{light} {field}"),
        range,
        move |s| {
            let mut light = match s.lights.get(index) {
                Some(Light::Point(p)) => p.clone(),
                _ => return 0.0,
            };
            *access(&mut light)
        },
        move |s, v| {
            if let Some(Light::Point(p)) = s.lights.get_mut(index) {
                *access(p) = v;
            }
        },
    )
}

fn rect_scalar(
    index: usize,
    light: &str,
    field: &str,
    range: (f32, f32, f32),
    access: fn(&mut RectAreaLight) -> &mut f32,
) -> Tweak {
    Tweak::scalar(
        folders::LIGHTS,
        format!("{light} {field}"),
        range,
        move |s| {
            let mut light = match s.lights.get(index) {
                Some(Light::RectArea(r)) => r.clone(),
                _ => return 0.0,
            };
            *access(&mut light)
        },
        move |s, v| {
            if let Some(Light::RectArea(r)) = s.lights.get_mut(index) {
                *access(r) = v;
            }
        },
    )
}

/// Saved tweak values keyed by label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub values: BTreeMap<String, PresetValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetValue {
    Scalar(f32),
    Color(String),
}

impl Preset {
    /// Load a preset; `.json` is read as JSON, anything else as RON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        if is_json(path) {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
        } else {
            ron::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
        }
    }

    /// Save the preset, format chosen by extension
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
        std::fs::write(path, text).map_err(|e| ConfigError::IoError(e.to_string()))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PortalConfig, SceneVariant};
    use crate::scene::Viewport;

    fn scene(variant: SceneVariant) -> PortalScene {
        let config = PortalConfig {
            variant,
            ..PortalConfig::default()
        };
        PortalScene::new(&config, Viewport::new(800, 600, 1.0))
    }

    #[test]
    fn test_basic_panel_has_portal_folder_only() {
        let scene = scene(SceneVariant::Basic);
        let panel = TweakPanel::for_scene(&scene);
        assert_eq!(panel.folders(), vec![folders::PORTAL]);
        assert_eq!(panel.len(), 8);
        assert_eq!(panel.title, "Portal Noise");
    }

    #[test]
    fn test_extended_panel_folders_in_order() {
        let scene = scene(SceneVariant::Extended);
        let panel = TweakPanel::for_scene(&scene);
        assert_eq!(
            panel.folders(),
            vec![
                folders::PORTAL,
                folders::LIGHTS,
                folders::PORTAL_TRANSFORM,
                folders::BLOOM
            ]
        );
    }

    #[test]
    fn test_labels_are_distinct() {
        let scene = scene(SceneVariant::Extended);
        let panel = TweakPanel::for_scene(&scene);
        let mut labels: Vec<&str> = panel.tweaks().iter().map(|t| t.label.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), panel.len());
    }

    #[test]
    fn test_set_scalar_clamps() {
        let mut scene = scene(SceneVariant::Basic);
        let panel = TweakPanel::for_scene(&scene);
        let speed = panel.find("uWaveSpeed").unwrap();

        assert_eq!(panel.set_scalar(speed, 5.0, &mut scene), Ok(2.0));
        assert_eq!(scene.portal.uniforms.wave_speed, 2.0);
        assert_eq!(panel.set_scalar(speed, -1.0, &mut scene), Ok(0.0));
        assert_eq!(scene.portal.uniforms.wave_speed, 0.0);
    }

    #[test]
    fn test_set_at_bounds_is_idempotent() {
        let mut scene = scene(SceneVariant::Basic);
        let panel = TweakPanel::for_scene(&scene);
        let noise = panel.find("uNoiseFrequency").unwrap();

        panel.set_scalar(noise, 30.0, &mut scene).unwrap();
        let once = scene.portal.uniforms;
        panel.set_scalar(noise, 30.0, &mut scene).unwrap();
        assert_eq!(scene.portal.uniforms, once);

        panel.set_scalar(noise, 0.0, &mut scene).unwrap();
        panel.set_scalar(noise, 0.0, &mut scene).unwrap();
        assert_eq!(panel.get_scalar(noise, &scene), Some(0.0));
    }

    #[test]
    fn test_color_reaches_uniform() {
        let mut scene = scene(SceneVariant::Basic);
        let panel = TweakPanel::for_scene(&scene);
        let base = panel.find("baseColor").unwrap();

        panel.set_color(base, "#00ff00", &mut scene).unwrap();
        assert_eq!(scene.portal.uniforms.base_color, [0.0, 1.0, 0.0]);
        panel.set_color(base, "#ff0000", &mut scene).unwrap();
        assert_eq!(scene.portal.uniforms.base_color, [1.0, 0.0, 0.0]);
        assert_eq!(panel.get_color(base, &scene).as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_invalid_color_leaves_uniform() {
        let mut scene = scene(SceneVariant::Basic);
        let panel = TweakPanel::for_scene(&scene);
        let accent = panel.find("accentColor").unwrap();
        let before = scene.portal.uniforms;

        let result = panel.set_color(accent, "purple", &mut scene);

        assert!(matches!(result, Err(TweakError::InvalidColor(_))));
        assert_eq!(scene.portal.uniforms, before);
        assert_eq!(scene.portal.colors.accent, "#000000");
    }

    #[test]
    fn test_wrong_kind_and_index() {
        let mut scene = scene(SceneVariant::Basic);
        let panel = TweakPanel::for_scene(&scene);
        let base = panel.find("baseColor").unwrap();

        assert!(matches!(
            panel.set_scalar(base, 1.0, &mut scene),
            Err(TweakError::WrongKind(_))
        ));
        assert_eq!(
            panel.set_scalar(99, 1.0, &mut scene),
            Err(TweakError::NoSuchTweak(99))
        );
    }

    #[test]
    fn test_light_tweak_edits_rig() {
        let mut scene = scene(SceneVariant::Extended);
        let panel = TweakPanel::for_scene(&scene);
        let index = panel.find("redLight intensity").unwrap();

        panel.set_scalar(index, 4.5, &mut scene).unwrap();

        assert_eq!(scene.lights.shadow_caster().map(|p| p.intensity), Some(4.5));
        assert_eq!(panel.get_scalar(index, &scene), Some(4.5));
    }

    #[test]
    fn test_transform_and_bloom_tweaks() {
        let mut scene = scene(SceneVariant::Extended);
        let panel = TweakPanel::for_scene(&scene);

        panel
            .set_scalar(panel.find("positionY").unwrap(), 0.75, &mut scene)
            .unwrap();
        panel
            .set_scalar(panel.find("strength").unwrap(), 9.0, &mut scene)
            .unwrap();

        assert_eq!(scene.portal_transform().position.y, 0.75);
        assert_eq!(scene.bloom.as_ref().map(|b| b.strength), Some(3.0));
    }

    #[test]
    fn test_preset_round_trip_through_scene() {
        let mut scene = scene(SceneVariant::Extended);
        let panel = TweakPanel::for_scene(&scene);
        panel
            .set_scalar(panel.find("uWaveSpeed").unwrap(), 1.25, &mut scene)
            .unwrap();
        panel
            .set_color(panel.find("accentColor").unwrap(), "#123456", &mut scene)
            .unwrap();
        let preset = panel.export_preset(&scene);

        let mut fresh = self::scene(SceneVariant::Extended);
        let applied = panel.import_preset(&preset, &mut fresh);

        assert_eq!(applied, panel.len());
        assert_eq!(fresh.portal.uniforms.wave_speed, 1.25);
        assert_eq!(fresh.portal.colors.accent, "#123456");
    }

    #[test]
    fn test_preset_text_formats() {
        let mut values = BTreeMap::new();
        values.insert(String::from("uWaveSpeed"), PresetValue::Scalar(0.5));
        values.insert(String::from("baseColor"), PresetValue::Color(String::from("#00ff00")));
        values.insert(String::from("unknown"), PresetValue::Scalar(1.0));
        let preset = Preset { values };

        let json = serde_json::to_string(&preset).unwrap();
        assert_eq!(serde_json::from_str::<Preset>(&json).unwrap(), preset);

        let mut scene = scene(SceneVariant::Basic);
        let panel = TweakPanel::for_scene(&scene);
        assert_eq!(panel.import_preset(&preset, &mut scene), 2);
        assert_eq!(scene.portal.uniforms.base_color, [0.0, 1.0, 0.0]);
    }
}
