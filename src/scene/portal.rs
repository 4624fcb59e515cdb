//! Portal surface: plane geometry presets and the shader uniform set

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::core::SceneVariant;
use crate::renderer::Mesh;
use crate::ui::{ColorParseError, parse_hex_color};

/// Uniform block consumed by `portal.wgsl`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PortalUniforms {
    /// Seconds since the frame clock started
    pub time: f32,
    pub wave_speed: f32,
    pub wave_frequency: [f32; 2],
    pub wave_height: [f32; 2],
    pub noise_frequency: f32,
    _padding0: f32,
    pub base_color: [f32; 3],
    _padding1: f32,
    pub accent_color: [f32; 3],
    _padding2: f32,
}

impl PortalUniforms {
    /// Uniforms at time zero from configured defaults
    pub fn from_settings(settings: &PortalSettings, base: Vec3, accent: Vec3) -> Self {
        Self {
            time: 0.0,
            wave_speed: settings.wave_speed,
            wave_frequency: settings.wave_frequency.into(),
            wave_height: settings.wave_height.into(),
            noise_frequency: settings.noise_frequency,
            base_color: base.into(),
            accent_color: accent.into(),
            ..Self::zeroed()
        }
    }
}

/// Configurable starting values of the portal uniforms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    pub wave_speed: f32,
    pub wave_frequency: Vec2,
    pub wave_height: Vec2,
    pub noise_frequency: f32,
    pub base_color: String,
    pub accent_color: String,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            wave_speed: 0.1,
            wave_frequency: Vec2::new(5.0, 10.0),
            wave_height: Vec2::new(0.08, 0.04),
            noise_frequency: 10.0,
            base_color: String::from("#ff0000"),
            accent_color: String::from("#000000"),
        }
    }
}

/// Plane dimensions and subdivision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanePreset {
    pub width: f32,
    pub height: f32,
    pub segments_x: u32,
    pub segments_y: u32,
    /// Render both faces
    pub double_sided: bool,
}

impl PlanePreset {
    /// Geometry used by each scene variant
    pub fn for_variant(variant: SceneVariant) -> Self {
        match variant {
            SceneVariant::Basic => Self {
                width: 1.0,
                height: 1.0,
                segments_x: 128,
                segments_y: 128,
                double_sided: true,
            },
            SceneVariant::Room => Self {
                width: 1.0,
                height: 1.0,
                segments_x: 256,
                segments_y: 256,
                double_sided: false,
            },
            SceneVariant::Extended => Self {
                width: 1.0,
                height: 1.6,
                segments_x: 256,
                segments_y: 384,
                double_sided: false,
            },
        }
    }
}

impl PlanePreset {
    /// Subdivided plane geometry for this preset
    pub fn build_mesh(&self) -> Mesh {
        Mesh::plane(self.width, self.height, self.segments_x, self.segments_y)
    }
}

/// Graph component carrying the portal geometry, drawn with the portal shader
#[derive(Debug)]
pub struct PortalSurface {
    pub mesh: Mesh,
    pub double_sided: bool,
}

/// Color strings as edited in the panel; the shader only sees the parsed uniforms
#[derive(Debug, Clone, PartialEq)]
pub struct PortalColors {
    pub base: String,
    pub accent: String,
}

/// The portal plane: its graph node, geometry preset and uniform state
#[derive(Debug, Clone)]
pub struct Portal {
    pub entity: Entity,
    pub preset: PlanePreset,
    pub uniforms: PortalUniforms,
    pub colors: PortalColors,
}

impl Portal {
    /// Set the base color from a hex string
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the uniform untouched if `hex` does not parse
    pub fn set_base_color(&mut self, hex: &str) -> Result<(), ColorParseError> {
        let rgb = parse_hex_color(hex)?;
        self.colors.base = hex.to_string();
        self.uniforms.base_color = rgb.into();
        Ok(())
    }

    /// Set the accent color from a hex string
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the uniform untouched if `hex` does not parse
    pub fn set_accent_color(&mut self, hex: &str) -> Result<(), ColorParseError> {
        let rgb = parse_hex_color(hex)?;
        self.colors.accent = hex.to_string();
        self.uniforms.accent_color = rgb.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<PortalUniforms>(), 64);
        assert_eq!(std::mem::offset_of!(PortalUniforms, base_color), 32);
        assert_eq!(std::mem::offset_of!(PortalUniforms, accent_color), 48);
    }

    #[test]
    fn test_default_uniforms() {
        let settings = PortalSettings::default();
        let uniforms = PortalUniforms::from_settings(&settings, Vec3::X, Vec3::ZERO);
        assert_eq!(uniforms.time, 0.0);
        assert_eq!(uniforms.wave_frequency, [5.0, 10.0]);
        assert_eq!(uniforms.wave_height, [0.08, 0.04]);
        assert_eq!(uniforms.noise_frequency, 10.0);
    }
}
