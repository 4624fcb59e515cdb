//! Surface materials for the room meshes

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Key under which a loaded texture is registered with the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey(pub &'static str);

impl TextureKey {
    /// Floor color map
    pub const MARBLE: Self = Self("marble");
}

/// Material properties for rendering
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    /// Base color (RGB)
    pub color: [f32; 3],
    pub roughness: f32,
    /// Emitted color, added after lighting
    pub emissive: [f32; 3],
    pub metalness: f32,
    /// Whether to sample the color map (1.0) or not (0.0)
    pub use_texture: f32,
    /// Whether shadows darken this surface
    pub receive_shadow: f32,
    _padding: [f32; 2],
}

/// Standard (roughness/metalness) material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base color
    pub color: Vec3,
    /// Microfacet roughness (0 = mirror, 1 = fully diffuse)
    pub roughness: f32,
    pub metalness: f32,
    /// Self-illumination
    pub emissive: Vec3,
    /// Optional color map
    pub map: Option<TextureKey>,
}

impl Material {
    /// Create a new material with a color
    pub fn new(color: Vec3) -> Self {
        Self {
            color,
            roughness: 1.0,
            metalness: 0.0,
            emissive: Vec3::ZERO,
            map: None,
        }
    }

    /// Opaque white, used for walls and roof
    pub fn white() -> Self {
        Self::new(Vec3::ONE)
    }

    /// Opaque black, used for the portal frame
    pub fn black() -> Self {
        Self::new(Vec3::ZERO)
    }

    /// Color-mapped material with the given roughness
    pub fn textured(map: TextureKey, roughness: f32) -> Self {
        Self {
            roughness,
            map: Some(map),
            ..Self::white()
        }
    }

    /// Fully self-lit material, used for the light fixtures
    pub fn emissive(color: Vec3) -> Self {
        Self {
            emissive: color,
            ..Self::white()
        }
    }

    /// Convert to uniform data
    pub fn to_uniform(&self, texture_ready: bool, receive_shadow: bool) -> MaterialUniform {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        MaterialUniform {
            color: self.color.into(),
            roughness: self.roughness,
            emissive: self.emissive.into(),
            metalness: self.metalness,
            use_texture: flag(self.map.is_some() && texture_ready),
            receive_shadow: flag(receive_shadow),
            _padding: [0.0; 2],
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::white()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
    }

    #[test]
    fn test_texture_flag_waits_for_upload() {
        let marble = Material::textured(TextureKey::MARBLE, 0.0);
        assert_eq!(marble.to_uniform(false, true).use_texture, 0.0);
        assert_eq!(marble.to_uniform(true, true).use_texture, 1.0);
        assert_eq!(Material::white().to_uniform(true, false).use_texture, 0.0);
    }
}
