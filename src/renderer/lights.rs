//! Lighting rig
//!
//! Ambient, point and rectangular area lights, kept in insertion order and
//! flattened into one uniform block for the standard shader.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use crate::core::SceneVariant;

/// Maximum number of punctual/area lights supported
pub const MAX_LIGHTS: usize = 8;

/// Type of light as seen by the shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LightType {
    Point = 0,
    RectArea = 1,
}

/// GPU-compatible light data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    /// Light type (0 = point, 1 = rect area)
    pub light_type: u32,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Emission direction (rect area lights)
    pub direction: [f32; 3],
    /// Cut-off distance, 0 for unbounded
    pub distance: f32,
    /// Width and height (rect area lights)
    pub size: [f32; 2],
    pub decay: f32,
    _padding: f32,
}

/// Light storage for multiple lights
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightStorage {
    /// Ambient color already scaled by its intensity
    pub ambient: [f32; 3],
    /// Number of active lights
    pub num_lights: u32,
    pub lights: [GpuLight; MAX_LIGHTS],
}

/// Uniform fill light
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

/// Omnidirectional light
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    /// Prefix for the panel labels of this light
    pub label: &'static str,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Range after which the light contributes nothing, 0 for infinite
    pub distance: f32,
    pub decay: f32,
    pub cast_shadow: bool,
    pub shadow_bias: f32,
}

impl PointLight {
    /// Create a new point light
    #[must_use]
    pub fn new(label: &'static str, position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            label,
            position,
            color,
            intensity,
            distance: 0.0,
            decay: 2.0,
            cast_shadow: false,
            shadow_bias: 0.0,
        }
    }

    /// Set the cut-off distance
    #[must_use]
    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = distance;
        self
    }

    /// Enable shadow casting with the given depth bias
    #[must_use]
    pub fn with_shadow(mut self, bias: f32) -> Self {
        self.cast_shadow = true;
        self.shadow_bias = bias;
        self
    }

    /// Convert to GPU light
    #[must_use]
    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            position: self.position.into(),
            light_type: LightType::Point as u32,
            color: self.color.into(),
            intensity: self.intensity,
            direction: [0.0, 0.0, 0.0],
            distance: self.distance,
            size: [0.0, 0.0],
            decay: self.decay,
            _padding: 0.0,
        }
    }
}

/// One-sided rectangular emitter
#[derive(Debug, Clone, PartialEq)]
pub struct RectAreaLight {
    pub label: &'static str,
    pub position: Vec3,
    /// Rotation about the vertical axis in radians
    pub rotation_y: f32,
    pub color: Vec3,
    pub intensity: f32,
    pub width: f32,
    pub height: f32,
}

impl RectAreaLight {
    /// Direction the lit face points to; an unrotated light faces -Z
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        Quat::from_rotation_y(self.rotation_y) * Vec3::NEG_Z
    }

    /// Convert to GPU light
    #[must_use]
    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            position: self.position.into(),
            light_type: LightType::RectArea as u32,
            color: self.color.into(),
            intensity: self.intensity,
            direction: self.direction().into(),
            distance: 0.0,
            size: [self.width, self.height],
            decay: 2.0,
            _padding: 0.0,
        }
    }
}

/// Any light the rig can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Ambient(AmbientLight),
    Point(PointLight),
    RectArea(RectAreaLight),
}

/// Ordered collection of the scene's lights
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightRig {
    lights: Vec<Light>,
}

impl LightRig {
    /// Create an empty rig
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the fixed rig of a scene variant
    #[must_use]
    pub fn for_variant(variant: SceneVariant) -> Self {
        let mut rig = Self::new();
        match variant {
            SceneVariant::Basic => {}
            SceneVariant::Room => {
                rig.add(Light::Ambient(AmbientLight {
                    color: Vec3::ONE,
                    intensity: 0.2,
                }));
                rig.add(Light::Point(PointLight::new(
                    "point",
                    Vec3::ZERO,
                    Vec3::ONE,
                    0.8,
                )));
            }
            SceneVariant::Extended => {
                rig.add(Light::Ambient(AmbientLight {
                    color: Vec3::ONE,
                    intensity: 0.2,
                }));
                rig.add(Light::Point(
                    PointLight::new("redLight", Vec3::new(0.0, 0.5, 1.2), Vec3::X, 2.0)
                        .with_distance(6.0)
                        .with_shadow(-0.002),
                ));
                rig.add(Light::Point(
                    PointLight::new("whiteLight", Vec3::new(2.5, 1.5, 2.0), Vec3::ONE, 0.6)
                        .with_distance(8.0)
                        .with_shadow(-0.001),
                ));
                rig.add(Light::RectArea(RectAreaLight {
                    label: "portalGlow",
                    position: Vec3::new(0.0, 0.3, -0.05),
                    rotation_y: std::f32::consts::PI,
                    color: Vec3::new(1.0, 0.2, 0.2),
                    intensity: 3.0,
                    width: 1.0,
                    height: 1.6,
                }));
            }
        }
        rig
    }

    /// Append a light; returns its index
    pub fn add(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Lights in insertion order
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Get total number of lights
    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    /// First point light with shadow casting enabled
    #[must_use]
    pub fn shadow_caster(&self) -> Option<&PointLight> {
        self.lights.iter().find_map(|light| match light {
            Light::Point(point) if point.cast_shadow => Some(point),
            _ => None,
        })
    }

    /// Shadow caster together with its slot in [`LightStorage::lights`]
    #[must_use]
    pub fn shadow_caster_slot(&self) -> Option<(usize, &PointLight)> {
        self.lights
            .iter()
            .filter(|light| !matches!(light, Light::Ambient(_)))
            .take(MAX_LIGHTS)
            .enumerate()
            .find_map(|(slot, light)| match light {
                Light::Point(point) if point.cast_shadow => Some((slot, point)),
                _ => None,
            })
    }

    /// Build GPU light storage from current lights
    #[must_use]
    pub fn build_storage(&self) -> LightStorage {
        let mut storage = LightStorage::zeroed();
        let mut ambient = Vec3::ZERO;
        let mut idx = 0;

        for light in &self.lights {
            let gpu = match light {
                Light::Ambient(a) => {
                    ambient += a.color * a.intensity;
                    continue;
                }
                Light::Point(p) => p.to_gpu(),
                Light::RectArea(r) => r.to_gpu(),
            };
            if idx >= MAX_LIGHTS {
                log::warn!("Light limit of {MAX_LIGHTS} reached, ignoring the rest");
                break;
            }
            storage.lights[idx] = gpu;
            idx += 1;
        }

        storage.ambient = ambient.into();
        storage.num_lights = idx as u32;
        storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_storage_layout() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 64);
        assert_eq!(std::mem::size_of::<LightStorage>(), 16 + 64 * MAX_LIGHTS);
    }

    #[test]
    fn test_extended_rig_order() {
        let rig = LightRig::for_variant(SceneVariant::Extended);
        let kinds: Vec<&str> = rig
            .lights()
            .iter()
            .map(|l| match l {
                Light::Ambient(_) => "ambient",
                Light::Point(_) => "point",
                Light::RectArea(_) => "rect",
            })
            .collect();
        assert_eq!(kinds, ["ambient", "point", "point", "rect"]);
        assert_eq!(rig.shadow_caster().map(|p| p.label), Some("redLight"));
        assert_eq!(rig.shadow_caster_slot().map(|(slot, _)| slot), Some(0));
    }

    #[test]
    fn test_rect_light_faces_the_room() {
        let rig = LightRig::for_variant(SceneVariant::Extended);
        let Some(Light::RectArea(rect)) = rig.get(3) else {
            panic!("expected rect area light last");
        };
        assert!((rect.direction() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_storage_folds_ambient() {
        let storage = LightRig::for_variant(SceneVariant::Room).build_storage();
        assert_eq!(storage.num_lights, 1);
        assert!((storage.ambient[0] - 0.2).abs() < 1e-6);
        assert!(LightRig::for_variant(SceneVariant::Basic).is_empty());
    }
}
