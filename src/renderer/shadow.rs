//! Shadow mapping for the shadow-casting point light
//!
//! The light renders a depth-only pass through a wide perspective frustum
//! aimed at the room; the standard shader compares against it with PCF.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::PointLight;

/// Shadow map configuration
#[derive(Debug, Clone)]
pub struct ShadowConfig {
    /// Shadow map resolution (width and height)
    pub resolution: u32,
    /// Near plane for shadow camera
    pub near: f32,
    /// Vertical field of view of the light frustum, in degrees
    pub fov_degrees: f32,
    /// Point the light looks at
    pub target: Vec3,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 1024,
            near: 0.05,
            fov_degrees: 120.0,
            target: Vec3::new(0.0, -0.5, 0.0),
        }
    }
}

/// Shadow uniform data for shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    /// Light space matrix
    pub light_space_matrix: [[f32; 4]; 4],
    /// Depth bias; negative values push the comparison towards the light
    pub bias: f32,
    /// 1.0 while a caster is active
    pub enabled: f32,
    /// Slot of the casting light in the light array
    pub caster: u32,
    _padding: f32,
}

impl ShadowUniform {
    /// Uniform that leaves every surface lit
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            light_space_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            bias: 0.0,
            enabled: 0.0,
            caster: 0,
            _padding: 0.0,
        }
    }
}

/// Light-space projection for a point light at `position`
///
/// `far` of zero means the light is unbounded; the frustum then falls back
/// to a fixed range.
#[must_use]
pub fn light_space_matrix(config: &ShadowConfig, position: Vec3, far: f32) -> Mat4 {
    let far = if far > config.near { far } else { 50.0 };
    let projection =
        Mat4::perspective_rh(config.fov_degrees.to_radians(), 1.0, config.near, far);
    let forward = (config.target - position).normalize_or(Vec3::NEG_Y);
    let up = if forward.abs().dot(Vec3::Y) > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let view = Mat4::look_to_rh(position, forward, up);
    projection * view
}

/// Shadow map for a single light
pub struct ShadowMap {
    /// Texture view for rendering
    pub depth_view: wgpu::TextureView,
    /// Sampler for shadow sampling
    pub sampler: wgpu::Sampler,
    /// Configuration
    pub config: ShadowConfig,
    /// Uniform buffer for shadow data
    pub uniform_buffer: wgpu::Buffer,
    uniform: ShadowUniform,
}

impl ShadowMap {
    /// Create a new shadow map
    #[must_use]
    pub fn new(device: &wgpu::Device, config: ShadowConfig) -> Self {
        let size = wgpu::Extent3d {
            width: config.resolution,
            height: config.resolution,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let depth_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let uniform = ShadowUniform::disabled();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shadow_uniform_buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            depth_view,
            sampler,
            config,
            uniform_buffer,
            uniform,
        }
    }

    /// Aim the shadow camera from the point light in `slot`
    pub fn update_for_point_light(&mut self, queue: &wgpu::Queue, slot: usize, light: &PointLight) {
        self.write(
            queue,
            ShadowUniform {
                light_space_matrix: light_space_matrix(&self.config, light.position, light.distance)
                    .to_cols_array_2d(),
                bias: light.shadow_bias,
                enabled: 1.0,
                caster: slot as u32,
                _padding: 0.0,
            },
        );
    }

    /// Turn shadows off until the next caster update
    pub fn disable(&mut self, queue: &wgpu::Queue) {
        self.write(queue, ShadowUniform::disabled());
    }

    fn write(&mut self, queue: &wgpu::Queue, uniform: ShadowUniform) {
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
        }
    }

    /// Whether a caster is active
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.uniform.enabled > 0.5
    }

    /// Layout of the depth pass's light-space group
    pub fn pass_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_pass_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    /// Bind group for the depth pass
    pub fn create_pass_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_pass_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }],
        })
    }

    /// Get the resolution
    #[must_use]
    pub const fn resolution(&self) -> u32 {
        self.config.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<ShadowUniform>(), 80);
    }

    #[test]
    fn test_target_projects_to_center() {
        let config = ShadowConfig::default();
        let matrix = light_space_matrix(&config, Vec3::new(0.0, 0.5, 1.2), 6.0);
        let clip = matrix * config.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_light_straight_above_target() {
        let config = ShadowConfig::default();
        let matrix = light_space_matrix(&config, Vec3::new(0.0, 3.0, 0.0), 0.0);
        assert!(matrix.is_finite());
    }
}
