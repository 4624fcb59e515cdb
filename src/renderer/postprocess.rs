//! Post-processing chain
//!
//! The scene is drawn into an HDR target. A bright pass, two separable blur
//! passes and a composite with ACES tone mapping then produce the surface
//! image. The direct path skips the bloom passes and composites against a
//! black bloom texture.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::texture::Texture;

/// HDR color format of the scene target
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Depth format shared by every scene pipeline
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// MSAA samples of the scene pass; resolved into the HDR target
pub const SCENE_SAMPLE_COUNT: u32 = 4;

/// Multisample state of every pipeline drawing into the scene target
#[must_use]
pub fn scene_multisample() -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: SCENE_SAMPLE_COUNT,
        mask: !0,
        alpha_to_coverage_enabled: false,
    }
}

/// Size to resize to, or `None` when `requested` is empty or already current
#[must_use]
pub fn resize_target(current: (u32, u32), requested: (u32, u32)) -> Option<(u32, u32)> {
    let (width, height) = requested;
    if width == 0 || height == 0 || requested == current {
        return None;
    }
    Some(requested)
}

/// Panel-tunable bloom parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Weight of the blurred highlights in the composite
    pub strength: f32,
    /// Spread of the blur, 0..1
    pub radius: f32,
    /// Luminance above which pixels bloom
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 1.5,
            radius: 0.4,
            threshold: 0.85,
        }
    }
}

/// GPU-compatible post-process uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PostProcessUniform {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
    /// 1.0 for ACES filmic, 0.0 for plain clamp
    pub tone_mapping: f32,
    /// Size of one bloom texel in UV units
    pub texel_size: [f32; 2],
    _padding: [f32; 2],
}

impl PostProcessUniform {
    /// Uniform for a frame; `None` disables bloom
    #[must_use]
    pub fn new(
        bloom: Option<&BloomSettings>,
        tone_mapping: bool,
        bloom_size: (u32, u32),
    ) -> Self {
        let (strength, radius, threshold) = bloom
            .map_or((0.0, 0.0, 1.0), |b| (b.strength, b.radius, b.threshold));
        Self {
            strength,
            radius,
            threshold,
            tone_mapping: if tone_mapping { 1.0 } else { 0.0 },
            texel_size: [
                1.0 / bloom_size.0.max(1) as f32,
                1.0 / bloom_size.1.max(1) as f32,
            ],
            _padding: [0.0; 2],
        }
    }
}

/// Bloom buffers are rendered at half resolution
fn bloom_size(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

/// Render target for HDR rendering and post-processing
pub struct RenderTarget {
    /// HDR color texture, always single-sampled so later passes can sample it
    pub color_texture: wgpu::Texture,
    /// Color texture view
    pub color_view: wgpu::TextureView,
    /// Multisampled color view resolved into `color_view`
    pub msaa_view: Option<wgpu::TextureView>,
    /// Depth texture view, absent for bloom buffers
    pub depth_view: Option<wgpu::TextureView>,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    /// Create a new render target
    ///
    /// With `sample_count > 1` the scene is drawn into a multisampled
    /// attachment and the depth buffer matches its sample count.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        with_depth: bool,
        sample_count: u32,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa_view = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("scene_msaa_texture"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: HDR_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth_view = with_depth.then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("scene_depth_texture"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: DEPTH_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        Self {
            color_texture,
            color_view,
            msaa_view,
            depth_view,
            width,
            height,
        }
    }
}

/// Full-screen quad for post-processing
pub struct FullscreenQuad {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

/// Fullscreen quad vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl FullscreenQuad {
    /// Create a fullscreen quad
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        use wgpu::util::DeviceExt;

        let corner = |x: f32, y: f32| QuadVertex {
            position: [x, y],
            uv: [(x + 1.0) * 0.5, (1.0 - y) * 0.5],
        };
        let vertices = [
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        ];

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen_quad_vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            vertex_buffer,
            vertex_count: 6,
        }
    }

    /// Get vertex buffer layout
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Bind groups that depend on the target sizes
struct ChainBindGroups {
    bright: wgpu::BindGroup,
    blur_h: wgpu::BindGroup,
    blur_v: wgpu::BindGroup,
    composite: wgpu::BindGroup,
    direct: wgpu::BindGroup,
}

/// HDR target plus the bloom chain
pub struct PostProcessor {
    scene: RenderTarget,
    bloom_a: RenderTarget,
    bloom_b: RenderTarget,
    quad: FullscreenQuad,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    black: Texture,
    uniform_buffer: wgpu::Buffer,
    bright_pipeline: wgpu::RenderPipeline,
    blur_h_pipeline: wgpu::RenderPipeline,
    blur_v_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    bind_groups: ChainBindGroups,
}

impl PostProcessor {
    /// Build the chain at `width` x `height`, compositing into `surface_format`
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Post Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("post.wgsl").into()),
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Bind Group Layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Post Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, entry_point: &str, format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[FullscreenQuad::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let bright_pipeline = pipeline("Bloom Bright Pipeline", "fs_bright", HDR_FORMAT);
        let blur_h_pipeline = pipeline("Bloom Blur H Pipeline", "fs_blur_h", HDR_FORMAT);
        let blur_v_pipeline = pipeline("Bloom Blur V Pipeline", "fs_blur_v", HDR_FORMAT);
        let composite_pipeline = pipeline("Composite Pipeline", "fs_composite", surface_format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform = PostProcessUniform::new(None, true, bloom_size(width, height));
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Post Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let black = Texture::solid_color(device, queue, [0, 0, 0, 255]);
        let quad = FullscreenQuad::new(device);

        let (scene, bloom_a, bloom_b) = Self::create_targets(device, width, height);
        let bind_groups = Self::create_bind_groups(
            device,
            &layout,
            &sampler,
            &uniform_buffer,
            &black,
            (&scene, &bloom_a, &bloom_b),
        );

        Self {
            scene,
            bloom_a,
            bloom_b,
            quad,
            layout,
            sampler,
            black,
            uniform_buffer,
            bright_pipeline,
            blur_h_pipeline,
            blur_v_pipeline,
            composite_pipeline,
            bind_groups,
        }
    }

    fn create_targets(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (RenderTarget, RenderTarget, RenderTarget) {
        let (bw, bh) = bloom_size(width, height);
        (
            RenderTarget::new(
                device,
                "hdr_scene_texture",
                (width, height),
                true,
                SCENE_SAMPLE_COUNT,
            ),
            RenderTarget::new(device, "bloom_texture_a", (bw, bh), false, 1),
            RenderTarget::new(device, "bloom_texture_b", (bw, bh), false, 1),
        )
    }

    fn create_bind_groups(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        uniform_buffer: &wgpu::Buffer,
        black: &Texture,
        (scene, bloom_a, bloom_b): (&RenderTarget, &RenderTarget, &RenderTarget),
    ) -> ChainBindGroups {
        let bind = |label: &str, a: &wgpu::TextureView, b: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(a),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(b),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        };

        ChainBindGroups {
            bright: bind("bloom_bright_bind_group", &scene.color_view, &black.view),
            blur_h: bind("bloom_blur_h_bind_group", &bloom_a.color_view, &black.view),
            blur_v: bind("bloom_blur_v_bind_group", &bloom_b.color_view, &black.view),
            composite: bind("composite_bind_group", &scene.color_view, &bloom_a.color_view),
            direct: bind("direct_bind_group", &scene.color_view, &black.view),
        }
    }

    /// Resize every buffer of the chain; returns false if the size is unchanged
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        let Some((width, height)) = resize_target(self.size(), (width, height)) else {
            return false;
        };
        let (scene, bloom_a, bloom_b) = Self::create_targets(device, width, height);
        self.bind_groups = Self::create_bind_groups(
            device,
            &self.layout,
            &self.sampler,
            &self.uniform_buffer,
            &self.black,
            (&scene, &bloom_a, &bloom_b),
        );
        self.scene = scene;
        self.bloom_a = bloom_a;
        self.bloom_b = bloom_b;
        true
    }

    /// Size of the HDR scene target
    pub fn size(&self) -> (u32, u32) {
        (self.scene.width, self.scene.height)
    }

    /// Attachment and resolve target of the scene pass
    ///
    /// The multisampled view is drawn into and resolved into the HDR view the
    /// bloom chain samples.
    pub fn scene_attachment(&self) -> (&wgpu::TextureView, Option<&wgpu::TextureView>) {
        match &self.scene.msaa_view {
            Some(msaa) => (msaa, Some(&self.scene.color_view)),
            None => (&self.scene.color_view, None),
        }
    }

    /// Depth view matching the scene target
    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.scene.depth_view.as_ref()
    }

    /// Upload this frame's bloom parameters
    pub fn update(&self, queue: &wgpu::Queue, bloom: Option<&BloomSettings>, tone_mapping: bool) {
        let uniform = PostProcessUniform::new(
            bloom,
            tone_mapping,
            (self.bloom_a.width, self.bloom_a.height),
        );
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Run the bloom passes (when `bloom` is set) and composite into `output`
    pub fn run(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView, bloom: bool) {
        let groups = &self.bind_groups;
        if !bloom {
            self.pass(encoder, "Composite Pass", &self.composite_pipeline, &groups.direct, output);
            return;
        }
        self.pass(
            encoder,
            "Bloom Bright Pass",
            &self.bright_pipeline,
            &groups.bright,
            &self.bloom_a.color_view,
        );
        self.pass(
            encoder,
            "Bloom Blur H Pass",
            &self.blur_h_pipeline,
            &groups.blur_h,
            &self.bloom_b.color_view,
        );
        self.pass(
            encoder,
            "Bloom Blur V Pass",
            &self.blur_v_pipeline,
            &groups.blur_v,
            &self.bloom_a.color_view,
        );
        self.pass(encoder, "Composite Pass", &self.composite_pipeline, &groups.composite, output);
    }

    fn pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.vertex_buffer.slice(..));
        pass.draw(0..self.quad.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<PostProcessUniform>(), 32);
    }

    #[test]
    fn test_disabled_bloom_has_no_strength() {
        let uniform = PostProcessUniform::new(None, false, (640, 360));
        assert_eq!(uniform.strength, 0.0);
        assert_eq!(uniform.tone_mapping, 0.0);
        assert_eq!(uniform.texel_size, [1.0 / 640.0, 1.0 / 360.0]);
    }

    #[test]
    fn test_bloom_defaults() {
        let bloom = BloomSettings::default();
        let uniform = PostProcessUniform::new(Some(&bloom), true, bloom_size(1280, 720));
        assert_eq!((uniform.strength, uniform.radius, uniform.threshold), (1.5, 0.4, 0.85));
        assert_eq!(bloom_size(1, 1), (1, 1));
    }

    #[test]
    fn test_room_variant_is_tone_mapped_without_bloom() {
        let variant = crate::core::SceneVariant::Room;
        let uniform = PostProcessUniform::new(None, variant.has_tone_mapping(), (640, 360));
        assert_eq!(uniform.strength, 0.0);
        assert_eq!(uniform.tone_mapping, 1.0);
    }

    #[test]
    fn test_scene_pipelines_are_multisampled() {
        let state = scene_multisample();
        assert_eq!(state.count, SCENE_SAMPLE_COUNT);
        assert_eq!(SCENE_SAMPLE_COUNT, 4);
        assert_eq!(state.mask, !0);
        assert!(!state.alpha_to_coverage_enabled);
    }

    #[test]
    fn test_resize_target_skips_same_and_empty_sizes() {
        assert_eq!(resize_target((1280, 720), (1280, 720)), None);
        assert_eq!(resize_target((1280, 720), (0, 720)), None);
        assert_eq!(resize_target((1280, 720), (1280, 0)), None);
        assert_eq!(resize_target((1280, 720), (2560, 1440)), Some((2560, 1440)));
    }
}
