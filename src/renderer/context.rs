//! Main renderer implementation

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use hecs::Entity;
use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::mesh::{Mesh, Vertex};
use super::postprocess::{DEPTH_FORMAT, HDR_FORMAT, PostProcessor, resize_target, scene_multisample};
use super::shadow::{ShadowConfig, ShadowMap};
use super::texture::Texture;
use super::{Camera, TextureKey};
use crate::assets::DecodedImage;
use crate::core::{FramePresenter, RenderPath};
use crate::scene::{
    MeshRenderer, PortalScene, PortalSurface, PortalUniforms, ShadowFlags, Viewport,
};
use crate::ui::OverlayFrame;

/// Uniform buffer for camera data
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    view_pos: [f32; 3],
    _padding: f32,
}

impl CameraUniform {
    fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            view_pos: camera.position.into(),
            _padding: 0.0,
        }
    }
}

/// Uniform buffer for model transform
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
}

impl ModelUniform {
    pub fn from_transform(model: Mat4) -> Self {
        let normal_matrix = model.inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
        }
    }
}

impl Default for ModelUniform {
    fn default() -> Self {
        Self::from_transform(Mat4::IDENTITY)
    }
}

/// Errors raised while setting up or driving the GPU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The window surface could not be created
    CreateSurface(String),
    /// No adapter can present to the surface
    NoAdapter,
    /// The adapter refused the device request
    RequestDevice(String),
    /// Frame acquisition failed for a reason other than a stale surface
    Surface(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateSurface(e) => write!(f, "Failed to create surface: {e}"),
            Self::NoAdapter => write!(f, "No suitable GPU adapter found"),
            Self::RequestDevice(e) => write!(f, "Failed to create device: {e}"),
            Self::Surface(e) => write!(f, "Surface error: {e}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Per-entity model uniform
struct ModelBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// GPU state of a mesh drawn with the standard program
struct MeshBinding {
    model: ModelBinding,
    material_buffer: wgpu::Buffer,
    material_bind_group: wgpu::BindGroup,
    /// Color map the bind group was built with, if it was ready
    bound_map: Option<TextureKey>,
}

/// Mesh drawn this frame with its node and shadow participation
type VisibleMesh<'a> = (&'a MeshBinding, Entity, ShadowFlags);

/// GPU state of the portal surface
struct PortalBinding {
    entity: Entity,
    model: ModelBinding,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Bind group layouts shared by the scene pipelines
struct Layouts {
    global: wgpu::BindGroupLayout,
    model: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
    portal: wgpu::BindGroupLayout,
}

/// Main renderer
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    layouts: Layouts,
    standard_pipeline: wgpu::RenderPipeline,
    portal_pipeline: wgpu::RenderPipeline,
    portal_double_sided_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    shadow: ShadowMap,
    shadow_pass_bind_group: wgpu::BindGroup,
    post: PostProcessor,
    white: Texture,
    textures: FxHashMap<TextureKey, Texture>,
    meshes: FxHashMap<Entity, MeshBinding>,
    portal: Option<PortalBinding>,
    egui: egui_wgpu::Renderer,
    overlay: Option<OverlayFrame>,
    /// Clear color
    pub clear_color: wgpu::Color,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl Renderer {
    /// Create a new renderer drawing into `window` at `viewport`'s drawing-buffer size
    ///
    /// # Errors
    ///
    /// Returns an error if no surface, adapter or device is available
    pub async fn new(
        window: Arc<Window>,
        viewport: Viewport,
        vsync: bool,
    ) -> Result<Self, RenderError> {
        let (width, height) = viewport.drawing_buffer_size();

        // Create instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::CreateSurface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Portal Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::RequestDevice(e.to_string()))?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::NoAdapter)?;

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = Self::create_layouts(&device);

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Buffer"),
            size: std::mem::size_of::<super::LightStorage>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shadow = ShadowMap::new(&device, ShadowConfig::default());
        let shadow_pass_layout = ShadowMap::pass_bind_group_layout(&device);
        let shadow_pass_bind_group = shadow.create_pass_bind_group(&device, &shadow_pass_layout);

        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &layouts.global,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: shadow.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&shadow.depth_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&shadow.sampler),
                },
            ],
        });

        let standard_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Standard Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("standard.wgsl").into()),
        });
        let portal_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Portal Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("portal.wgsl").into()),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
        });

        let standard_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Standard Pipeline Layout"),
            bind_group_layouts: &[&layouts.global, &layouts.model, &layouts.material],
            push_constant_ranges: &[],
        });
        let portal_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Portal Pipeline Layout"),
            bind_group_layouts: &[&layouts.global, &layouts.model, &layouts.portal],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&shadow_pass_layout, &layouts.model],
            push_constant_ranges: &[],
        });

        let standard_pipeline = Self::create_scene_pipeline(
            &device,
            "Standard Pipeline",
            &standard_layout,
            &standard_shader,
            Some(wgpu::Face::Back),
        );
        let portal_pipeline = Self::create_scene_pipeline(
            &device,
            "Portal Pipeline",
            &portal_layout,
            &portal_shader,
            Some(wgpu::Face::Back),
        );
        let portal_double_sided_pipeline = Self::create_scene_pipeline(
            &device,
            "Portal Double Sided Pipeline",
            &portal_layout,
            &portal_shader,
            None,
        );

        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(&shadow_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let white = Texture::white(&device, &queue);
        let post = PostProcessor::new(&device, &queue, surface_format, width, height);
        let egui = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            layouts,
            standard_pipeline,
            portal_pipeline,
            portal_double_sided_pipeline,
            shadow_pipeline,
            camera_buffer,
            light_buffer,
            global_bind_group,
            shadow,
            shadow_pass_bind_group,
            post,
            white,
            textures: FxHashMap::default(),
            meshes: FxHashMap::default(),
            portal: None,
            egui,
            overlay: None,
            clear_color: wgpu::Color::BLACK,
        })
    }

    fn create_layouts(device: &wgpu::Device) -> Layouts {
        let global = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Global Bind Group Layout"),
            entries: &[
                // Camera
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                // Lights
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                // Shadow light-space matrix and bias
                uniform_entry(2, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                // Shadow map
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let model = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let portal = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Portal Bind Group Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        Layouts {
            global,
            model,
            material,
            portal,
        }
    }

    fn create_scene_pipeline(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        cull_mode: Option<wgpu::Face>,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: scene_multisample(),
            multiview: None,
            cache: None,
        })
    }

    /// Resize the surface and the post-processing buffers to `viewport`
    ///
    /// Returns false if the drawing-buffer size did not change.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        let Some((width, height)) = needs_resize(self.size(), viewport) else {
            return false;
        };
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.post.resize(&self.device, width, height);
        log::debug!("Surface resized to {width}x{height}");
        true
    }

    /// Current surface size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Upload a decoded color map under `key`
    ///
    /// Materials referencing `key` pick it up on the next [`Renderer::sync`].
    pub fn insert_texture(&mut self, key: TextureKey, image: &DecodedImage) {
        let texture = Texture::from_decoded(&self.device, &self.queue, image, Some(key.0));
        log::info!("Texture '{}' uploaded ({}x{})", key.0, texture.width(), texture.height());
        self.textures.insert(key, texture);
    }

    /// Whether a texture is registered under `key`
    pub fn has_texture(&self, key: TextureKey) -> bool {
        self.textures.contains_key(&key)
    }

    /// Overlay to draw on top of the next frame
    pub fn set_overlay(&mut self, overlay: OverlayFrame) {
        self.overlay = Some(overlay);
    }

    /// Upload a mesh to the GPU
    pub fn upload_mesh(&self, mesh: &mut Mesh) {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        mesh.vertex_buffer = Some(vertex_buffer);
        mesh.index_buffer = Some(index_buffer);
    }

    /// Bring GPU resources in line with the scene graph
    ///
    /// Uploads new meshes, creates bindings for new entities, drops bindings
    /// of removed ones and rebinds materials whose color map became ready.
    pub fn sync(&mut self, scene: &mut PortalScene) {
        let world = scene.graph.world_mut();

        for (entity, renderer) in world.query_mut::<&mut MeshRenderer>() {
            if !renderer.mesh.is_uploaded() {
                self.upload_mesh(&mut renderer.mesh);
            }
            let ready_map = renderer.material.map.filter(|key| self.textures.contains_key(key));
            match self.meshes.get(&entity).map(|binding| binding.bound_map) {
                Some(bound) if bound == ready_map => {}
                Some(_) => {
                    let bind_group = self.meshes.get(&entity).map(|binding| {
                        self.create_material_bind_group(&binding.material_buffer, ready_map)
                    });
                    if let (Some(binding), Some(bind_group)) =
                        (self.meshes.get_mut(&entity), bind_group)
                    {
                        binding.material_bind_group = bind_group;
                        binding.bound_map = ready_map;
                    }
                }
                None => {
                    let material_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("Material Buffer"),
                        size: std::mem::size_of::<super::MaterialUniform>() as wgpu::BufferAddress,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    });
                    let material_bind_group =
                        self.create_material_bind_group(&material_buffer, ready_map);
                    let binding = MeshBinding {
                        model: self.create_model_binding(),
                        material_buffer,
                        material_bind_group,
                        bound_map: ready_map,
                    };
                    self.meshes.insert(entity, binding);
                }
            }
        }

        for (entity, surface) in world.query_mut::<&mut PortalSurface>() {
            if !surface.mesh.is_uploaded() {
                self.upload_mesh(&mut surface.mesh);
            }
            if self.portal.as_ref().is_none_or(|p| p.entity != entity) {
                self.portal = Some(self.create_portal_binding(entity));
            }
        }

        let world = scene.graph.world();
        self.meshes.retain(|entity, _| world.contains(*entity));
        if self
            .portal
            .as_ref()
            .is_some_and(|p| !world.contains(p.entity))
        {
            self.portal = None;
        }
    }

    fn create_model_binding(&self) -> ModelBinding {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Model Buffer"),
                contents: bytemuck::bytes_of(&ModelUniform::default()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout: &self.layouts.model,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        ModelBinding { buffer, bind_group }
    }

    fn create_material_bind_group(
        &self,
        buffer: &wgpu::Buffer,
        map: Option<TextureKey>,
    ) -> wgpu::BindGroup {
        let texture = map
            .and_then(|key| self.textures.get(&key))
            .unwrap_or(&self.white);
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.layouts.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    fn create_portal_binding(&self, entity: Entity) -> PortalBinding {
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Portal Uniform Buffer"),
            size: std::mem::size_of::<PortalUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Portal Bind Group"),
            layout: &self.layouts.portal,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        PortalBinding {
            entity,
            model: self.create_model_binding(),
            uniform_buffer,
            bind_group,
        }
    }

    /// Write every per-frame uniform from the scene
    fn write_uniforms(&mut self, scene: &PortalScene) {
        let camera = CameraUniform::from_camera(&scene.camera);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));
        let lights = scene.lights.build_storage();
        self.queue
            .write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&lights));

        match scene.lights.shadow_caster_slot() {
            Some((slot, light)) => self.shadow.update_for_point_light(&self.queue, slot, light),
            None => self.shadow.disable(&self.queue),
        }

        let graph = &scene.graph;
        let mut query = graph.world().query::<&MeshRenderer>();
        for (entity, renderer) in query.iter() {
            let Some(binding) = self.meshes.get(&entity) else {
                continue;
            };
            let model = ModelUniform::from_transform(graph.world_matrix(entity));
            self.queue
                .write_buffer(&binding.model.buffer, 0, bytemuck::bytes_of(&model));
            let receive = graph
                .shadow_flags(entity)
                .is_some_and(|flags| flags.receive);
            let material = renderer
                .material
                .to_uniform(binding.bound_map.is_some(), receive);
            self.queue
                .write_buffer(&binding.material_buffer, 0, bytemuck::bytes_of(&material));
        }

        if let Some(portal) = &self.portal {
            let model = ModelUniform::from_transform(graph.world_matrix(portal.entity));
            self.queue
                .write_buffer(&portal.model.buffer, 0, bytemuck::bytes_of(&model));
            self.queue.write_buffer(
                &portal.uniform_buffer,
                0,
                bytemuck::bytes_of(&scene.portal.uniforms),
            );
        }

        self.post
            .update(&self.queue, scene.bloom.as_ref(), scene.variant.has_tone_mapping());
    }

    /// Attached meshes that have GPU bindings, with their shadow flags
    fn visible_meshes<'a>(&'a self, scene: &'a PortalScene) -> Vec<VisibleMesh<'a>> {
        let graph = &scene.graph;
        let mut visible: Vec<_> = self
            .meshes
            .iter()
            .filter(|(entity, _)| graph.is_attached(**entity))
            .map(|(entity, binding)| {
                let flags = graph.shadow_flags(*entity).unwrap_or(ShadowFlags::NONE);
                (binding, *entity, flags)
            })
            .collect();
        // Stable order keeps the draw sequence deterministic across frames
        visible.sort_by_key(|(_, entity, _)| entity.to_bits());
        visible
    }

    fn shadow_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &PortalScene,
        visible: &[VisibleMesh<'_>],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.shadow.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !self.shadow.is_enabled() {
            return;
        }

        pass.set_pipeline(&self.shadow_pipeline);
        pass.set_bind_group(0, &self.shadow_pass_bind_group, &[]);
        let world = scene.graph.world();
        for (binding, entity, flags) in visible {
            if !flags.cast {
                continue;
            }
            let Ok(renderer) = world.get::<&MeshRenderer>(*entity) else {
                continue;
            };
            pass.set_bind_group(1, &binding.model.bind_group, &[]);
            draw_mesh(&mut pass, &renderer.mesh);
        }
    }

    fn scene_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &PortalScene,
        visible: &[VisibleMesh<'_>],
    ) {
        let Some(depth_view) = self.post.depth_view() else {
            return;
        };
        let (view, resolve_target) = self.post.scene_attachment();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.global_bind_group, &[]);
        let world = scene.graph.world();

        pass.set_pipeline(&self.standard_pipeline);
        for (binding, entity, _) in visible {
            let Ok(renderer) = world.get::<&MeshRenderer>(*entity) else {
                continue;
            };
            pass.set_bind_group(1, &binding.model.bind_group, &[]);
            pass.set_bind_group(2, &binding.material_bind_group, &[]);
            draw_mesh(&mut pass, &renderer.mesh);
        }

        if let Some(portal) = &self.portal {
            if !scene.graph.is_attached(portal.entity) {
                return;
            }
            let Ok(surface) = world.get::<&PortalSurface>(portal.entity) else {
                return;
            };
            let pipeline = if surface.double_sided {
                &self.portal_double_sided_pipeline
            } else {
                &self.portal_pipeline
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, &portal.model.bind_group, &[]);
            pass.set_bind_group(2, &portal.bind_group, &[]);
            draw_mesh(&mut pass, &surface.mesh);
        }
    }

    /// Draw the pending overlay into `view`; returns egui's extra command buffers
    fn overlay_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> (Vec<wgpu::CommandBuffer>, Vec<egui::TextureId>) {
        let Some(overlay) = self.overlay.take() else {
            return (Vec::new(), Vec::new());
        };

        for (id, delta) in &overlay.textures_delta.set {
            self.egui
                .update_texture(&self.device, &self.queue, *id, delta);
        }

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: overlay.pixels_per_point,
        };
        let buffers = self.egui.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &overlay.primitives,
            &screen,
        );

        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        self.egui.render(&mut pass, &overlay.primitives, &screen);
        drop(pass);

        (buffers, overlay.textures_delta.free)
    }

    /// Get the device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get the queue
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Surface size to apply for `viewport`, or `None` when nothing changes
fn needs_resize(current: (u32, u32), viewport: Viewport) -> Option<(u32, u32)> {
    resize_target(current, viewport.drawing_buffer_size())
}

fn draw_mesh(pass: &mut wgpu::RenderPass<'_>, mesh: &Mesh) {
    let (Some(vertices), Some(indices)) = (&mesh.vertex_buffer, &mesh.index_buffer) else {
        return;
    };
    pass.set_vertex_buffer(0, vertices.slice(..));
    pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
}

impl FramePresenter for Renderer {
    type Error = RenderError;

    fn present(&mut self, scene: &PortalScene, path: RenderPath) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.write_uniforms(scene);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let visible = self.visible_meshes(scene);
            self.shadow_pass(&mut encoder, scene, &visible);
            self.scene_pass(&mut encoder, scene, &visible);
        }
        self.post
            .run(&mut encoder, &view, path == RenderPath::PostProcess);

        let (overlay_buffers, freed) = self.overlay_pass(&mut encoder, &view);

        self.queue
            .submit(overlay_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();

        for id in &freed {
            self.egui.free_texture(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layouts() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<ModelUniform>(), 128);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        let uniform = ModelUniform::from_transform(Mat4::from_scale(glam::Vec3::splat(2.0)));
        assert_eq!(uniform.normal_matrix[0][0], 0.5);
        assert_eq!(uniform.model[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_resize_to_same_buffer_is_noop() {
        let viewport = Viewport::from_physical(1600, 1200, 2.0);
        let size = viewport.drawing_buffer_size();

        assert_eq!(needs_resize((1280, 720), viewport), Some(size));
        assert_eq!(needs_resize(size, viewport), None);
        assert_eq!(needs_resize(size, Viewport::from_physical(1600, 1200, 2.0)), None);
    }

    #[test]
    fn test_render_error_display() {
        assert_eq!(
            RenderError::NoAdapter.to_string(),
            "No suitable GPU adapter found"
        );
    }
}
