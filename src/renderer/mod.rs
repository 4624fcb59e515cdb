//! Rendering module
//!
//! wgpu renderer for the portal scene: lit room meshes with a point-light
//! shadow map, the animated portal surface, and an HDR post-processing chain.

mod camera;
mod context;
mod controls;
mod lights;
mod material;
mod mesh;
mod postprocess;
mod shadow;
mod texture;

pub use camera::Camera;
pub use context::{ModelUniform, RenderError, Renderer};
pub use controls::OrbitControls;
pub use lights::{
    AmbientLight, GpuLight, Light, LightRig, LightStorage, LightType, MAX_LIGHTS, PointLight,
    RectAreaLight,
};
pub use material::{Material, MaterialUniform, TextureKey};
pub use mesh::{Mesh, Vertex};
pub use postprocess::{
    BloomSettings, FullscreenQuad, PostProcessUniform, PostProcessor, RenderTarget,
    SCENE_SAMPLE_COUNT,
};
pub use shadow::{ShadowConfig, ShadowMap, ShadowUniform};
pub use texture::Texture;
