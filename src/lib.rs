//! An animated portal in a lit room, rendered with wgpu
//!
//! This crate provides:
//! - A shader-driven portal surface with wave displacement and noise
//! - A glTF room with named-mesh materials, point and area lights, shadows
//! - An HDR bloom chain and an egui panel of live tunables
//! - A render loop with pluggable frame scheduling

pub mod app;
pub mod assets;
pub mod core;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod ui;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use wgpu;
pub use winit;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::app::PortalApp;
    pub use crate::assets::{AssetError, AssetLoader, Pending, RoomModel};
    pub use crate::core::{
        Engine, EngineConfig, EngineContext, FramePolicy, FramePresenter, FrameStats, Game,
        PortalConfig, RenderLoop, RenderPath, SceneVariant,
    };
    pub use crate::input::Input;
    pub use crate::renderer::{BloomSettings, Camera, LightRig, Material, Mesh, Renderer};
    pub use crate::scene::{PortalScene, SceneGraph, Transform, Viewport};
    pub use crate::ui::{DebugOverlay, TweakPanel};
    pub use glam::{Mat4, Quat, Vec2, Vec3};
}
