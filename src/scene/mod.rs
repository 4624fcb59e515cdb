//! Scene composition
//!
//! Scene graph, the portal surface, viewport sizing and the application
//! context that ties them together.

mod context;
mod graph;
mod portal;
mod viewport;

pub use context::PortalScene;
pub use graph::{Children, MeshRenderer, Name, Parent, SceneGraph, ShadowFlags, Transform};
pub use portal::{
    PlanePreset, Portal, PortalColors, PortalSettings, PortalSurface, PortalUniforms,
};
pub use viewport::{MAX_PIXEL_RATIO, Viewport};
