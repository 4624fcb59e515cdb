//! Asset loading
//!
//! Provides:
//! - Background loading with single-resolution pending handles
//! - glTF room model parsing
//! - Named-mesh material assignment

mod error;
mod loader;
mod room;

pub use error::AssetError;
pub use loader::{AssetLoader, DecodedImage, FLOOR_TEXTURE_PATH, Pending, ROOM_MODEL_PATH};
pub use room::{
    ModelNode, RoomModel, apply_room_shadows, assign_room_materials, names, room_materials,
    spawn_model,
};
