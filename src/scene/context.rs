//! Application context
//!
//! Everything the render loop, the resize handler and the debug panel touch
//! lives in one [`PortalScene`] that is passed to them explicitly.

use glam::Vec3;
use hecs::Entity;

use super::{
    Portal, PortalColors, PortalSurface, PortalUniforms, PlanePreset, SceneGraph, Transform,
    Viewport,
};
use crate::assets::{AssetError, RoomModel, apply_room_shadows, assign_room_materials, spawn_model};
use crate::core::{PortalConfig, SceneVariant};
use crate::renderer::{BloomSettings, Camera, LightRig, OrbitControls};
use crate::ui::parse_hex_color;

/// The room sits one unit below the portal
const ROOM_OFFSET: Vec3 = Vec3::new(0.0, -1.0, 0.0);

/// Scene state owned by the application
pub struct PortalScene {
    pub variant: SceneVariant,
    pub graph: SceneGraph,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub portal: Portal,
    pub lights: LightRig,
    /// Present only when the frame goes through the bloom chain
    pub bloom: Option<BloomSettings>,
    viewport: Viewport,
    room: Option<Entity>,
}

impl PortalScene {
    /// Assemble the scene for `config.variant`; the room is added later once
    /// its model has loaded
    pub fn new(config: &PortalConfig, viewport: Viewport) -> Self {
        let variant = config.variant;
        let mut graph = SceneGraph::new();

        let camera_settings = config.camera_settings();
        let camera = Camera::perspective(
            camera_settings.fov_degrees,
            viewport.aspect(),
            camera_settings.near,
            camera_settings.far,
            camera_settings.position,
        );

        let portal = spawn_portal(&mut graph, config);

        Self {
            variant,
            graph,
            camera,
            controls: OrbitControls::new(),
            portal,
            lights: LightRig::for_variant(variant),
            bloom: variant.has_bloom().then(|| config.bloom.clone()),
            viewport,
            room: None,
        }
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Apply a new window size; returns false if nothing changed
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.camera.set_aspect(viewport.width, viewport.height);
        log::debug!(
            "Viewport {}x{} @ {}x",
            viewport.width,
            viewport.height,
            viewport.pixel_ratio
        );
        true
    }

    /// Advance orbit controls by one frame
    pub fn update_controls(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }

    /// Push the elapsed time into the portal uniforms
    ///
    /// Time never runs backwards: an earlier reading is ignored.
    pub fn set_time(&mut self, elapsed: f32) {
        if elapsed > self.portal.uniforms.time {
            self.portal.uniforms.time = elapsed;
        }
    }

    /// Room node once inserted
    pub fn room(&self) -> Option<Entity> {
        self.room
    }

    /// Insert the loaded room model under the scene root
    ///
    /// The subtree is built detached and only attached once every named mesh
    /// has its material; on failure nothing is left in the graph.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::MissingMesh`] if a required mesh is absent
    pub fn insert_room(&mut self, model: RoomModel) -> Result<Entity, AssetError> {
        if let Some(room) = self.room {
            log::warn!("Room already inserted, ignoring second model");
            return Ok(room);
        }

        let room = spawn_model(&mut self.graph, model);
        if let Err(e) = assign_room_materials(&mut self.graph, room, self.variant) {
            self.graph.remove(room);
            return Err(e);
        }

        if self.variant == SceneVariant::Extended {
            apply_room_shadows(&mut self.graph, room);
        }
        if let Some(mut transform) = self.graph.transform_mut(room) {
            transform.position = ROOM_OFFSET;
        }
        self.graph.attach(room);
        self.room = Some(room);
        log::info!("Room inserted");
        Ok(room)
    }

    /// Local transform of the portal node
    pub fn portal_transform(&self) -> Transform {
        self.graph.transform(self.portal.entity).unwrap_or_default()
    }

    /// Edit the portal node's local transform
    pub fn update_portal_transform(&mut self, edit: impl FnOnce(&mut Transform)) {
        if let Some(mut transform) = self.graph.transform_mut(self.portal.entity) {
            edit(&mut *transform);
        }
    }
}

fn spawn_portal(graph: &mut SceneGraph, config: &PortalConfig) -> Portal {
    let preset = PlanePreset::for_variant(config.variant);
    let settings = &config.portal;

    let mut colors = PortalColors {
        base: settings.base_color.clone(),
        accent: settings.accent_color.clone(),
    };
    let base = parse_hex_color(&colors.base).unwrap_or_else(|e| {
        log::warn!("Invalid base color '{}': {e}, using #ff0000", colors.base);
        colors.base = String::from("#ff0000");
        Vec3::X
    });
    let accent = parse_hex_color(&colors.accent).unwrap_or_else(|e| {
        log::warn!("Invalid accent color '{}': {e}, using #000000", colors.accent);
        colors.accent = String::from("#000000");
        Vec3::ZERO
    });

    let position = match config.variant {
        SceneVariant::Extended => Vec3::new(0.0, 0.3, 0.0),
        SceneVariant::Basic | SceneVariant::Room => Vec3::ZERO,
    };
    let entity = graph.spawn_node(Some("portal"), Transform::from_position(position));
    let _ = graph.world_mut().insert_one(
        entity,
        PortalSurface {
            mesh: preset.build_mesh(),
            double_sided: preset.double_sided,
        },
    );
    graph.attach(entity);

    Portal {
        entity,
        preset,
        uniforms: PortalUniforms::from_settings(settings, base, accent),
        colors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ModelNode;
    use crate::renderer::Mesh;

    fn scene(variant: SceneVariant) -> PortalScene {
        let config = PortalConfig {
            variant,
            ..PortalConfig::default()
        };
        PortalScene::new(&config, Viewport::new(1280, 720, 1.0))
    }

    fn room_model(names: &[&str]) -> RoomModel {
        RoomModel {
            nodes: names
                .iter()
                .map(|name| ModelNode::new(*name, Some(Mesh::plane(1.0, 1.0, 1, 1))))
                .collect(),
        }
    }

    #[test]
    fn test_resize_twice_is_noop() {
        let mut scene = scene(SceneVariant::Room);
        let viewport = Viewport::from_physical(1600, 1200, 2.0);

        assert!(scene.resize(viewport));
        let aspect = scene.camera.aspect;
        let buffer = scene.viewport().drawing_buffer_size();

        assert!(!scene.resize(viewport));
        assert_eq!(scene.camera.aspect, aspect);
        assert_eq!(scene.viewport().drawing_buffer_size(), buffer);
    }

    #[test]
    fn test_time_never_decreases() {
        let mut scene = scene(SceneVariant::Basic);
        scene.set_time(2.0);
        scene.set_time(1.5);
        assert_eq!(scene.portal.uniforms.time, 2.0);
    }

    #[test]
    fn test_bloom_only_in_extended() {
        assert!(scene(SceneVariant::Basic).bloom.is_none());
        assert!(scene(SceneVariant::Room).bloom.is_none());
        assert!(scene(SceneVariant::Extended).bloom.is_some());
    }

    #[test]
    fn test_portal_is_attached_with_preset() {
        let scene = scene(SceneVariant::Basic);
        assert!(scene.graph.is_attached(scene.portal.entity));
        assert!(scene.portal.preset.double_sided);
        assert_eq!(scene.portal.uniforms.base_color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_insert_room_lowers_and_attaches() {
        let mut scene = scene(SceneVariant::Room);
        let room = scene
            .insert_room(room_model(&["walls", "floor", "roof", "light1", "light2"]))
            .unwrap();

        assert!(scene.graph.is_attached(room));
        assert_eq!(scene.graph.transform(room).unwrap().position, ROOM_OFFSET);
        assert_eq!(scene.room(), Some(room));
    }

    #[test]
    fn test_failed_room_leaves_graph_untouched() {
        let mut scene = scene(SceneVariant::Extended);
        let before = scene.graph.len();

        let result = scene.insert_room(room_model(&["walls", "floor", "roof", "light1", "light2"]));

        assert_eq!(result, Err(AssetError::MissingMesh(String::from("frame"))));
        assert_eq!(scene.graph.len(), before);
        assert_eq!(scene.room(), None);
    }
}
