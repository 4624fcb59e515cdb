//! Scene graph built on hecs
//!
//! Every node is an entity carrying a [`Name`], a local [`Transform`] and
//! hierarchy links. Renderable nodes add a [`MeshRenderer`]; nodes taking
//! part in shadowing add [`ShadowFlags`].

use glam::{Mat4, Quat, Vec3};
use hecs::Entity;
use smallvec::SmallVec;

use crate::renderer::{Material, Mesh};

/// Node name used for lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Local transform relative to the parent node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Get the local transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Parent link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Ordered child links
#[derive(Debug, Clone, Default)]
pub struct Children(pub SmallVec<[Entity; 8]>);

impl Children {
    fn add(&mut self, child: Entity) {
        if !self.0.contains(&child) {
            self.0.push(child);
        }
    }

    fn remove(&mut self, child: Entity) {
        self.0.retain(|e| *e != child);
    }
}

/// Shadow participation of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowFlags {
    pub cast: bool,
    pub receive: bool,
}

impl ShadowFlags {
    pub const BOTH: Self = Self {
        cast: true,
        receive: true,
    };
    pub const NONE: Self = Self {
        cast: false,
        receive: false,
    };
}

/// Geometry plus the material it is drawn with
#[derive(Debug)]
pub struct MeshRenderer {
    pub mesh: Mesh,
    pub material: Material,
}

impl MeshRenderer {
    pub fn new(mesh: Mesh, material: Material) -> Self {
        Self { mesh, material }
    }
}

/// Scene graph with a single root node
pub struct SceneGraph {
    /// The underlying hecs world
    world: hecs::World,
    root: Entity,
}

impl SceneGraph {
    /// Create a graph holding only the root node
    pub fn new() -> Self {
        let mut world = hecs::World::new();
        let root = world.spawn((Name::new("scene"), Transform::default(), Children::default()));
        Self { world, root }
    }

    /// Root node
    pub fn root(&self) -> Entity {
        self.root
    }

    /// Spawn a detached node
    pub fn spawn_node(&mut self, name: Option<&str>, transform: Transform) -> Entity {
        let entity = self.world.spawn((transform, Children::default()));
        if let Some(name) = name {
            // Entity was just spawned, insertion cannot fail
            let _ = self.world.insert_one(entity, Name::new(name));
        }
        entity
    }

    /// Link `child` under `parent`, detaching it from any previous parent
    pub fn add_child(&mut self, parent: Entity, child: Entity) {
        if parent == child || !self.world.contains(parent) || !self.world.contains(child) {
            return;
        }
        self.detach(child);

        if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
            children.add(child);
        }
        let _ = self.world.insert_one(child, Parent(parent));
    }

    /// Attach a node directly under the root
    pub fn attach(&mut self, child: Entity) {
        self.add_child(self.root, child);
    }

    /// Unlink a node from its parent, keeping it alive
    pub fn detach(&mut self, child: Entity) {
        let parent = match self.world.get::<&Parent>(child) {
            Ok(parent) => parent.0,
            Err(_) => return,
        };
        if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
            children.remove(child);
        }
        let _ = self.world.remove_one::<Parent>(child);
    }

    /// Despawn a node and its whole subtree
    pub fn remove(&mut self, entity: Entity) {
        if entity == self.root {
            return;
        }
        self.detach(entity);
        for node in self.descendants(entity) {
            let _ = self.world.despawn(node);
        }
    }

    /// Immediate children in insertion order
    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.world
            .get::<&Children>(entity)
            .map(|children| children.0.to_vec())
            .unwrap_or_default()
    }

    /// Parent of a node, `None` for the root or detached nodes
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<&Parent>(entity).ok().map(|p| p.0)
    }

    /// First immediate child whose name matches exactly
    pub fn find_child(&self, parent: Entity, name: &str) -> Option<Entity> {
        self.children(parent)
            .into_iter()
            .find(|&child| self.name(child).as_deref() == Some(name))
    }

    /// `entity` followed by every node below it, depth first
    pub fn descendants(&self, entity: Entity) -> Vec<Entity> {
        let mut visited = Vec::new();
        let mut stack = vec![entity];
        while let Some(node) = stack.pop() {
            if !self.world.contains(node) {
                continue;
            }
            visited.push(node);
            let children = self.children(node);
            stack.extend(children.into_iter().rev());
        }
        visited
    }

    /// Name of a node
    pub fn name(&self, entity: Entity) -> Option<String> {
        self.world.get::<&Name>(entity).ok().map(|n| n.0.clone())
    }

    /// Local transform of a node
    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    /// Mutable local transform of a node
    pub fn transform_mut(&mut self, entity: Entity) -> Option<hecs::RefMut<'_, Transform>> {
        self.world.get::<&mut Transform>(entity).ok()
    }

    /// World matrix obtained by walking the parent chain
    pub fn world_matrix(&self, entity: Entity) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(entity);
        while let Some(node) = current {
            if let Some(transform) = self.transform(node) {
                matrix = transform.matrix() * matrix;
            }
            current = self.parent(node);
        }
        matrix
    }

    /// Whether a node hangs (directly or not) below the root
    pub fn is_attached(&self, entity: Entity) -> bool {
        let mut current = Some(entity);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Give a node geometry and a material
    pub fn set_mesh(&mut self, entity: Entity, renderer: MeshRenderer) {
        let _ = self.world.insert_one(entity, renderer);
    }

    /// Material of a renderable node
    pub fn material(&self, entity: Entity) -> Option<Material> {
        self.world
            .get::<&MeshRenderer>(entity)
            .ok()
            .map(|r| r.material.clone())
    }

    /// Replace the material of a renderable node; returns false if it has none
    pub fn set_material(&mut self, entity: Entity, material: Material) -> bool {
        match self.world.get::<&mut MeshRenderer>(entity) {
            Ok(mut renderer) => {
                renderer.material = material;
                true
            }
            Err(_) => false,
        }
    }

    /// Set shadow participation of a node
    pub fn set_shadow_flags(&mut self, entity: Entity, flags: ShadowFlags) {
        let _ = self.world.insert_one(entity, flags);
    }

    /// Shadow participation of a node
    pub fn shadow_flags(&self, entity: Entity) -> Option<ShadowFlags> {
        self.world.get::<&ShadowFlags>(entity).ok().map(|f| *f)
    }

    /// Number of nodes including the root
    pub fn len(&self) -> u32 {
        self.world.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Underlying world, for systems that query components directly
    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_child_takes_first_exact_match() {
        let mut graph = SceneGraph::new();
        let room = graph.spawn_node(Some("room"), Transform::default());
        let first = graph.spawn_node(Some("walls"), Transform::default());
        let second = graph.spawn_node(Some("walls"), Transform::default());
        let other = graph.spawn_node(Some("walls.001"), Transform::default());
        graph.add_child(room, other);
        graph.add_child(room, first);
        graph.add_child(room, second);

        assert_eq!(graph.find_child(room, "walls"), Some(first));
        assert_eq!(graph.find_child(room, "wall"), None);
    }

    #[test]
    fn test_world_matrix_follows_parents() {
        let mut graph = SceneGraph::new();
        let parent = graph.spawn_node(None, Transform::from_position(Vec3::new(0.0, -1.0, 0.0)));
        let child = graph.spawn_node(None, Transform::from_position(Vec3::new(2.0, 0.0, 0.0)));
        graph.attach(parent);
        graph.add_child(parent, child);

        let pos = graph.world_matrix(child).transform_point3(Vec3::ZERO);
        assert!((pos - Vec3::new(2.0, -1.0, 0.0)).length() < 1e-5);
        assert!(graph.is_attached(child));
    }

    #[test]
    fn test_remove_despawns_subtree() {
        let mut graph = SceneGraph::new();
        let parent = graph.spawn_node(Some("a"), Transform::default());
        let child = graph.spawn_node(Some("b"), Transform::default());
        graph.attach(parent);
        graph.add_child(parent, child);
        assert_eq!(graph.len(), 3);

        graph.remove(parent);

        assert_eq!(graph.len(), 1);
        assert!(graph.children(graph.root()).is_empty());
    }

    #[test]
    fn test_descendants_depth_first_order() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn_node(Some("a"), Transform::default());
        let b = graph.spawn_node(Some("b"), Transform::default());
        let c = graph.spawn_node(Some("c"), Transform::default());
        graph.add_child(a, b);
        graph.add_child(b, c);
        let d = graph.spawn_node(Some("d"), Transform::default());
        graph.add_child(a, d);

        assert_eq!(graph.descendants(a), vec![a, b, c, d]);
    }
}
