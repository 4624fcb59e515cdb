//! Room model: glTF parsing and named-mesh material assignment

use std::path::Path;

use glam::{Quat, Vec3};
use hecs::Entity;

use super::AssetError;
use crate::core::SceneVariant;
use crate::renderer::{Material, Mesh, TextureKey, Vertex};
use crate::scene::{MeshRenderer, SceneGraph, ShadowFlags, Transform};

/// Names of the room's top-level meshes
pub mod names {
    pub const WALLS: &str = "walls";
    pub const FLOOR: &str = "floor";
    pub const ROOF: &str = "roof";
    pub const FRAME: &str = "frame";
    pub const LIGHT1: &str = "light1";
    pub const LIGHT2: &str = "light2";
}

/// Node of a loaded model, CPU side
#[derive(Debug, Default)]
pub struct ModelNode {
    pub name: Option<String>,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    /// Named node with an optional mesh
    pub fn new(name: impl Into<String>, mesh: Option<Mesh>) -> Self {
        Self {
            name: Some(name.into()),
            mesh,
            ..Self::default()
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }
}

/// Root nodes of the model's default scene
#[derive(Debug, Default)]
pub struct RoomModel {
    pub nodes: Vec<ModelNode>,
}

impl RoomModel {
    /// Parse a `.glb` or `.gltf` file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid glTF
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        Self::from_gltf(gltf::Gltf::open(path)?, path.parent())
    }

    /// Parse an in-memory `.glb` or `.gltf` document
    ///
    /// External buffer URIs are not resolvable here; embedded and `data:`
    /// buffers are.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid glTF
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        Self::from_gltf(gltf::Gltf::from_slice(bytes)?, None)
    }

    fn from_gltf(gltf: gltf::Gltf, base: Option<&Path>) -> Result<Self, AssetError> {
        let buffers = gltf::import_buffers(&gltf.document, base, gltf.blob.clone())?;

        let scene = gltf
            .document
            .default_scene()
            .or_else(|| gltf.document.scenes().next())
            .ok_or_else(|| AssetError::Gltf(String::from("model has no scene")))?;

        let nodes = scene
            .nodes()
            .map(|node| read_node(&node, &buffers))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nodes })
    }

    /// Total number of nodes in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(ModelNode::count).sum()
    }
}

fn read_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> Result<ModelNode, AssetError> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        position: Vec3::from_array(translation),
        rotation: Quat::from_array(rotation),
        scale: Vec3::from_array(scale),
    };

    let mesh = match node.mesh() {
        Some(mesh) => Some(read_mesh(&mesh, buffers)?),
        None => None,
    };

    let children = node
        .children()
        .map(|child| read_node(&child, buffers))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelNode {
        name: node.name().map(str::to_string),
        transform,
        mesh,
        children,
    })
}

/// Merge every primitive of a glTF mesh into one indexed triangle list
fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<Mesh, AssetError> {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| {
                AssetError::Gltf(format!(
                    "mesh '{}' has a primitive without positions",
                    mesh.name().unwrap_or("unnamed")
                ))
            })?
            .collect();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|n| n.collect())
            .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().collect())
            .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

        let base = vertices.len() as u32;
        vertices.extend(
            positions
                .iter()
                .zip(&normals)
                .zip(&uvs)
                .map(|((p, n), uv)| Vertex::new(*p, *n, *uv)),
        );

        match reader.read_indices() {
            Some(read) => indices.extend(read.into_u32().map(|i| base + i)),
            None => indices.extend(base..base + positions.len() as u32),
        }
    }

    Ok(Mesh::from_data(vertices, indices))
}

/// Spawn `model` under a new detached node named `room`
///
/// Only the top level of the returned subtree is relevant for material
/// lookup; deeper nodes are kept for rendering.
pub fn spawn_model(graph: &mut SceneGraph, model: RoomModel) -> Entity {
    let room = graph.spawn_node(Some("room"), Transform::default());
    for node in model.nodes {
        spawn_node_tree(graph, room, node);
    }
    room
}

fn spawn_node_tree(graph: &mut SceneGraph, parent: Entity, node: ModelNode) {
    let entity = graph.spawn_node(node.name.as_deref(), node.transform);
    if let Some(mesh) = node.mesh {
        graph.set_mesh(entity, MeshRenderer::new(mesh, Material::default()));
    }
    graph.add_child(parent, entity);
    for child in node.children {
        spawn_node_tree(graph, entity, child);
    }
}

/// Materials assigned to the room's named meshes in `variant`
pub fn room_materials(variant: SceneVariant) -> Vec<(&'static str, Material)> {
    let mut materials = vec![
        (names::WALLS, Material::white()),
        (names::FLOOR, Material::textured(TextureKey::MARBLE, 0.0)),
        (names::ROOF, Material::white()),
        (names::LIGHT1, Material::emissive(Vec3::ONE)),
        (names::LIGHT2, Material::emissive(Vec3::ONE)),
    ];
    if variant == SceneVariant::Extended {
        materials.push((names::FRAME, Material::black()));
    }
    materials
}

/// Assign materials to the named top-level meshes under `room`
///
/// Every name is resolved before anything is changed, so a missing mesh
/// leaves all materials as they were.
///
/// # Errors
///
/// Returns [`AssetError::MissingMesh`] if a required name has no mesh child
pub fn assign_room_materials(
    graph: &mut SceneGraph,
    room: Entity,
    variant: SceneVariant,
) -> Result<(), AssetError> {
    let resolved = room_materials(variant)
        .into_iter()
        .map(|(name, material)| {
            graph
                .find_child(room, name)
                .filter(|&entity| graph.material(entity).is_some())
                .map(|entity| (entity, material))
                .ok_or_else(|| AssetError::MissingMesh(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (entity, material) in resolved {
        graph.set_material(entity, material);
    }
    Ok(())
}

/// Shadow flags for the whole room subtree: the light fixtures neither cast
/// nor receive, everything else does both
pub fn apply_room_shadows(graph: &mut SceneGraph, room: Entity) {
    for entity in graph.descendants(room) {
        let flags = match graph.name(entity).as_deref() {
            Some(names::LIGHT1 | names::LIGHT2) => ShadowFlags::NONE,
            _ => ShadowFlags::BOTH,
        };
        graph.set_shadow_flags(entity, flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two top-level nodes; `floor` has a child and a mesh of two triangles.
    /// The first primitive is indexed with normals, the second has neither.
    const TWO_PRIMITIVE_ROOM: &str = concat!(
        r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "name": "floor", "mesh": 0, "children": [2] },
            { "name": "walls", "translation": [0.0, 2.0, 0.0] },
            { "name": "trim" }
        ],
        "meshes": [{
            "name": "floor",
            "primitives": [
                { "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 },
                { "attributes": { "POSITION": 3 } }
            ]
        }],
        "buffers": [{
            "byteLength": 116,
            "uri": "data:application/octet-stream;base64,"#,
        "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AAAAAAAA",
        "AAAAAIA/AAAAAAAAAAAAAIA/AAABAAIAAAAAAAAAAAAAAAAAgD8AAIA/AAAAAAAAgD8AAAAA",
        "AACAPwAAgD8=",
        r#""
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 6 },
            { "buffer": 0, "byteOffset": 80, "byteLength": 36 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" },
            {
                "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 1.0], "max": [1.0, 1.0, 1.0]
            }
        ]
    }"#
    );

    #[test]
    fn test_gltf_top_level_nodes() {
        let model = RoomModel::from_slice(TWO_PRIMITIVE_ROOM.as_bytes()).unwrap();

        let names: Vec<_> = model.nodes.iter().map(|n| n.name.as_deref()).collect();
        assert_eq!(names, [Some("floor"), Some("walls")]);
        assert_eq!(model.node_count(), 3);
        assert_eq!(model.nodes[0].children[0].name.as_deref(), Some("trim"));
        assert_eq!(model.nodes[1].transform.position, Vec3::new(0.0, 2.0, 0.0));
        assert!(model.nodes[1].mesh.is_none());
    }

    #[test]
    fn test_gltf_primitives_merge_with_normal_fallback() {
        let model = RoomModel::from_slice(TWO_PRIMITIVE_ROOM.as_bytes()).unwrap();
        let mesh = model.nodes[0].mesh.as_ref().unwrap();

        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.indices, [0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[3].position, [0.0, 0.0, 1.0]);
        assert!(mesh.vertices[3..].iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert!(mesh.vertices.iter().all(|v| v.uv == [0.0, 0.0]));
    }

    #[test]
    fn test_invalid_gltf_is_an_error() {
        assert!(matches!(
            RoomModel::from_slice(b"{ not gltf"),
            Err(AssetError::Gltf(_))
        ));
    }

    fn quad() -> Mesh {
        Mesh::plane(1.0, 1.0, 1, 1)
    }

    fn model(names: &[&str]) -> RoomModel {
        RoomModel {
            nodes: names
                .iter()
                .map(|name| ModelNode::new(*name, Some(quad())))
                .collect(),
        }
    }

    #[test]
    fn test_room_variant_ignores_frame() {
        let mut graph = SceneGraph::new();
        let room = spawn_model(
            &mut graph,
            model(&["walls", "floor", "roof", "light1", "light2"]),
        );

        assign_room_materials(&mut graph, room, SceneVariant::Room).unwrap();

        let floor = graph.find_child(room, "floor").unwrap();
        let material = graph.material(floor).unwrap();
        assert_eq!(material.map, Some(TextureKey::MARBLE));
        assert_eq!(material.roughness, 0.0);
        let light = graph.find_child(room, "light2").unwrap();
        assert_eq!(graph.material(light).unwrap().emissive, Vec3::ONE);
    }

    #[test]
    fn test_extended_variant_paints_frame_black() {
        let mut graph = SceneGraph::new();
        let room = spawn_model(
            &mut graph,
            model(&["walls", "floor", "roof", "frame", "light1", "light2"]),
        );

        assign_room_materials(&mut graph, room, SceneVariant::Extended).unwrap();

        let frame = graph.find_child(room, "frame").unwrap();
        assert_eq!(graph.material(frame).unwrap().color, Vec3::ZERO);
    }

    #[test]
    fn test_missing_frame_is_a_fault_and_changes_nothing() {
        let mut graph = SceneGraph::new();
        let room = spawn_model(
            &mut graph,
            model(&["walls", "floor", "roof", "light1", "light2"]),
        );

        let result = assign_room_materials(&mut graph, room, SceneVariant::Extended);

        assert_eq!(result, Err(AssetError::MissingMesh(String::from("frame"))));
        let floor = graph.find_child(room, "floor").unwrap();
        assert_eq!(graph.material(floor).unwrap().map, None);
    }

    #[test]
    fn test_first_match_wins() {
        let mut graph = SceneGraph::new();
        let room = spawn_model(
            &mut graph,
            model(&["walls", "floor", "floor", "roof", "light1", "light2"]),
        );

        assign_room_materials(&mut graph, room, SceneVariant::Room).unwrap();

        let children = graph.children(room);
        assert_eq!(graph.material(children[1]).unwrap().map, Some(TextureKey::MARBLE));
        assert_eq!(graph.material(children[2]).unwrap().map, None);
    }

    #[test]
    fn test_nested_names_are_not_matched() {
        let mut graph = SceneGraph::new();
        let mut nested = model(&["walls", "roof", "light1", "light2"]);
        nested.nodes[0]
            .children
            .push(ModelNode::new("floor", Some(quad())));
        let room = spawn_model(&mut graph, nested);

        assert_eq!(
            assign_room_materials(&mut graph, room, SceneVariant::Room),
            Err(AssetError::MissingMesh(String::from("floor")))
        );
    }

    #[test]
    fn test_light_fixtures_skip_shadows() {
        let mut graph = SceneGraph::new();
        let room = spawn_model(&mut graph, model(&["walls", "light1"]));

        apply_room_shadows(&mut graph, room);

        let walls = graph.find_child(room, "walls").unwrap();
        let light = graph.find_child(room, "light1").unwrap();
        assert_eq!(graph.shadow_flags(walls), Some(ShadowFlags::BOTH));
        assert_eq!(graph.shadow_flags(light), Some(ShadowFlags::NONE));
        assert_eq!(graph.shadow_flags(room), Some(ShadowFlags::BOTH));
    }
}
