// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory scene graph.
//!
//! Nodes live in an insertion-ordered arena keyed by stable [`NodeId`]s.
//! Parent links compose transforms: a node's world matrix is its parent's
//! world matrix times its local transform. Reparenting through
//! [`Scene::attach`] and [`Scene::detach`] keeps world transforms intact.

pub mod components;

use crate::entity::{EntityKind, EntityRef};
use crate::math::{Aabb, Transform};
use components::{Armature, Decal, EnvProbe, Light, Object};
use glam::{Mat4, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Stable node identifier; survives serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload of a scene node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// Plain transform (group)
    #[default]
    Empty,
    /// Renderable object
    Object(Object),
    /// Light source
    Light(Light),
    /// Projected decal
    Decal(Decal),
    /// Environment probe
    EnvProbe(EnvProbe),
    /// Skeleton root
    Armature(Armature),
    /// Editor gizmo proxy
    Gizmo,
}

impl NodeKind {
    /// Editor-only nodes that are never saved or picked
    pub fn is_helper(&self) -> bool {
        matches!(self, Self::Gizmo)
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Object(_) => "Object",
            Self::Light(_) => "Light",
            Self::Decal(_) => "Decal",
            Self::EnvProbe(_) => "EnvProbe",
            Self::Armature(_) => "Armature",
            Self::Gizmo => "Gizmo",
        }
    }
}

/// A scene node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Transform relative to the parent
    pub local: Transform,
    /// Parent node, `None` for the scene root
    pub parent: Option<NodeId>,
    /// Child nodes
    pub children: Vec<NodeId>,
    /// Payload
    pub kind: NodeKind,
}

impl Node {
    /// Root-level node with a fresh ID
    pub fn new(name: impl Into<String>, kind: NodeKind, local: Transform) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            local,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }
}

/// Serializable set of nodes with internal parent links, used for the
/// clipboard and for model files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelData {
    /// Nodes; parents outside the set are dropped on instantiation
    pub nodes: Vec<Node>,
}

impl ModelData {
    /// Parse a model from RON
    pub fn from_ron(source: &str) -> Result<Self, SceneError> {
        Ok(ron::from_str(source)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, SceneError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}

/// Scene load/save errors
#[derive(Debug, Error)]
pub enum SceneError {
    /// File read/write error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Deserialization error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// On-disk layout of a scene
#[derive(Serialize, Deserialize)]
struct SceneFile {
    nodes: Vec<Node>,
}

/// Scene graph
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: IndexMap<NodeId, Node>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root-level node
    pub fn spawn(&mut self, name: impl Into<String>, kind: NodeKind, local: Transform) -> NodeId {
        let node = Node::new(name, kind, local);
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Add a node under `parent` with a transform relative to it
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        local: Transform,
    ) -> NodeId {
        let mut node = Node::new(name, kind, local);
        node.parent = self.nodes.contains_key(&parent).then_some(parent);
        let id = node.id;
        self.insert(node);
        id
    }

    /// Insert a node keeping its ID. Links it into its parent's children
    /// when the parent exists, otherwise it becomes a root node. Returns
    /// false if the ID is already taken.
    pub fn insert(&mut self, mut node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        let id = node.id;
        node.children.retain(|c| self.nodes.contains_key(c));
        match node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent) => {
                if !parent.children.contains(&id) {
                    parent.children.push(id);
                }
            }
            None => node.parent = None,
        }
        self.nodes.insert(id, node);
        true
    }

    /// Remove a node. Its children move to the removed node's parent with
    /// their world transforms unchanged.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let children = self.nodes.get(&id)?.children.clone();
        let grandparent = self.parent_of(id);
        for child in children {
            self.attach(child, grandparent);
        }
        self.detach(id);
        self.nodes.shift_remove(&id)
    }

    /// Get a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a node mutably
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Whether the node exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Node count, helpers included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Find the first node with the given name
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.values().find(|n| n.name == name).map(|n| n.id)
    }

    /// Parent of a node (`None` for root nodes and unknown IDs)
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Whether `ancestor` is `id` or one of its parents
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// World matrix of a node
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.nodes.get(&id);
        let mut steps = 0;
        while let Some(node) = current {
            matrix = node.local.matrix() * matrix;
            steps += 1;
            if steps > self.nodes.len() {
                tracing::warn!("Parent cycle detected at node {}", id);
                break;
            }
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        matrix
    }

    /// World transform of a node
    pub fn world_transform(&self, id: NodeId) -> Transform {
        Transform::from_matrix(self.world_matrix(id))
    }

    /// World position of a node
    pub fn world_translation(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id).w_axis.truncate()
    }

    /// Set the local transform
    pub fn set_local(&mut self, id: NodeId, local: Transform) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local = local;
        }
    }

    /// Set the world transform, expressing it relative to the parent
    pub fn set_world_matrix(&mut self, id: NodeId, world: Mat4) {
        let parent_world = self
            .parent_of(id)
            .map_or(Mat4::IDENTITY, |p| self.world_matrix(p));
        self.set_local(id, Transform::from_matrix(parent_world.inverse() * world));
    }

    /// Reparent `child` under `parent` (`None` = root), keeping its world
    /// transform. Refuses to create cycles.
    pub fn attach(&mut self, child: NodeId, parent: Option<NodeId>) -> bool {
        if !self.contains(child) {
            return false;
        }
        if let Some(parent) = parent {
            if !self.contains(parent) || self.is_ancestor(child, parent) {
                tracing::warn!("Refusing to attach {} to {}", child, parent);
                return false;
            }
        }

        let world = self.world_matrix(child);
        self.unlink(child);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.push(child);
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
        }
        self.set_world_matrix(child, world);
        true
    }

    /// Move a node to the root, baking its world transform into its local
    pub fn detach(&mut self, id: NodeId) {
        if self.parent_of(id).is_some() {
            self.attach(id, None);
        }
    }

    fn unlink(&mut self, child: NodeId) {
        if let Some(parent) = self.parent_of(child) {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != child);
            }
        }
    }

    /// World-space bounds of a node
    pub fn bounds(&self, id: NodeId) -> Option<Aabb> {
        let node = self.nodes.get(&id)?;
        let world = self.world_matrix(id);
        let unit = Aabb::from_center(Vec3::ZERO, Vec3::splat(0.5));
        let local = match &node.kind {
            NodeKind::Object(object) => object.mesh.bounds(),
            NodeKind::Decal(_) | NodeKind::Light(_) | NodeKind::EnvProbe(_) => unit,
            NodeKind::Empty | NodeKind::Armature(_) | NodeKind::Gizmo => {
                let center = world.w_axis.truncate();
                return Some(Aabb::from_center(center, Vec3::splat(0.5)));
            }
        };
        Some(local.transformed(&world))
    }

    /// Build the entity reference for a node. Armature deformed objects
    /// hand their transform role to the armature.
    pub fn entity_ref(&self, id: NodeId, subset: usize) -> Option<EntityRef> {
        let node = self.nodes.get(&id)?;
        let (kind, transform) = match &node.kind {
            NodeKind::Object(object) => {
                let transform = object
                    .mesh
                    .armature
                    .filter(|a| self.contains(*a))
                    .unwrap_or(id);
                (EntityKind::Object(id), transform)
            }
            NodeKind::Light(_) => (EntityKind::Light(id), id),
            NodeKind::Decal(_) => (EntityKind::Decal(id), id),
            NodeKind::EnvProbe(_) => (EntityKind::EnvProbe(id), id),
            NodeKind::Empty | NodeKind::Armature(_) => (EntityKind::Node(id), id),
            NodeKind::Gizmo => return None,
        };
        Some(EntityRef {
            kind,
            transform: Some(transform),
            subset,
        })
    }

    /// Object payload of a node
    pub fn object(&self, id: NodeId) -> Option<&Object> {
        match &self.nodes.get(&id)?.kind {
            NodeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Object payload of a node, mutably
    pub fn object_mut(&mut self, id: NodeId) -> Option<&mut Object> {
        match &mut self.nodes.get_mut(&id)?.kind {
            NodeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Light payload of a node, mutably
    pub fn light_mut(&mut self, id: NodeId) -> Option<&mut Light> {
        match &mut self.nodes.get_mut(&id)?.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Decal payload of a node, mutably
    pub fn decal_mut(&mut self, id: NodeId) -> Option<&mut Decal> {
        match &mut self.nodes.get_mut(&id)?.kind {
            NodeKind::Decal(decal) => Some(decal),
            _ => None,
        }
    }

    /// Snapshot nodes as a root-level model with world transforms baked
    pub fn extract(&self, ids: &[NodeId]) -> ModelData {
        let nodes = ids
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|node| Node {
                local: self.world_transform(node.id),
                parent: None,
                children: Vec::new(),
                ..node.clone()
            })
            .collect();
        ModelData { nodes }
    }

    /// Insert a model under fresh IDs. Parent links inside the model are
    /// remapped; links to nodes outside it are dropped.
    pub fn instantiate(&mut self, model: ModelData) -> Vec<NodeId> {
        let mapping: HashMap<NodeId, NodeId> =
            model.nodes.iter().map(|n| (n.id, NodeId::new())).collect();

        let mut ids = Vec::with_capacity(model.nodes.len());
        let mut pending = Vec::new();
        for mut node in model.nodes {
            let old_parent = node.parent.take();
            node.id = mapping[&node.id];
            node.children.clear();
            if let NodeKind::Object(object) = &mut node.kind {
                if let Some(armature) = object.mesh.armature {
                    object.mesh.armature = Some(mapping.get(&armature).copied().unwrap_or(armature));
                }
                object.mesh.create_render_data();
            }
            ids.push(node.id);
            if let Some(parent) = old_parent.and_then(|p| mapping.get(&p)) {
                pending.push((node.id, *parent, node.local));
            }
            self.nodes.insert(node.id, node);
        }

        // Local transforms in the model are already parent-relative
        for (child, parent, local) in pending {
            if self.attach(child, Some(parent)) {
                self.set_local(child, local);
            }
        }
        ids
    }

    /// Rebuild derived mesh data for every object
    pub fn rebuild_render_data(&mut self) {
        for node in self.nodes.values_mut() {
            if let NodeKind::Object(object) = &mut node.kind {
                object.mesh.create_render_data();
            }
        }
    }

    /// Load a scene from a RON file
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path)?;
        let file: SceneFile = ron::from_str(&content)?;
        let mut scene = Scene::new();
        scene.nodes = file.nodes.into_iter().map(|n| (n.id, n)).collect();
        scene.rebuild_render_data();
        tracing::info!("Loaded scene from {:?} ({} nodes)", path, scene.len());
        Ok(scene)
    }

    /// Save the scene to a RON file, leaving out editor helper nodes
    pub fn save(&self, path: &Path) -> Result<(), SceneError> {
        let mut saved = SceneFile { nodes: Vec::new() };
        for node in self.nodes.values().filter(|n| !n.kind.is_helper()) {
            let mut node = node.clone();
            node.children.retain(|c| self.get(*c).is_some_and(|n| !n.kind.is_helper()));
            if node.parent.and_then(|p| self.get(p)).is_some_and(|p| p.kind.is_helper()) {
                node.local = self.world_transform(node.id);
                node.parent = None;
            }
            saved.nodes.push(node);
        }
        let ron_str = ron::ser::to_string_pretty(&saved, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, ron_str)?;
        tracing::info!("Saved scene to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::components::{Material, Mesh};
    use super::*;
    use glam::Quat;

    #[test]
    fn test_attach_keeps_world_transform() {
        let mut scene = Scene::new();
        let parent = scene.spawn(
            "Parent",
            NodeKind::Empty,
            Transform {
                translation: Vec3::new(10.0, 0.0, 0.0),
                rotation: Quat::from_rotation_y(1.0),
                scale: Vec3::splat(2.0),
            },
        );
        let child = scene.spawn(
            "Child",
            NodeKind::Empty,
            Transform::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        );

        assert!(scene.attach(child, Some(parent)));
        assert_eq!(scene.parent_of(child), Some(parent));
        assert!(scene.world_translation(child).abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-4));

        scene.detach(child);
        assert_eq!(scene.parent_of(child), None);
        assert!(scene.get(parent).unwrap().children.is_empty());
        assert!(scene.world_translation(child).abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-4));
    }

    #[test]
    fn test_attach_refuses_cycles() {
        let mut scene = Scene::new();
        let a = scene.spawn("A", NodeKind::Empty, Transform::IDENTITY);
        let b = scene.spawn_child(a, "B", NodeKind::Empty, Transform::IDENTITY);
        assert!(!scene.attach(a, Some(b)));
        assert!(!scene.attach(a, Some(a)));
        assert_eq!(scene.parent_of(b), Some(a));
    }

    #[test]
    fn test_remove_reparents_children() {
        let mut scene = Scene::new();
        let root = scene.spawn("Root", NodeKind::Empty, Transform::from_translation(Vec3::X));
        let mid = scene.spawn_child(root, "Mid", NodeKind::Empty, Transform::from_translation(Vec3::Y));
        let leaf = scene.spawn_child(mid, "Leaf", NodeKind::Empty, Transform::from_translation(Vec3::Z));

        let removed = scene.remove(mid).unwrap();
        assert_eq!(removed.name, "Mid");
        assert_eq!(scene.parent_of(leaf), Some(root));
        assert!(scene.world_translation(leaf).abs_diff_eq(Vec3::new(1.0, 1.0, 1.0), 1e-5));
        assert!(!scene.contains(mid));
    }

    #[test]
    fn test_armature_redirect() {
        let mut scene = Scene::new();
        let armature = scene.spawn("Skeleton", NodeKind::Armature(Default::default()), Transform::IDENTITY);
        let mut mesh = Mesh::cube("Body", 1.0, Material::default());
        mesh.armature = Some(armature);
        let body = scene.spawn_child(armature, "Body", NodeKind::Object(Object::new(mesh)), Transform::IDENTITY);

        let entity = scene.entity_ref(body, 0).unwrap();
        assert_eq!(entity.id(), Some(body));
        assert_eq!(entity.transform, Some(armature));
    }

    #[test]
    fn test_instantiate_remaps_ids() {
        let mut scene = Scene::new();
        let parent = scene.spawn("Parent", NodeKind::Empty, Transform::from_translation(Vec3::X));
        let child = scene.spawn_child(parent, "Child", NodeKind::Light(Light::default()), Transform::from_translation(Vec3::Y));

        let mut model = ModelData::default();
        model.nodes.push(scene.get(parent).unwrap().clone());
        model.nodes.push(scene.get(child).unwrap().clone());

        let ids = scene.instantiate(model);
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&parent) && !ids.contains(&child));
        assert_eq!(scene.parent_of(ids[1]), Some(ids[0]));
        assert!(scene.world_translation(ids[1]).abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert_eq!(scene.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.ron");

        let mut scene = Scene::new();
        let cube = scene.spawn(
            "Cube",
            NodeKind::Object(Object::new(Mesh::cube("Cube", 1.0, Material::default()))),
            Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
        );
        let gizmo = scene.spawn("Gizmo", NodeKind::Gizmo, Transform::IDENTITY);
        scene.attach(cube, Some(gizmo));
        scene.save(&path).unwrap();

        let loaded = Scene::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.parent_of(cube), None);
        assert!(loaded.world_translation(cube).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(loaded.object(cube).unwrap().mesh.render_data().is_some());
    }
}
