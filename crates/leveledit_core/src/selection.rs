// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection set.
//!
//! Keeps the selected entities in pick order together with the parent each
//! selected transform had when it was selected. The gizmo uses those saved
//! parents to put transforms back after a group edit.

use crate::entity::EntityRef;
use crate::scene::{NodeId, Scene};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Direction in which a recorded change is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Revert the change
    Undo,
    /// Apply the change
    Redo,
}

/// A selection mutation with enough data to invert it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionChange {
    /// Entity added to the selection
    Add {
        /// Added entity
        entity: EntityRef,
    },
    /// Entity removed from the selection
    Remove {
        /// Removed entity
        entity: EntityRef,
    },
    /// Selection cleared, then optionally one entity selected
    Replace {
        /// Selection before the change, in order
        previous: Vec<EntityRef>,
        /// Newly selected entity
        current: Option<EntityRef>,
    },
}

impl SelectionChange {
    /// Short description for logs
    pub fn describe(&self) -> String {
        let id = |e: &EntityRef| e.id().map_or_else(|| "-".to_string(), |id| id.to_string());
        match self {
            Self::Add { entity } => format!("Select {}", id(entity)),
            Self::Remove { entity } => format!("Deselect {}", id(entity)),
            Self::Replace { current: Some(entity), .. } => format!("Select only {}", id(entity)),
            Self::Replace { current: None, .. } => "Clear selection".to_string(),
        }
    }
}

/// Entity selection state
#[derive(Debug, Clone, Default)]
pub struct Selection {
    entries: Vec<EntityRef>,
    saved_parents: IndexMap<NodeId, Option<NodeId>>,
}

impl Selection {
    /// Create a new empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an entity is selected
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.iter().any(|e| e.id() == Some(id))
    }

    /// Get the selected entity with the given identity
    pub fn get(&self, id: NodeId) -> Option<&EntityRef> {
        self.entries.iter().find(|e| e.id() == Some(id))
    }

    /// Add an entity, recording its transform's current parent.
    /// Idempotent; empty references are ignored.
    pub fn add(&mut self, entity: EntityRef, scene: &Scene) {
        let Some(id) = entity.id() else {
            return;
        };
        if self.contains(id) {
            return;
        }
        if let Some(transform) = entity.transform {
            self.saved_parents
                .entry(transform)
                .or_insert_with(|| scene.parent_of(transform));
        }
        self.entries.push(entity);
    }

    /// Remove an entity. The saved parent is dropped unless another entry
    /// still shares the transform.
    pub fn remove(&mut self, id: NodeId) -> Option<EntityRef> {
        let index = self.entries.iter().position(|e| e.id() == Some(id))?;
        let entity = self.entries.remove(index);
        if let Some(transform) = entity.transform {
            if !self.entries.iter().any(|e| e.transform == Some(transform)) {
                self.saved_parents.shift_remove(&transform);
            }
        }
        Some(entity)
    }

    /// Clear the selection and every saved parent
    pub fn clear(&mut self) {
        self.entries.clear();
        self.saved_parents.clear();
    }

    /// Check if the selection is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the number of selected entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over selected entities in pick order
    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.entries.iter()
    }

    /// Get the primary (last picked) entity
    pub fn primary(&self) -> Option<&EntityRef> {
        self.entries.last()
    }

    /// Distinct transforms of the selection, in pick order
    pub fn transforms(&self) -> Vec<NodeId> {
        let mut transforms: Vec<NodeId> = Vec::new();
        for transform in self.entries.iter().filter_map(|e| e.transform) {
            if !transforms.contains(&transform) {
                transforms.push(transform);
            }
        }
        transforms
    }

    /// Whether any selected entity has a transform
    pub fn has_transform(&self) -> bool {
        self.entries.iter().any(|e| e.transform.is_some())
    }

    /// Parent recorded when `transform` was selected. The outer `None`
    /// means no record exists, the inner `None` means the scene root.
    pub fn saved_parent(&self, transform: NodeId) -> Option<Option<NodeId>> {
        self.saved_parents.get(&transform).copied()
    }

    /// Work out what picking `entity` does without mutating anything.
    ///
    /// With `multi` held on a non-empty selection the entity is toggled;
    /// otherwise the selection is replaced. Returns `None` when nothing
    /// would change.
    pub fn plan(&self, entity: &EntityRef, multi: bool) -> Option<SelectionChange> {
        if multi && !self.is_empty() {
            let id = entity.id()?;
            return Some(match self.get(id) {
                Some(existing) => SelectionChange::Remove { entity: *existing },
                None => SelectionChange::Add { entity: *entity },
            });
        }

        let current = entity.id().map(|_| *entity);
        if self.is_empty() && current.is_none() {
            return None;
        }
        Some(SelectionChange::Replace {
            previous: self.entries.clone(),
            current,
        })
    }

    /// Apply a change forwards (redo) or backwards (undo). Entities whose
    /// nodes no longer exist are skipped.
    pub fn apply(&mut self, change: &SelectionChange, direction: Direction, scene: &Scene) {
        let live = |entity: &EntityRef| entity.id().is_some_and(|id| scene.contains(id));
        match (change, direction) {
            (SelectionChange::Add { entity }, Direction::Redo)
            | (SelectionChange::Remove { entity }, Direction::Undo) => {
                if live(entity) {
                    self.add(*entity, scene);
                }
            }
            (SelectionChange::Add { entity }, Direction::Undo)
            | (SelectionChange::Remove { entity }, Direction::Redo) => {
                if let Some(id) = entity.id() {
                    self.remove(id);
                }
            }
            (SelectionChange::Replace { current, .. }, Direction::Redo) => {
                self.clear();
                if let Some(entity) = current.filter(|e| live(e)) {
                    self.add(entity, scene);
                }
            }
            (SelectionChange::Replace { previous, .. }, Direction::Undo) => {
                self.clear();
                for entity in previous.iter().filter(|e| live(e)) {
                    self.add(*entity, scene);
                }
            }
        }
    }

    /// Pick an entity: plan the change and apply it. Returns the applied
    /// change so the caller can record it.
    pub fn pick(&mut self, entity: &EntityRef, multi: bool, scene: &Scene) -> Option<SelectionChange> {
        let change = self.plan(entity, multi)?;
        self.apply(&change, Direction::Redo, scene);
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::scene::NodeKind;

    fn scene_with_nodes() -> (Scene, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new();
        let group = scene.spawn("Group", NodeKind::Empty, Transform::IDENTITY);
        let a = scene.spawn_child(group, "A", NodeKind::Empty, Transform::IDENTITY);
        let b = scene.spawn("B", NodeKind::Empty, Transform::IDENTITY);
        (scene, group, a, b)
    }

    fn entity(scene: &Scene, id: NodeId) -> EntityRef {
        scene.entity_ref(id, 0).unwrap()
    }

    #[test]
    fn test_pick_records_saved_parent() {
        let (scene, group, a, b) = scene_with_nodes();
        let mut selection = Selection::new();

        selection.pick(&entity(&scene, a), false, &scene);
        selection.pick(&entity(&scene, b), true, &scene);

        assert_eq!(selection.len(), 2);
        assert_eq!(selection.saved_parent(a), Some(Some(group)));
        assert_eq!(selection.saved_parent(b), Some(None));
    }

    #[test]
    fn test_multi_pick_toggles() {
        let (scene, _, a, b) = scene_with_nodes();
        let mut selection = Selection::new();
        selection.pick(&entity(&scene, a), false, &scene);
        selection.pick(&entity(&scene, b), true, &scene);

        let change = selection.pick(&entity(&scene, a), true, &scene);
        assert!(matches!(change, Some(SelectionChange::Remove { .. })));
        assert!(!selection.contains(a));
        assert_eq!(selection.saved_parent(a), None);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_plain_pick_replaces() {
        let (scene, _, a, b) = scene_with_nodes();
        let mut selection = Selection::new();
        selection.pick(&entity(&scene, a), false, &scene);
        selection.pick(&entity(&scene, b), true, &scene);

        selection.pick(&entity(&scene, a), false, &scene);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(a));
        assert_eq!(selection.saved_parent(b), None);
    }

    #[test]
    fn test_empty_pick() {
        let (scene, _, a, _) = scene_with_nodes();
        let mut selection = Selection::new();
        assert!(selection.pick(&EntityRef::NONE, false, &scene).is_none());

        selection.pick(&entity(&scene, a), false, &scene);
        assert!(selection.plan(&EntityRef::NONE, true).is_none());
        let change = selection.pick(&EntityRef::NONE, false, &scene);
        assert!(matches!(change, Some(SelectionChange::Replace { current: None, .. })));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_apply_inverts_changes() {
        let (scene, _, a, b) = scene_with_nodes();
        let mut selection = Selection::new();
        let first = selection.pick(&entity(&scene, a), false, &scene).unwrap();
        let second = selection.pick(&entity(&scene, b), true, &scene).unwrap();
        let third = selection.pick(&entity(&scene, b), false, &scene).unwrap();

        selection.apply(&third, Direction::Undo, &scene);
        assert_eq!(selection.len(), 2);
        selection.apply(&second, Direction::Undo, &scene);
        assert_eq!(selection.iter().filter_map(EntityRef::id).collect::<Vec<_>>(), vec![a]);
        selection.apply(&first, Direction::Undo, &scene);
        assert!(selection.is_empty());

        selection.apply(&first, Direction::Redo, &scene);
        selection.apply(&second, Direction::Redo, &scene);
        selection.apply(&third, Direction::Redo, &scene);
        assert_eq!(selection.iter().filter_map(EntityRef::id).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_shared_transform_keeps_saved_parent() {
        let mut scene = Scene::new();
        let armature = scene.spawn("Armature", NodeKind::Armature(Default::default()), Transform::IDENTITY);
        let a = scene.spawn("A", NodeKind::Empty, Transform::IDENTITY);
        let b = scene.spawn("B", NodeKind::Empty, Transform::IDENTITY);
        let with_armature = |id| EntityRef {
            transform: Some(armature),
            ..scene.entity_ref(id, 0).unwrap()
        };

        let mut selection = Selection::new();
        selection.add(with_armature(a), &scene);
        selection.add(with_armature(b), &scene);
        assert_eq!(selection.transforms(), vec![armature]);

        selection.remove(a);
        assert_eq!(selection.saved_parent(armature), Some(None));
        selection.remove(b);
        assert_eq!(selection.saved_parent(armature), None);
    }
}
