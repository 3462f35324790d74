// SPDX-License-Identifier: MIT OR Apache-2.0
//! Copy/paste through a single scratch file.
//!
//! The file holds the archive version, a [`ClipboardKind`] tag and, for
//! models, the copied nodes with world transforms baked in. Every copy
//! overwrites it.

use crate::archive::{ArchiveError, ArchiveReader, ArchiveWriter};
use crate::entity::EntityKind;
use crate::scene::{ModelData, NodeId, Scene};
use crate::selection::Selection;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Clipboard errors
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Clipboard file could not be written or read
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// What the clipboard holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardKind {
    /// Serialized model
    Model,
    /// Nothing
    Empty,
}

impl ClipboardKind {
    fn tag(self) -> u8 {
        match self {
            Self::Model => 0,
            Self::Empty => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, ArchiveError> {
        match tag {
            0 => Ok(Self::Model),
            1 => Ok(Self::Empty),
            value => Err(ArchiveError::InvalidTag {
                what: "clipboard kind",
                value,
            }),
        }
    }
}

/// Scratch-file clipboard
#[derive(Debug, Clone)]
pub struct Clipboard {
    path: PathBuf,
}

impl Clipboard {
    /// Clipboard backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the selected objects, lights and decals. Returns the number of
    /// copied nodes; copying nothing writes an empty clipboard.
    pub fn copy(&self, scene: &Scene, selection: &Selection) -> Result<usize, ClipboardError> {
        let ids: Vec<NodeId> = selection
            .iter()
            .filter_map(|entity| match entity.kind {
                EntityKind::Object(id) | EntityKind::Light(id) | EntityKind::Decal(id) => Some(id),
                _ => None,
            })
            .collect();
        let model = scene.extract(&ids);

        let mut archive = ArchiveWriter::new();
        if model.nodes.is_empty() {
            archive.write(&ClipboardKind::Empty.tag())?;
        } else {
            archive.write(&ClipboardKind::Model.tag())?;
            archive.write(&model)?;
        }
        archive.save(&self.path)?;
        tracing::info!("Copied {} nodes to clipboard", model.nodes.len());
        Ok(model.nodes.len())
    }

    /// Instantiate the clipboard contents under fresh IDs. A missing
    /// clipboard file pastes nothing.
    pub fn paste(&self, scene: &mut Scene) -> Result<Vec<NodeId>, ClipboardError> {
        if !self.path.exists() {
            tracing::debug!("Clipboard file {:?} does not exist", self.path);
            return Ok(Vec::new());
        }
        let mut archive = ArchiveReader::open(&self.path)?;
        match ClipboardKind::from_tag(archive.read()?)? {
            ClipboardKind::Empty => Ok(Vec::new()),
            ClipboardKind::Model => {
                let model: ModelData = archive.read()?;
                let ids = scene.instantiate(model);
                tracing::info!("Pasted {} nodes", ids.len());
                Ok(ids)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::scene::components::{Light, Material, Mesh, Object};
    use crate::scene::NodeKind;
    use glam::Vec3;

    #[test]
    fn test_copy_paste_creates_fresh_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let clipboard = Clipboard::new(dir.path().join("clipboard"));

        let mut scene = Scene::new();
        let group = scene.spawn("Group", NodeKind::Empty, Transform::from_translation(Vec3::Y));
        let cube = scene.spawn_child(
            group,
            "Cube",
            NodeKind::Object(Object::new(Mesh::cube("Cube", 1.0, Material::default()))),
            Transform::from_translation(Vec3::X),
        );
        let lamp = scene.spawn("Lamp", NodeKind::Light(Light::default()), Transform::IDENTITY);

        let mut selection = Selection::new();
        selection.add(scene.entity_ref(cube, 0).unwrap(), &scene);
        selection.add(scene.entity_ref(lamp, 0).unwrap(), &scene);
        selection.add(scene.entity_ref(group, 0).unwrap(), &scene);
        assert_eq!(clipboard.copy(&scene, &selection).unwrap(), 2);

        let pasted = clipboard.paste(&mut scene).unwrap();
        assert_eq!(pasted.len(), 2);
        assert!(!pasted.contains(&cube));
        assert_eq!(scene.parent_of(pasted[0]), None);
        assert!(scene.world_translation(pasted[0]).abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert!(scene.object(pasted[0]).unwrap().mesh.render_data().is_some());

        // Pasting twice gives two independent copies
        let again = clipboard.paste(&mut scene).unwrap();
        assert!(again.iter().all(|id| !pasted.contains(id)));
        assert_eq!(scene.len(), 7);
    }

    #[test]
    fn test_missing_or_empty_clipboard() {
        let dir = tempfile::tempdir().unwrap();
        let clipboard = Clipboard::new(dir.path().join("clipboard"));
        let mut scene = Scene::new();
        assert!(clipboard.paste(&mut scene).unwrap().is_empty());

        assert_eq!(clipboard.copy(&scene, &Selection::new()).unwrap(), 0);
        assert!(clipboard.path().exists());
        assert!(clipboard.paste(&mut scene).unwrap().is_empty());
    }
}
