// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recorded editor operations.
//!
//! Each command knows its history kind, how to write its payload and how
//! to apply itself in either direction against an [`EditContext`].

use crate::archive::{self, ArchiveError, ArchiveReader, ArchiveWriter};
use crate::history::{HistoryEntry, HistoryError, HistoryKind};
use crate::math::Transform;
use crate::scene::components::{Decal, Light, Object};
use crate::scene::{Node, NodeId, NodeKind, Scene};
use crate::selection::{Direction, Selection, SelectionChange};
use crate::session::EditContext;
use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Trait for operations that can be recorded and undone/redone
pub trait EditorCommand {
    /// History kind written in front of the payload
    fn kind(&self) -> HistoryKind;

    /// Get a description of this command
    fn description(&self) -> String;

    /// Append the payload
    fn write(&self, archive: &mut ArchiveWriter) -> archive::Result<()>;

    /// Apply forwards (redo) or backwards (undo)
    fn apply(&self, ctx: &mut EditContext, direction: Direction) -> Result<(), CommandError>;
}

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Payload could not be encoded or decoded
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Selection change
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCommand {
    /// The change, with enough data to invert it
    pub change: SelectionChange,
}

impl SelectionCommand {
    /// Wrap a planned change
    pub fn new(change: SelectionChange) -> Self {
        Self { change }
    }

    fn read(archive: &mut ArchiveReader) -> archive::Result<Self> {
        Ok(Self {
            change: archive.read()?,
        })
    }
}

impl EditorCommand for SelectionCommand {
    fn kind(&self) -> HistoryKind {
        HistoryKind::Selection
    }

    fn description(&self) -> String {
        self.change.describe()
    }

    fn write(&self, archive: &mut ArchiveWriter) -> archive::Result<()> {
        archive.write(&self.change)
    }

    fn apply(&self, ctx: &mut EditContext, direction: Direction) -> Result<(), CommandError> {
        ctx.release_gizmo();
        ctx.selection.apply(&self.change, direction, &ctx.scene);
        ctx.bind_gizmo();
        Ok(())
    }
}

/// Finished gizmo drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformCommand {
    /// Gizmo world matrix when the drag started
    pub start: Mat4,
    /// Gizmo world matrix when the drag ended
    pub end: Mat4,
}

impl TransformCommand {
    /// Create a transform command from drag matrices
    pub fn new(start: Mat4, end: Mat4) -> Self {
        Self { start, end }
    }

    fn read(archive: &mut ArchiveReader) -> archive::Result<Self> {
        let start = archive.read()?;
        let end = archive.read()?;
        Ok(Self { start, end })
    }

    /// World-space change to apply in the given direction
    pub fn world_delta(&self, direction: Direction) -> Mat4 {
        match direction {
            Direction::Undo => self.start * self.end.inverse(),
            Direction::Redo => self.end * self.start.inverse(),
        }
    }
}

impl EditorCommand for TransformCommand {
    fn kind(&self) -> HistoryKind {
        HistoryKind::Transform
    }

    fn description(&self) -> String {
        let offset = self.end.w_axis.truncate() - self.start.w_axis.truncate();
        format!("Transform by {offset:?}")
    }

    fn write(&self, archive: &mut ArchiveWriter) -> archive::Result<()> {
        archive.write(&self.start)?;
        archive.write(&self.end)
    }

    fn apply(&self, ctx: &mut EditContext, direction: Direction) -> Result<(), CommandError> {
        let delta = self.world_delta(direction);
        if !delta.is_finite() {
            return Err(CommandError::InvalidOperation(
                "transform entry holds a singular matrix".to_string(),
            ));
        }
        if !ctx.bind_gizmo() {
            tracing::warn!("Transform entry skipped: nothing selected to move");
            return Ok(());
        }
        ctx.gizmo.apply_world_delta(&mut ctx.scene, delta);
        Ok(())
    }
}

/// Node data shared by every deleted entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Original ID
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// World matrix at deletion time
    pub world: Mat4,
    /// Parent at deletion time
    pub parent: Option<NodeId>,
    /// Children at deletion time
    pub children: Vec<NodeId>,
}

impl NodeRecord {
    fn capture(scene: &Scene, node: &Node) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            world: scene.world_matrix(node.id),
            parent: node.parent,
            children: node.children.clone(),
        }
    }
}

/// Everything needed to bring one deleted entity back
#[derive(Debug, Clone)]
pub struct DeletedEntity {
    /// Node record
    pub node: NodeRecord,
    /// Object payload
    pub object: Option<Object>,
    /// Light payload
    pub light: Option<Light>,
    /// Decal payload
    pub decal: Option<Decal>,
    /// Payload of any other transform node
    pub other: Option<NodeKind>,
}

impl DeletedEntity {
    /// Capture a node; helper nodes are refused
    pub fn capture(scene: &Scene, id: NodeId) -> Option<Self> {
        let node = scene.get(id)?;
        let mut entity = Self {
            node: NodeRecord::capture(scene, node),
            object: None,
            light: None,
            decal: None,
            other: None,
        };
        match &node.kind {
            NodeKind::Object(object) => entity.object = Some(object.clone()),
            NodeKind::Light(light) => entity.light = Some(light.clone()),
            NodeKind::Decal(decal) => entity.decal = Some(decal.clone()),
            NodeKind::Gizmo => return None,
            other => entity.other = Some(other.clone()),
        }
        Some(entity)
    }

    /// Append presence flags followed by each present payload
    pub fn write(&self, archive: &mut ArchiveWriter) -> archive::Result<()> {
        archive.write(&self.node)?;

        archive.write(&self.object.is_some())?;
        if let Some(object) = &self.object {
            object.write_archive(archive)?;
        }
        archive.write(&self.light.is_some())?;
        if let Some(light) = &self.light {
            archive.write(light)?;
        }
        archive.write(&self.decal.is_some())?;
        if let Some(decal) = &self.decal {
            archive.write(decal)?;
        }
        archive.write(&self.other.is_some())?;
        if let Some(other) = &self.other {
            archive.write(other)?;
        }
        Ok(())
    }

    /// Read back what [`DeletedEntity::write`] wrote
    pub fn read(archive: &mut ArchiveReader) -> archive::Result<Self> {
        let node = archive.read()?;
        let object = if archive.read::<bool>()? {
            Some(Object::read_archive(archive)?)
        } else {
            None
        };
        let light = if archive.read::<bool>()? {
            Some(archive.read()?)
        } else {
            None
        };
        let decal = if archive.read::<bool>()? {
            Some(archive.read()?)
        } else {
            None
        };
        let other = if archive.read::<bool>()? {
            Some(archive.read()?)
        } else {
            None
        };
        Ok(Self {
            node,
            object,
            light,
            decal,
            other,
        })
    }

    fn node_kind(&self) -> NodeKind {
        if let Some(object) = &self.object {
            NodeKind::Object(object.clone())
        } else if let Some(light) = &self.light {
            NodeKind::Light(light.clone())
        } else if let Some(decal) = &self.decal {
            NodeKind::Decal(decal.clone())
        } else {
            self.other.clone().unwrap_or_default()
        }
    }

    /// Reinsert under the original ID, parent and world transform, then
    /// re-adopt children that still exist. Returns false on an ID clash.
    pub fn restore(&self, scene: &mut Scene) -> bool {
        let node = Node {
            id: self.node.id,
            name: self.node.name.clone(),
            local: Transform::IDENTITY,
            parent: self.node.parent,
            children: Vec::new(),
            kind: self.node_kind(),
        };
        if !scene.insert(node) {
            tracing::warn!("Cannot restore {}: ID already in use", self.node.id);
            return false;
        }
        scene.set_world_matrix(self.node.id, self.node.world);
        for child in &self.node.children {
            if scene.contains(*child) {
                scene.attach(*child, Some(self.node.id));
            }
        }
        true
    }
}

/// Deletion of the selected entities
#[derive(Debug, Clone, Default)]
pub struct DeleteCommand {
    /// Deleted entities in deletion order
    pub entities: Vec<DeletedEntity>,
}

impl DeleteCommand {
    /// Capture every selected entity. The gizmo must be released first so
    /// the recorded parents are the real ones.
    pub fn capture(scene: &Scene, selection: &Selection) -> Self {
        let entities = selection
            .iter()
            .filter_map(|entity| entity.id())
            .filter_map(|id| DeletedEntity::capture(scene, id))
            .collect();
        Self { entities }
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// IDs of the deleted nodes
    pub fn ids(&self) -> Vec<NodeId> {
        self.entities.iter().map(|e| e.node.id).collect()
    }

    fn read(archive: &mut ArchiveReader) -> archive::Result<Self> {
        let count: u64 = archive.read()?;
        let mut entities = Vec::new();
        for _ in 0..count {
            entities.push(DeletedEntity::read(archive)?);
        }
        Ok(Self { entities })
    }

    /// Remove the captured nodes from the scene and the selection
    pub fn remove_from(&self, ctx: &mut EditContext) {
        for id in self.ids() {
            ctx.selection.remove(id);
            if ctx.scene.remove(id).is_none() {
                tracing::warn!("Deleted node {} was already gone", id);
            }
        }
    }

    /// Restore the captured nodes in reverse deletion order
    pub fn restore_into(&self, scene: &mut Scene) -> usize {
        self.entities
            .iter()
            .rev()
            .filter(|entity| entity.restore(scene))
            .count()
    }
}

impl EditorCommand for DeleteCommand {
    fn kind(&self) -> HistoryKind {
        HistoryKind::Deletion
    }

    fn description(&self) -> String {
        format!("Delete {} entities", self.entities.len())
    }

    fn write(&self, archive: &mut ArchiveWriter) -> archive::Result<()> {
        archive.write(&(self.entities.len() as u64))?;
        for entity in &self.entities {
            entity.write(archive)?;
        }
        Ok(())
    }

    fn apply(&self, ctx: &mut EditContext, direction: Direction) -> Result<(), CommandError> {
        ctx.release_gizmo();
        match direction {
            Direction::Undo => {
                let restored = self.restore_into(&mut ctx.scene);
                tracing::debug!("Restored {}/{} deleted entities", restored, self.entities.len());
            }
            Direction::Redo => self.remove_from(ctx),
        }
        ctx.bind_gizmo();
        Ok(())
    }
}

/// A command decoded from a history entry
#[derive(Debug, Clone)]
pub enum RecordedCommand {
    /// Selection change
    Selection(SelectionCommand),
    /// Gizmo drag
    Transform(TransformCommand),
    /// Deletion
    Deletion(DeleteCommand),
    /// Paste; nothing to apply
    Paste,
    /// No operation
    None,
}

impl RecordedCommand {
    /// Decode the payload of a loaded entry
    pub fn read(entry: &mut HistoryEntry) -> Result<Self, CommandError> {
        let kind = entry.kind;
        let archive = entry.reader();
        Ok(match kind {
            HistoryKind::Selection => Self::Selection(SelectionCommand::read(archive)?),
            HistoryKind::Transform => Self::Transform(TransformCommand::read(archive)?),
            HistoryKind::Deletion => Self::Deletion(DeleteCommand::read(archive)?),
            HistoryKind::Paste => Self::Paste,
            HistoryKind::None => Self::None,
        })
    }

    /// Get the kind of this command
    pub fn kind(&self) -> HistoryKind {
        match self {
            Self::Selection(_) => HistoryKind::Selection,
            Self::Transform(_) => HistoryKind::Transform,
            Self::Deletion(_) => HistoryKind::Deletion,
            Self::Paste => HistoryKind::Paste,
            Self::None => HistoryKind::None,
        }
    }

    /// Apply in the given direction
    pub fn apply(&self, ctx: &mut EditContext, direction: Direction) -> Result<(), CommandError> {
        match self {
            Self::Selection(command) => command.apply(ctx, direction),
            Self::Transform(command) => command.apply(ctx, direction),
            Self::Deletion(command) => command.apply(ctx, direction),
            Self::Paste | Self::None => Ok(()),
        }
    }
}
