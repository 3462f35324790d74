// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity references produced by picking.

use crate::scene::NodeId;
use serde::{Deserialize, Serialize};

/// What kind of entity a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityKind {
    /// Nothing was hit
    #[default]
    None,
    /// Renderable object
    Object(NodeId),
    /// Light source
    Light(NodeId),
    /// Projected decal
    Decal(NodeId),
    /// Environment probe
    EnvProbe(NodeId),
    /// Bare transform node
    Node(NodeId),
}

impl EntityKind {
    /// Node carrying the entity's identity
    pub fn id(&self) -> Option<NodeId> {
        match *self {
            Self::None => None,
            Self::Object(id)
            | Self::Light(id)
            | Self::Decal(id)
            | Self::EnvProbe(id)
            | Self::Node(id) => Some(id),
        }
    }
}

/// A picked entity.
///
/// `transform` is the node the gizmo moves. It usually equals the identity
/// node, except for armature deformed objects where it is the armature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity kind and identity
    pub kind: EntityKind,
    /// Transform role
    pub transform: Option<NodeId>,
    /// Picked mesh subset (objects only)
    pub subset: usize,
}

impl EntityRef {
    /// Empty reference (nothing picked)
    pub const NONE: Self = Self {
        kind: EntityKind::None,
        transform: None,
        subset: 0,
    };

    /// Stable identity used for selection equality and history records
    pub fn id(&self) -> Option<NodeId> {
        self.kind.id()
    }

    /// Whether nothing was picked
    pub fn is_empty(&self) -> bool {
        self.kind == EntityKind::None && self.transform.is_none()
    }

    /// Object node, if this is an object
    pub fn object(&self) -> Option<NodeId> {
        match self.kind {
            EntityKind::Object(id) => Some(id),
            _ => None,
        }
    }

    /// Light node, if this is a light
    pub fn light(&self) -> Option<NodeId> {
        match self.kind {
            EntityKind::Light(id) => Some(id),
            _ => None,
        }
    }

    /// Decal node, if this is a decal
    pub fn decal(&self) -> Option<NodeId> {
        match self.kind {
            EntityKind::Decal(id) => Some(id),
            _ => None,
        }
    }

    /// Probe node, if this is an environment probe
    pub fn env_probe(&self) -> Option<NodeId> {
        match self.kind {
            EntityKind::EnvProbe(id) => Some(id),
            _ => None,
        }
    }
}
