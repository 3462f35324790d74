// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transform gizmo.
//!
//! The gizmo is a helper node in the scene. While bound it is the shared
//! parent of every selected transform, so moving it moves the whole
//! selection through normal parent-child composition. Releasing it puts
//! each transform back under the parent saved by the selection.

use crate::math::Transform;
use crate::scene::{NodeId, NodeKind, Scene};
use crate::selection::Selection;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Smallest per-axis scale the gizmo accepts, for both a frame's factor
/// and the resulting local scale. Keeps drag matrices invertible.
pub const MIN_SCALE: f32 = 1e-3;

/// Gizmo mode for transform operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GizmoMode {
    /// Translate (move) mode
    #[default]
    Translate,
    /// Rotate mode
    Rotate,
    /// Scale mode
    Scale,
}

impl GizmoMode {
    /// Get the name of this mode
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translate => "Translate",
            Self::Rotate => "Rotate",
            Self::Scale => "Scale",
        }
    }
}

/// Axis constraint for gizmo operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisConstraint {
    /// No constraint - free movement
    #[default]
    None,
    /// Constrain to X axis
    X,
    /// Constrain to Y axis
    Y,
    /// Constrain to Z axis
    Z,
    /// Constrain to XY plane
    XY,
    /// Constrain to XZ plane
    XZ,
    /// Constrain to YZ plane
    YZ,
}

impl AxisConstraint {
    /// Axis mask (1.0 = active, 0.0 = constrained)
    pub fn mask(&self) -> Vec3 {
        match self {
            Self::None => Vec3::ONE,
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
            Self::XY => Vec3::new(1.0, 1.0, 0.0),
            Self::XZ => Vec3::new(1.0, 0.0, 1.0),
            Self::YZ => Vec3::new(0.0, 1.0, 1.0),
        }
    }

    /// Rotation axis for single-axis constraints
    pub fn axis(&self) -> Option<Vec3> {
        match self {
            Self::X => Some(Vec3::X),
            Self::Y => Some(Vec3::Y),
            Self::Z => Some(Vec3::Z),
            _ => None,
        }
    }
}

/// Which manipulations the gizmo accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GizmoCaps {
    /// Accept translation
    pub translate: bool,
    /// Accept rotation
    pub rotate: bool,
    /// Accept scaling
    pub scale: bool,
}

impl Default for GizmoCaps {
    fn default() -> Self {
        Self {
            translate: true,
            rotate: true,
            scale: true,
        }
    }
}

impl GizmoCaps {
    /// Whether a mode is accepted
    pub fn allows(&self, mode: GizmoMode) -> bool {
        match mode {
            GizmoMode::Translate => self.translate,
            GizmoMode::Rotate => self.rotate,
            GizmoMode::Scale => self.scale,
        }
    }
}

/// One frame of user manipulation, in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GizmoDelta {
    /// Move by an offset
    Translate(Vec3),
    /// Rotate around the gizmo origin
    Rotate(Quat),
    /// Multiply the scale per axis
    Scale(Vec3),
}

impl GizmoDelta {
    /// Mode this delta belongs to
    pub fn mode(&self) -> GizmoMode {
        match self {
            Self::Translate(_) => GizmoMode::Translate,
            Self::Rotate(_) => GizmoMode::Rotate,
            Self::Scale(_) => GizmoMode::Scale,
        }
    }

    /// Whether applying the delta changes nothing
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Translate(offset) => *offset == Vec3::ZERO,
            Self::Rotate(rotation) => *rotation == Quat::IDENTITY,
            Self::Scale(factor) => *factor == Vec3::ONE,
        }
    }
}

/// Gizmo world matrices at the start and end of a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEnded {
    /// World matrix when the drag started
    pub start: Mat4,
    /// World matrix when the drag ended
    pub end: Mat4,
}

/// Binding state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GizmoState {
    /// Not parenting anything
    #[default]
    Idle,
    /// Parent of the listed transforms
    Bound(Vec<NodeId>),
}

/// Shared proxy transform for group edits
#[derive(Debug, Clone)]
pub struct Gizmo {
    node: NodeId,
    state: GizmoState,
    /// Master switch
    pub enabled: bool,
    /// Accepted manipulations
    pub caps: GizmoCaps,
    drag_start: Option<Mat4>,
    moved: bool,
    drag_ended: Option<DragEnded>,
}

impl Gizmo {
    /// Create the gizmo and its helper node in `scene`
    pub fn new(scene: &mut Scene) -> Self {
        let node = scene.spawn("Gizmo", NodeKind::Gizmo, Transform::IDENTITY);
        Self {
            node,
            state: GizmoState::Idle,
            enabled: true,
            caps: GizmoCaps::default(),
            drag_start: None,
            moved: false,
            drag_ended: None,
        }
    }

    /// Make sure the helper node exists, e.g. after a scene was replaced.
    /// Any binding is dropped.
    pub fn attach_to_scene(&mut self, scene: &mut Scene) {
        if !scene.get(self.node).is_some_and(|n| n.kind.is_helper()) {
            self.node = scene.spawn("Gizmo", NodeKind::Gizmo, Transform::IDENTITY);
        }
        self.state = GizmoState::Idle;
        self.drag_start = None;
        self.moved = false;
    }

    /// Helper node ID
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Current binding state
    pub fn state(&self) -> &GizmoState {
        &self.state
    }

    /// Whether the gizmo currently parents the selection
    pub fn is_bound(&self) -> bool {
        matches!(self.state, GizmoState::Bound(_))
    }

    /// Whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    /// Gizmo world matrix
    pub fn world_matrix(&self, scene: &Scene) -> Mat4 {
        scene.world_matrix(self.node)
    }

    /// Bind the selected transforms. The gizmo moves to their centroid and
    /// becomes their parent. Returns false when nothing has a transform.
    ///
    /// Must not be called while bound.
    pub fn begin(&mut self, scene: &mut Scene, selection: &Selection) -> bool {
        debug_assert!(!self.is_bound(), "Gizmo::begin called while bound");

        let transforms: Vec<NodeId> = selection
            .transforms()
            .into_iter()
            .filter(|t| scene.contains(*t))
            .collect();
        if transforms.is_empty() {
            return false;
        }

        let center = transforms
            .iter()
            .map(|t| scene.world_translation(*t))
            .sum::<Vec3>()
            / transforms.len() as f32;

        scene.detach(self.node);
        scene.set_local(self.node, Transform::from_translation(center));
        for transform in &transforms {
            scene.detach(*transform);
            scene.attach(*transform, Some(self.node));
        }

        tracing::debug!("Gizmo bound to {} transforms at {:?}", transforms.len(), center);
        self.state = GizmoState::Bound(transforms);
        true
    }

    /// Release the bound transforms back to their saved parents
    pub fn end(&mut self, scene: &mut Scene, selection: &Selection) {
        let GizmoState::Bound(transforms) = std::mem::take(&mut self.state) else {
            return;
        };

        scene.detach(self.node);
        for transform in transforms {
            if !scene.contains(transform) {
                continue;
            }
            scene.detach(transform);
            let parent = selection
                .saved_parent(transform)
                .flatten()
                .filter(|p| scene.contains(*p));
            scene.attach(transform, parent);
        }

        self.drag_start = None;
        self.moved = false;
        tracing::debug!("Gizmo released");
    }

    /// Feed one frame of input. `Some` while the user holds the drag
    /// button, `None` once released. A release after at least one moving
    /// update reports the drag through [`Gizmo::take_drag_ended`].
    pub fn update(&mut self, scene: &mut Scene, delta: Option<GizmoDelta>) {
        if !self.enabled || !self.is_bound() {
            self.drag_start = None;
            self.moved = false;
            return;
        }

        let Some(delta) = delta else {
            if let Some(drag) = self.finish_drag(scene) {
                self.drag_ended = Some(drag);
            }
            return;
        };

        if self.drag_start.is_none() {
            self.drag_start = Some(self.world_matrix(scene));
        }
        if !self.caps.allows(delta.mode()) || delta.is_identity() {
            return;
        }

        let Some(node) = scene.get(self.node) else {
            return;
        };
        let mut local = node.local;
        match delta {
            GizmoDelta::Translate(offset) => local.translation += offset,
            GizmoDelta::Rotate(rotation) => local.rotation = (rotation * local.rotation).normalize(),
            GizmoDelta::Scale(factor) => {
                let scale = local.scale * factor;
                if !scale.is_finite() || factor.min_element() < MIN_SCALE || scale.min_element() < MIN_SCALE {
                    tracing::debug!("Gizmo scale factor {:?} refused", factor);
                    return;
                }
                local.scale = scale;
            }
        }
        scene.set_local(self.node, local);
        self.moved = true;
    }

    /// End the drag in progress without waiting for the button release.
    /// Returns the drag when it moved anything. A held button starts a new
    /// drag on the next update.
    pub fn finish_drag(&mut self, scene: &Scene) -> Option<DragEnded> {
        let start = self.drag_start.take()?;
        std::mem::take(&mut self.moved).then(|| DragEnded {
            start,
            end: self.world_matrix(scene),
        })
    }

    /// Take the most recent finished drag, if any
    pub fn take_drag_ended(&mut self) -> Option<DragEnded> {
        self.drag_ended.take()
    }

    /// Set the gizmo world matrix; bound transforms follow
    pub fn set_world_matrix(&mut self, scene: &mut Scene, matrix: Mat4) {
        scene.set_world_matrix(self.node, matrix);
    }

    /// Pre-multiply the gizmo world matrix by `delta`; bound transforms
    /// receive the same world-space change
    pub fn apply_world_delta(&mut self, scene: &mut Scene, delta: Mat4) {
        let current = self.world_matrix(scene);
        self.set_world_matrix(scene, delta * current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        scene: Scene,
        selection: Selection,
        gizmo: Gizmo,
        group: NodeId,
        a: NodeId,
        b: NodeId,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let group = scene.spawn("Group", NodeKind::Empty, Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)));
        let a = scene.spawn_child(group, "A", NodeKind::Empty, Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        let b = scene.spawn("B", NodeKind::Empty, Transform::from_translation(Vec3::new(-2.0, 0.0, 0.0)));
        let gizmo = Gizmo::new(&mut scene);
        let mut selection = Selection::new();
        selection.pick(&scene.entity_ref(a, 0).unwrap(), false, &scene);
        selection.pick(&scene.entity_ref(b, 0).unwrap(), true, &scene);
        Fixture {
            scene,
            selection,
            gizmo,
            group,
            a,
            b,
        }
    }

    #[test]
    fn test_begin_parents_selection_at_centroid() {
        let mut f = fixture();
        assert!(f.gizmo.begin(&mut f.scene, &f.selection));
        assert!(f.gizmo.is_bound());
        assert_eq!(f.scene.parent_of(f.a), Some(f.gizmo.node()));
        assert_eq!(f.scene.parent_of(f.b), Some(f.gizmo.node()));
        assert!(f
            .scene
            .world_translation(f.gizmo.node())
            .abs_diff_eq(Vec3::new(0.0, 2.5, 0.0), 1e-5));
        assert!(f.scene.world_translation(f.a).abs_diff_eq(Vec3::new(2.0, 5.0, 0.0), 1e-5));
    }

    #[test]
    fn test_end_restores_saved_parents() {
        let mut f = fixture();
        f.gizmo.begin(&mut f.scene, &f.selection);
        f.gizmo.end(&mut f.scene, &f.selection);
        assert!(!f.gizmo.is_bound());
        assert_eq!(f.scene.parent_of(f.a), Some(f.group));
        assert_eq!(f.scene.parent_of(f.b), None);
        assert!(f.scene.get(f.gizmo.node()).unwrap().children.is_empty());
    }

    #[test]
    fn test_begin_without_transforms() {
        let mut scene = Scene::new();
        let mut gizmo = Gizmo::new(&mut scene);
        let selection = Selection::new();
        assert!(!gizmo.begin(&mut scene, &selection));
        assert!(!gizmo.is_bound());
    }

    #[test]
    fn test_drag_moves_group_and_reports_end() {
        let mut f = fixture();
        f.gizmo.begin(&mut f.scene, &f.selection);
        let start = f.gizmo.world_matrix(&f.scene);

        let offset = Vec3::new(1.0, 0.0, 3.0);
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Translate(offset)));
        assert!(f.gizmo.take_drag_ended().is_none());
        f.gizmo.update(&mut f.scene, None);
        let drag = f.gizmo.take_drag_ended().unwrap();
        assert_eq!(drag.start, start);
        assert!(drag.end.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 2.5, 3.0), 1e-5));

        f.gizmo.end(&mut f.scene, &f.selection);
        assert_eq!(f.scene.parent_of(f.b), None);
        assert!(f.scene.world_translation(f.a).abs_diff_eq(Vec3::new(3.0, 5.0, 3.0), 1e-5));
        assert!(f.scene.world_translation(f.b).abs_diff_eq(Vec3::new(-1.0, 0.0, 3.0), 1e-5));
    }

    #[test]
    fn test_caps_gate_updates() {
        let mut f = fixture();
        f.gizmo.caps.translate = false;
        f.gizmo.begin(&mut f.scene, &f.selection);
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Translate(Vec3::X)));
        f.gizmo.update(&mut f.scene, None);
        assert!(f.gizmo.take_drag_ended().is_none());

        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Scale(Vec3::splat(2.0))));
        f.gizmo.update(&mut f.scene, None);
        assert!(f.gizmo.take_drag_ended().is_some());
        assert!(f.scene.world_translation(f.b).abs_diff_eq(Vec3::new(-4.0, -2.5, 0.0), 1e-5));
    }

    #[test]
    fn test_click_without_motion_records_nothing() {
        let mut f = fixture();
        f.gizmo.begin(&mut f.scene, &f.selection);
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Translate(Vec3::ZERO)));
        f.gizmo.update(&mut f.scene, None);
        assert!(f.gizmo.take_drag_ended().is_none());
    }

    #[test]
    fn test_degenerate_scale_refused() {
        let mut f = fixture();
        f.gizmo.begin(&mut f.scene, &f.selection);
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Scale(Vec3::new(0.0, 1.0, 1.0))));
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Scale(Vec3::splat(-1.0))));
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Scale(Vec3::splat(f32::NAN))));
        assert_eq!(f.scene.get(f.gizmo.node()).unwrap().local.scale, Vec3::ONE);

        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Scale(Vec3::splat(MIN_SCALE))));
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Scale(Vec3::splat(0.5))));
        f.gizmo.update(&mut f.scene, None);
        let drag = f.gizmo.take_drag_ended().unwrap();
        assert!(drag.end.determinant().abs() > 0.0);
        assert!(f.scene.get(f.gizmo.node()).unwrap().local.scale.abs_diff_eq(Vec3::splat(MIN_SCALE), 1e-7));
    }

    #[test]
    fn test_finish_drag_mid_hold() {
        let mut f = fixture();
        f.gizmo.begin(&mut f.scene, &f.selection);
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Translate(Vec3::X)));
        let drag = f.gizmo.finish_drag(&f.scene).unwrap();
        assert!(!f.gizmo.is_dragging());
        assert!(drag.end.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 2.5, 0.0), 1e-5));

        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Translate(Vec3::ZERO)));
        assert!(f.gizmo.is_dragging());
        f.gizmo.update(&mut f.scene, None);
        assert!(f.gizmo.take_drag_ended().is_none());
        assert!(f.gizmo.finish_drag(&f.scene).is_none());
    }

    #[test]
    fn test_world_delta_inverts_drag() {
        let mut f = fixture();
        f.gizmo.begin(&mut f.scene, &f.selection);
        f.gizmo.update(&mut f.scene, Some(GizmoDelta::Rotate(Quat::from_rotation_y(0.7))));
        f.gizmo.update(&mut f.scene, None);
        let drag = f.gizmo.take_drag_ended().unwrap();

        f.gizmo.apply_world_delta(&mut f.scene, drag.start * drag.end.inverse());
        assert!(f.gizmo.world_matrix(&f.scene).abs_diff_eq(drag.start, 1e-4));
        assert!(f.scene.world_translation(f.b).abs_diff_eq(Vec3::new(-2.0, 0.0, 0.0), 1e-4));
    }
}
