// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ray picking.

use crate::entity::EntityRef;
use crate::math::{Aabb, Ray};
use crate::scene::{NodeId, NodeKind, Scene};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Entity types a pick may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PickMask(pub u32);

impl PickMask {
    /// Nothing
    pub const NONE: Self = Self(0);
    /// Renderable objects
    pub const OBJECT: Self = Self(1 << 0);
    /// Environment probes
    pub const ENV_PROBE: Self = Self(1 << 1);
    /// Lights
    pub const LIGHT: Self = Self(1 << 2);
    /// Decals
    pub const DECAL: Self = Self(1 << 3);
    /// Every pickable type
    pub const ALL: Self = Self(Self::OBJECT.0 | Self::ENV_PROBE.0 | Self::LIGHT.0 | Self::DECAL.0);

    /// Whether all bits of `other` are set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for PickMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for PickMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Scene query for the nearest entity along a ray
pub trait Picker {
    /// Nearest entity of an allowed type, or [`EntityRef::NONE`]
    fn pick(&self, scene: &Scene, ray: Ray, mask: PickMask) -> EntityRef;
}

/// Picker testing node bounds, then mesh triangles for objects
#[derive(Debug, Clone, Copy, Default)]
pub struct RayPicker;

impl RayPicker {
    /// Distance and subset of a hit on `id`
    fn hit(scene: &Scene, id: NodeId, kind: &NodeKind, ray: &Ray, mask: PickMask) -> Option<(f32, usize)> {
        let unit = Aabb::from_center(Vec3::ZERO, Vec3::splat(0.5));
        match kind {
            NodeKind::Object(object) if mask.contains(PickMask::OBJECT) => {
                let bounds = scene.bounds(id)?;
                bounds.intersect_ray(ray)?;
                let local_ray = ray.transformed(&scene.world_matrix(id).inverse());
                (0..object.mesh.subsets.len())
                    .filter_map(|subset| {
                        object
                            .mesh
                            .subset_triangles(subset)
                            .filter_map(|[a, b, c]| local_ray.intersect_triangle(a, b, c))
                            .min_by(f32::total_cmp)
                            .map(|t| (t, subset))
                    })
                    .min_by(|a, b| a.0.total_cmp(&b.0))
            }
            NodeKind::Light(_) if mask.contains(PickMask::LIGHT) => {
                let center = scene.world_translation(id);
                Aabb::from_center(center, Vec3::splat(0.5))
                    .intersect_ray(ray)
                    .map(|t| (t, 0))
            }
            NodeKind::EnvProbe(_) if mask.contains(PickMask::ENV_PROBE) => {
                let center = scene.world_translation(id);
                Aabb::from_center(center, Vec3::splat(0.5))
                    .intersect_ray(ray)
                    .map(|t| (t, 0))
            }
            NodeKind::Decal(_) if mask.contains(PickMask::DECAL) => {
                let local_ray = ray.transformed(&scene.world_matrix(id).inverse());
                unit.intersect_ray(&local_ray).map(|t| (t, 0))
            }
            _ => None,
        }
    }
}

impl Picker for RayPicker {
    fn pick(&self, scene: &Scene, ray: Ray, mask: PickMask) -> EntityRef {
        scene
            .nodes()
            .filter_map(|node| {
                Self::hit(scene, node.id, &node.kind, &ray, mask).map(|(t, subset)| (t, node.id, subset))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .and_then(|(_, id, subset)| scene.entity_ref(id, subset))
            .unwrap_or(EntityRef::NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::math::Transform;
    use crate::scene::components::{Decal, Light, Material, Mesh, MeshSubset, Object};

    fn down_z() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::Z)
    }

    #[test]
    fn test_nearest_hit_wins() {
        let mut scene = Scene::new();
        let far = scene.spawn(
            "Far",
            NodeKind::Object(Object::new(Mesh::cube("Far", 1.0, Material::default()))),
            Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)),
        );
        let near = scene.spawn("Lamp", NodeKind::Light(Light::default()), Transform::IDENTITY);

        let hit = RayPicker.pick(&scene, down_z(), PickMask::ALL);
        assert_eq!(hit.kind, EntityKind::Light(near));

        let hit = RayPicker.pick(&scene, down_z(), PickMask::OBJECT);
        assert_eq!(hit.kind, EntityKind::Object(far));
    }

    #[test]
    fn test_object_subset() {
        let mut mesh = Mesh::cube("Crate", 1.0, Material::new("Sides"));
        // Move the -z face (first two triangles) into its own subset
        mesh.subsets[0].index_offset = 6;
        mesh.subsets[0].index_count -= 6;
        mesh.subsets.push(MeshSubset {
            index_offset: 0,
            index_count: 6,
            material: Material::new("Front"),
        });
        let mut scene = Scene::new();
        let id = scene.spawn("Crate", NodeKind::Object(Object::new(mesh)), Transform::IDENTITY);

        let hit = RayPicker.pick(&scene, down_z(), PickMask::ALL);
        assert_eq!(hit.object(), Some(id));
        assert_eq!(hit.subset, 1);
    }

    #[test]
    fn test_oriented_decal_and_misses() {
        let mut scene = Scene::new();
        let decal = scene.spawn(
            "Decal",
            NodeKind::Decal(Decal::default()),
            Transform {
                scale: Vec3::new(4.0, 0.1, 0.1),
                ..Transform::from_translation(Vec3::new(1.5, 0.0, 0.0))
            },
        );
        scene.spawn("Group", NodeKind::Empty, Transform::IDENTITY);
        scene.spawn("Gizmo", NodeKind::Gizmo, Transform::IDENTITY);

        let hit = RayPicker.pick(&scene, down_z(), PickMask::ALL);
        assert_eq!(hit.decal(), Some(decal));
        assert!(RayPicker.pick(&scene, down_z(), PickMask::LIGHT).is_empty());

        let miss = Ray::new(Vec3::new(0.0, 5.0, -10.0), Vec3::Z);
        assert!(RayPicker.pick(&scene, miss, PickMask::ALL).is_empty());
    }
}
