// SPDX-License-Identifier: MIT OR Apache-2.0
//! Inspector panel models.
//!
//! The inspectors follow the last picked entity and turn property edits
//! into clamped writes on the scene. They hold IDs only; values are read
//! from the scene when needed.

use crate::assets::MaterialSlot;
use crate::entity::{EntityKind, EntityRef};
use crate::scene::components::{Light, Material, Mesh};
use crate::scene::{NodeId, Scene};
use glam::Vec3;
use std::ops::RangeInclusive;

/// Range of unit material sliders
pub const UNIT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Normal map strength slider range
pub const NORMAL_MAP_RANGE: RangeInclusive<f32> = 0.0..=4.0;
/// Parallax occlusion mapping slider range
pub const PARALLAX_RANGE: RangeInclusive<f32> = 0.0..=0.1;
/// Light energy slider range
pub const ENERGY_RANGE: RangeInclusive<f32> = 0.0..=64.0;
/// Light range slider range
pub const LIGHT_RANGE_RANGE: RangeInclusive<f32> = 1.0..=1000.0;
/// Spot cone angle slider range, in radians
pub const CONE_ANGLE_RANGE: RangeInclusive<f32> = 0.0..=std::f32::consts::FRAC_PI_2;

fn clamp(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

/// Material property edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialEdit {
    /// Base color
    BaseColor(Vec3),
    /// Opacity
    Alpha(f32),
    /// Roughness
    Roughness(f32),
    /// Reflectance
    Reflectance(f32),
    /// Metalness
    Metalness(f32),
    /// Emissive strength
    Emissive(f32),
    /// Refraction index
    RefractionIndex(f32),
    /// Subsurface scattering
    SubsurfaceScattering(f32),
    /// Normal map strength
    NormalMapStrength(f32),
    /// Parallax occlusion mapping depth
    ParallaxOcclusionMapping(f32),
    /// Water flag
    Water(bool),
    /// Planar reflection flag
    PlanarReflections(bool),
}

impl MaterialEdit {
    /// Write the clamped value
    pub fn apply(self, material: &mut Material) {
        match self {
            Self::BaseColor(color) => material.base_color = color.clamp(Vec3::ZERO, Vec3::ONE),
            Self::Alpha(v) => material.alpha = clamp(v, &UNIT_RANGE),
            Self::Roughness(v) => material.roughness = clamp(v, &UNIT_RANGE),
            Self::Reflectance(v) => material.reflectance = clamp(v, &UNIT_RANGE),
            Self::Metalness(v) => material.metalness = clamp(v, &UNIT_RANGE),
            Self::Emissive(v) => material.emissive = clamp(v, &UNIT_RANGE),
            Self::RefractionIndex(v) => material.refraction_index = clamp(v, &UNIT_RANGE),
            Self::SubsurfaceScattering(v) => material.subsurface_scattering = clamp(v, &UNIT_RANGE),
            Self::NormalMapStrength(v) => material.normal_map_strength = clamp(v, &NORMAL_MAP_RANGE),
            Self::ParallaxOcclusionMapping(v) => {
                material.parallax_occlusion_mapping = clamp(v, &PARALLAX_RANGE);
            }
            Self::Water(on) => material.water = on,
            Self::PlanarReflections(on) => material.planar_reflections = on,
        }
    }
}

/// Mesh property edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshEdit {
    /// Render both faces
    DoubleSided(bool),
    /// Physics mass, not negative
    Mass(f32),
    /// Physics friction
    Friction(f32),
}

impl MeshEdit {
    /// Write the clamped value
    pub fn apply(self, mesh: &mut Mesh) {
        match self {
            Self::DoubleSided(on) => mesh.double_sided = on,
            Self::Mass(v) => mesh.mass = v.max(0.0),
            Self::Friction(v) => mesh.friction = clamp(v, &UNIT_RANGE),
        }
    }
}

/// Light property edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightEdit {
    /// Energy
    Energy(f32),
    /// Range
    Range(f32),
    /// Color
    Color(Vec3),
    /// Spot cone angle
    ConeAngle(f32),
}

impl LightEdit {
    /// Write the clamped value
    pub fn apply(self, light: &mut Light) {
        match self {
            Self::Energy(v) => light.energy = clamp(v, &ENERGY_RANGE),
            Self::Range(v) => light.range = clamp(v, &LIGHT_RANGE_RANGE),
            Self::Color(color) => light.color = color.clamp(Vec3::ZERO, Vec3::ONE),
            Self::ConeAngle(v) => light.cone_angle = clamp(v, &CONE_ANGLE_RANGE),
        }
    }
}

/// Inspector panels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inspectors {
    /// Object panel target
    pub object: Option<NodeId>,
    /// Mesh panel target
    pub mesh: Option<NodeId>,
    /// Material panel target
    pub material: Option<MaterialSlot>,
    /// Light panel target
    pub light: Option<NodeId>,
    /// Decal panel target
    pub decal: Option<NodeId>,
    /// Probe panel target
    pub env_probe: Option<NodeId>,
}

impl Inspectors {
    /// Create empty inspectors
    pub fn new() -> Self {
        Self::default()
    }

    /// Point every panel at `entity`; panels that don't apply are cleared
    pub fn sync(&mut self, scene: &Scene, entity: &EntityRef) {
        self.clear();
        match entity.kind {
            EntityKind::Object(id) => {
                let Some(object) = scene.object(id) else {
                    return;
                };
                self.object = Some(id);
                self.mesh = Some(id);
                if entity.subset < object.mesh.subsets.len() {
                    self.material = Some(MaterialSlot {
                        node: id,
                        subset: entity.subset,
                    });
                }
            }
            EntityKind::Light(id) => self.light = Some(id),
            EntityKind::Decal(id) => self.decal = Some(id),
            EntityKind::EnvProbe(id) => self.env_probe = Some(id),
            EntityKind::Node(_) | EntityKind::None => {}
        }
    }

    /// Clear every panel
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether no panel has a target
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Clear panels showing a node that is gone
    pub fn forget_missing(&mut self, scene: &Scene) {
        let alive = |id: &Option<NodeId>| id.is_some_and(|id| scene.contains(id));
        if !alive(&self.object) {
            self.object = None;
            self.mesh = None;
            self.material = None;
        }
        if !alive(&self.light) {
            self.light = None;
        }
        if !alive(&self.decal) {
            self.decal = None;
        }
        if !alive(&self.env_probe) {
            self.env_probe = None;
        }
    }

    /// Material shown in the material panel
    pub fn material<'a>(&self, scene: &'a Scene) -> Option<&'a Material> {
        let slot = self.material?;
        scene
            .object(slot.node)?
            .mesh
            .subsets
            .get(slot.subset)
            .map(|s| &s.material)
    }

    /// Apply a material edit. Returns false without a target.
    pub fn edit_material(&self, scene: &mut Scene, edit: MaterialEdit) -> bool {
        let Some(slot) = self.material else {
            return false;
        };
        let Some(material) = slot.material_mut(scene) else {
            return false;
        };
        edit.apply(material);
        true
    }

    /// Apply a mesh edit. Returns false without a target.
    pub fn edit_mesh(&self, scene: &mut Scene, edit: MeshEdit) -> bool {
        let Some(object) = self.mesh.and_then(|id| scene.object_mut(id)) else {
            return false;
        };
        edit.apply(&mut object.mesh);
        true
    }

    /// Apply a light edit. Returns false without a target.
    pub fn edit_light(&self, scene: &mut Scene, edit: LightEdit) -> bool {
        let Some(light) = self.light.and_then(|id| scene.light_mut(id)) else {
            return false;
        };
        edit.apply(light);
        true
    }

    /// Short summary for logs
    pub fn describe(&self, scene: &Scene) -> String {
        let target = self.object.or(self.light).or(self.decal).or(self.env_probe);
        match target.and_then(|id| scene.get(id)) {
            Some(node) => format!("{} {:?}", node.kind.name(), node.name),
            None => "nothing".to_string(),
        }
    }
}
