// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed node payloads: renderable objects, lights, decals, probes.

use crate::archive::{ArchiveReader, ArchiveWriter, Result};
use crate::math::Aabb;
use crate::scene::NodeId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Surface material of one mesh subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Base color (linear RGB)
    pub base_color: Vec3,
    /// Base color texture
    pub base_color_map: Option<PathBuf>,
    /// Opacity
    pub alpha: f32,
    /// Roughness
    pub roughness: f32,
    /// Specular reflectance
    pub reflectance: f32,
    /// Metalness
    pub metalness: f32,
    /// Emissive strength
    pub emissive: f32,
    /// Refraction index
    pub refraction_index: f32,
    /// Subsurface scattering amount
    pub subsurface_scattering: f32,
    /// Normal map strength
    pub normal_map_strength: f32,
    /// Parallax occlusion mapping depth
    pub parallax_occlusion_mapping: f32,
    /// Render as water
    pub water: bool,
    /// Render planar reflections
    pub planar_reflections: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Material".to_string(),
            base_color: Vec3::ONE,
            base_color_map: None,
            alpha: 1.0,
            roughness: 0.5,
            reflectance: 0.5,
            metalness: 0.0,
            emissive: 0.0,
            refraction_index: 0.02,
            subsurface_scattering: 0.0,
            normal_map_strength: 1.0,
            parallax_occlusion_mapping: 0.0,
            water: false,
            planar_reflections: false,
        }
    }
}

impl Material {
    /// Create a default material with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Contiguous index range drawn with one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSubset {
    /// First index
    pub index_offset: u32,
    /// Index count
    pub index_count: u32,
    /// Material
    pub material: Material,
}

/// Data derived from mesh geometry; never serialized
#[derive(Debug, Clone, PartialEq)]
pub struct RenderData {
    /// Local space bounds
    pub bounds: Aabb,
    /// Number of vertices uploaded
    pub vertex_count: usize,
    /// Number of triangles uploaded
    pub triangle_count: usize,
}

/// Triangle mesh with per-subset materials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// Mesh name
    pub name: String,
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Triangle indices
    pub indices: Vec<u32>,
    /// Material subsets
    pub subsets: Vec<MeshSubset>,
    /// Armature deforming this mesh
    pub armature: Option<NodeId>,
    /// Render both faces
    pub double_sided: bool,
    /// Physics mass
    pub mass: f32,
    /// Physics friction
    pub friction: f32,
    #[serde(skip)]
    render_data: Option<RenderData>,
}

/// Mesh fields other than the subset materials, in archive order
#[derive(Serialize, Deserialize)]
struct MeshGeometry {
    name: String,
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    ranges: Vec<(u32, u32)>,
    armature: Option<NodeId>,
    double_sided: bool,
    mass: f32,
    friction: f32,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mass: 1.0,
            friction: 0.5,
            ..Default::default()
        }
    }

    /// Axis aligned box mesh with a single subset
    pub fn cube(name: impl Into<String>, half_extent: f32, material: Material) -> Self {
        let e = half_extent;
        let positions = Aabb::from_center(Vec3::ZERO, Vec3::splat(e)).corners().to_vec();
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ];
        let mut mesh = Self::new(name);
        mesh.subsets.push(MeshSubset {
            index_offset: 0,
            index_count: indices.len() as u32,
            material,
        });
        mesh.positions = positions;
        mesh.indices = indices;
        mesh.create_render_data();
        mesh
    }

    /// Rebuild derived render data from the geometry
    pub fn create_render_data(&mut self) {
        self.render_data = Some(RenderData {
            bounds: Aabb::from_points(self.positions.iter().copied()),
            vertex_count: self.positions.len(),
            triangle_count: self.indices.len() / 3,
        });
    }

    /// Derived render data, if built
    pub fn render_data(&self) -> Option<&RenderData> {
        self.render_data.as_ref()
    }

    /// Local space bounds
    pub fn bounds(&self) -> Aabb {
        match &self.render_data {
            Some(data) => data.bounds,
            None => Aabb::from_points(self.positions.iter().copied()),
        }
    }

    /// Triangles of one subset
    pub fn subset_triangles(&self, subset: usize) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        let range = self
            .subsets
            .get(subset)
            .map(|s| {
                let start = s.index_offset as usize;
                let end = (start + s.index_count as usize).min(self.indices.len());
                start.min(end)..end
            })
            .unwrap_or(0..0);
        self.indices[range].chunks_exact(3).filter_map(|tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }

    fn write_geometry(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write(&MeshGeometry {
            name: self.name.clone(),
            positions: self.positions.clone(),
            indices: self.indices.clone(),
            ranges: self
                .subsets
                .iter()
                .map(|s| (s.index_offset, s.index_count))
                .collect(),
            armature: self.armature,
            double_sided: self.double_sided,
            mass: self.mass,
            friction: self.friction,
        })
    }
}

/// Per-object settings that live outside the mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSettings {
    /// Casts shadows
    pub cast_shadow: bool,
    /// Tint multiplied with every material
    pub color: Vec3,
    /// Distance at which the impostor replaces the mesh
    pub impostor_distance: Option<f32>,
}

impl Default for ObjectSettings {
    fn default() -> Self {
        Self {
            cast_shadow: true,
            color: Vec3::ONE,
            impostor_distance: None,
        }
    }
}

/// Renderable object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Object {
    /// Object settings
    pub settings: ObjectSettings,
    /// Geometry and materials
    pub mesh: Mesh,
}

impl Object {
    /// Object with default settings
    pub fn new(mesh: Mesh) -> Self {
        Self {
            settings: ObjectSettings::default(),
            mesh,
        }
    }

    /// Whether the mesh is deformed by an armature
    pub fn is_armature_deformed(&self) -> bool {
        self.mesh.armature.is_some()
    }

    /// Append settings, mesh geometry, subset count and one material per
    /// subset
    pub fn write_archive(&self, archive: &mut ArchiveWriter) -> Result<()> {
        archive.write(&self.settings)?;
        self.mesh.write_geometry(archive)?;
        archive.write(&(self.mesh.subsets.len() as u64))?;
        for subset in &self.mesh.subsets {
            archive.write(&subset.material)?;
        }
        Ok(())
    }

    /// Read back what [`Object::write_archive`] wrote and rebuild render data
    pub fn read_archive(archive: &mut ArchiveReader) -> Result<Self> {
        let settings: ObjectSettings = archive.read()?;
        let geometry: MeshGeometry = archive.read()?;
        let subset_count: u64 = archive.read()?;

        let mut subsets = Vec::with_capacity(geometry.ranges.len());
        for i in 0..subset_count as usize {
            let material: Material = archive.read()?;
            let (index_offset, index_count) = geometry.ranges.get(i).copied().unwrap_or((0, 0));
            subsets.push(MeshSubset {
                index_offset,
                index_count,
                material,
            });
        }

        let mut mesh = Mesh {
            name: geometry.name,
            positions: geometry.positions,
            indices: geometry.indices,
            subsets,
            armature: geometry.armature,
            double_sided: geometry.double_sided,
            mass: geometry.mass,
            friction: geometry.friction,
            render_data: None,
        };
        mesh.create_render_data();
        Ok(Self { settings, mesh })
    }
}

/// Light type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightType {
    /// Omni light
    #[default]
    Point,
    /// Cone light
    Spot,
    /// Sun light
    Directional,
}

/// Light source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Color
    pub color: Vec3,
    /// Energy
    pub energy: f32,
    /// Range for point and spot lights
    pub range: f32,
    /// Spot cone angle in radians
    pub cone_angle: f32,
    /// Casts shadows
    pub cast_shadow: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            color: Vec3::ONE,
            energy: 1.0,
            range: 10.0,
            cone_angle: std::f32::consts::FRAC_PI_4,
            cast_shadow: false,
        }
    }
}

/// Projected decal; the node transform is the projection box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decal {
    /// Color texture
    pub texture: Option<PathBuf>,
    /// Normal texture
    pub normal: Option<PathBuf>,
    /// Tint
    pub color: Vec3,
    /// Emissive strength
    pub emissive: f32,
}

impl Default for Decal {
    fn default() -> Self {
        Self {
            texture: None,
            normal: None,
            color: Vec3::ONE,
            emissive: 0.0,
        }
    }
}

/// Environment capture probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvProbe {
    /// Cubemap resolution
    pub resolution: u32,
    /// Recapture every frame
    pub realtime: bool,
}

impl Default for EnvProbe {
    fn default() -> Self {
        Self {
            resolution: 128,
            realtime: false,
        }
    }
}

/// Skeleton root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    /// Bone names
    pub bones: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_render_data() {
        let mesh = Mesh::cube("Cube", 1.0, Material::default());
        let data = mesh.render_data().unwrap();
        assert_eq!(data.vertex_count, 8);
        assert_eq!(data.triangle_count, 12);
        assert_eq!(data.bounds, Aabb::from_center(Vec3::ZERO, Vec3::ONE));
        assert_eq!(mesh.subset_triangles(0).count(), 12);
        assert_eq!(mesh.subset_triangles(1).count(), 0);
    }

    #[test]
    fn test_object_archive_roundtrip_keeps_materials() {
        let mut mesh = Mesh::cube("Cube", 1.0, Material::new("Red"));
        mesh.subsets[0].index_count = 18;
        mesh.subsets.push(MeshSubset {
            index_offset: 18,
            index_count: 18,
            material: Material {
                roughness: 0.9,
                water: true,
                ..Material::new("Blue")
            },
        });
        let object = Object::new(mesh);

        let mut writer = ArchiveWriter::new();
        object.write_archive(&mut writer).unwrap();
        let mut reader = ArchiveReader::from_bytes(writer.into_bytes()).unwrap();
        let restored = Object::read_archive(&mut reader).unwrap();

        assert_eq!(restored.mesh.subsets, object.mesh.subsets);
        assert!(restored.mesh.render_data().is_some());
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_object_without_subsets() {
        let object = Object::new(Mesh::new("Empty"));
        let mut writer = ArchiveWriter::new();
        object.write_archive(&mut writer).unwrap();
        let mut reader = ArchiveReader::from_bytes(writer.into_bytes()).unwrap();
        let restored = Object::read_archive(&mut reader).unwrap();
        assert!(restored.mesh.subsets.is_empty());
        assert_eq!(restored.mesh.name, "Empty");
    }
}
