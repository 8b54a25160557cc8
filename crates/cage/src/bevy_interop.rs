//! Conversion between [`MeshData`] and Bevy meshes.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::Mesh;
use glam::{Vec2, Vec3};

use crate::error::CageError;
use crate::mesh::MeshData;

impl MeshData {
    /// Build from a triangle-list Bevy mesh with positions and indices.
    ///
    /// Normals and UVs are copied when present.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Result<Self, CageError> {
        let positions: Vec<Vec3> = mesh
            .attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(|attr| attr.as_float3())
            .ok_or(CageError::MissingBevyAttribute("positions"))?
            .iter()
            .copied()
            .map(Vec3::from_array)
            .collect();

        let normals: Vec<Vec3> = mesh
            .attribute(Mesh::ATTRIBUTE_NORMAL)
            .and_then(|attr| attr.as_float3())
            .map(|n| n.iter().copied().map(Vec3::from_array).collect())
            .unwrap_or_default();

        let uvs: Vec<Vec2> = mesh
            .attribute(Mesh::ATTRIBUTE_UV_0)
            .and_then(|attr| match attr {
                VertexAttributeValues::Float32x2(v) => {
                    Some(v.iter().copied().map(Vec2::from_array).collect())
                }
                _ => None,
            })
            .unwrap_or_default();

        let triangles: Vec<u32> = match mesh.indices() {
            Some(Indices::U16(idx)) => idx.iter().map(|&i| i as u32).collect(),
            Some(Indices::U32(idx)) => idx.to_vec(),
            None => return Err(CageError::MissingBevyAttribute("indices")),
        };

        let mesh = MeshData {
            positions,
            triangles,
            normals,
            uvs,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Triangle-list Bevy mesh. Missing normals are generated.
    pub fn to_bevy_mesh(&self) -> Mesh {
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        let normals: Vec<[f32; 3]> = if self.normals.is_empty() {
            self.generate_normals().iter().map(|n| n.to_array()).collect()
        } else {
            self.normals.iter().map(|n| n.to_array()).collect()
        };

        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
        if !self.uvs.is_empty() {
            let uvs: Vec<[f32; 2]> = self.uvs.iter().map(|uv| uv.to_array()).collect();
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        }
        mesh.insert_indices(Indices::U32(self.triangles.clone()));
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]],
        );
        mesh.insert_indices(Indices::U16(vec![0, 1, 2]));
        mesh
    }

    #[test]
    fn test_from_bevy_mesh_single_triangle() {
        let mesh = MeshData::from_bevy_mesh(&create_test_triangle_mesh()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangles, vec![0, 1, 2]);
        assert!(mesh.normals.is_empty());
    }

    #[test]
    fn test_missing_indices() {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, vec![[0.0f32, 0.0, 0.0]]);
        assert!(matches!(
            MeshData::from_bevy_mesh(&mesh),
            Err(CageError::MissingBevyAttribute("indices"))
        ));
    }

    #[test]
    fn test_to_bevy_mesh_generates_normals() {
        let cube = MeshData::cuboid(Vec3::ZERO, Vec3::ONE);
        let bevy_mesh = cube.to_bevy_mesh();

        let back = MeshData::from_bevy_mesh(&bevy_mesh).unwrap();
        assert_eq!(back.positions, cube.positions);
        assert_eq!(back.triangles, cube.triangles);
        assert_eq!(back.normals, cube.generate_normals());
    }
}
