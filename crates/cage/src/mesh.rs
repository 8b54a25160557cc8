//! Triangle mesh container shared by the model and the cage.
//!
//! Vertex indices are stable: once a vertex is created its index never
//! changes, only its position does. The triangle list is a flat sequence of
//! indices consumed in groups of three (CCW winding viewed from outside).

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CageError;

/// Corner-index triples of a box whose corner `i` sits at
/// `(i & 1, (i >> 1) & 1, (i >> 2) & 1)` in its own frame.
///
/// Every triangle is CCW when viewed from outside a right-handed frame.
pub const BOX_TRIANGLES: [u32; 36] = [
    0, 4, 6, 0, 6, 2, // -X
    1, 3, 7, 1, 7, 5, // +X
    0, 1, 5, 0, 5, 4, // -Y
    2, 6, 7, 2, 7, 3, // +Y
    0, 2, 3, 0, 3, 1, // -Z
    4, 5, 7, 4, 7, 6, // +Z
];

/// Passive triangle mesh: positions, optional normals/uvs, triangle indices.
///
/// Invariants (checked by [`MeshData::validate`]): every index is below
/// `positions.len()`, the index count is a multiple of 3, and the optional
/// attribute arrays are either empty or one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
}

impl MeshData {
    /// Build a mesh from positions and a flat triangle list.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<u32>) -> Result<Self, CageError> {
        let mesh = Self {
            positions,
            triangles,
            normals: Vec::new(),
            uvs: Vec::new(),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Attach per-vertex normals.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Result<Self, CageError> {
        self.normals = normals;
        self.validate()?;
        Ok(self)
    }

    /// Attach per-vertex texture coordinates.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Result<Self, CageError> {
        self.uvs = uvs;
        self.validate()?;
        Ok(self)
    }

    /// Axis-aligned box with 8 corners and 12 outward-facing triangles.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let corners = std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        });
        Self::from_box_corners(corners)
    }

    /// Box mesh from 8 corners laid out as in [`BOX_TRIANGLES`].
    pub fn from_box_corners(corners: [Vec3; 8]) -> Self {
        Self {
            positions: corners.to_vec(),
            triangles: BOX_TRIANGLES.to_vec(),
            normals: Vec::new(),
            uvs: Vec::new(),
        }
    }

    /// Check the index and attribute-length invariants.
    pub fn validate(&self) -> Result<(), CageError> {
        if self.triangles.len() % 3 != 0 {
            return Err(CageError::IncompleteTriangle(self.triangles.len()));
        }

        let vertex_count = self.positions.len();
        if let Some(&index) = self.triangles.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(CageError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        if !self.normals.is_empty() && self.normals.len() != vertex_count {
            return Err(CageError::AttributeLength {
                attribute: "normals",
                len: self.normals.len(),
                vertex_count,
            });
        }
        if !self.uvs.is_empty() && self.uvs.len() != vertex_count {
            return Err(CageError::AttributeLength {
                attribute: "uvs",
                len: self.uvs.len(),
                vertex_count,
            });
        }

        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.triangles
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
    }

    /// Positions of the three corners of an index triple.
    pub fn triangle_positions(&self, tri: [u32; 3]) -> [Vec3; 3] {
        tri.map(|i| self.positions[i as usize])
    }

    /// Per-vertex normals from accumulated unit face normals.
    ///
    /// Degenerate faces contribute nothing, and a vertex whose accumulated
    /// normal is degenerate gets the zero vector ("no well-defined normal").
    pub fn generate_normals(&self) -> Vec<Vec3> {
        let mut accum = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.triangles() {
            let [p1, p2, p3] = self.triangle_positions(tri);
            let normal = face_normal(p1, p2, p3);
            for i in tri {
                accum[i as usize] += normal;
            }
        }

        accum.into_iter().map(Vec3::normalize_or_zero).collect()
    }

    /// Replace the stored normals with freshly generated ones.
    pub fn recompute_normals(&mut self) {
        self.normals = self.generate_normals();
    }

    /// Positions with duplicates (within 1e-6) removed, first occurrence kept.
    pub fn unique_positions(&self) -> Vec<Vec3> {
        let quantize = |p: Vec3| -> [i64; 3] {
            [
                (p.x * 1_000_000.0).round() as i64,
                (p.y * 1_000_000.0).round() as i64,
                (p.z * 1_000_000.0).round() as i64,
            ]
        };

        let mut seen: HashSet<[i64; 3]> = HashSet::with_capacity(self.positions.len());
        self.positions
            .iter()
            .copied()
            .filter(|&p| seen.insert(quantize(p)))
            .collect()
    }

    /// Raw position bytes for a vertex buffer upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Raw normal bytes for a vertex buffer upload.
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    /// Raw index bytes for an index buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }
}

/// Unit normal of triangle (p1, p2, p3), or zero when degenerate.
pub fn face_normal(p1: Vec3, p2: Vec3, p3: Vec3) -> Vec3 {
    (p2 - p1).cross(p3 - p2).normalize_or_zero()
}
