//! Object placement (position, Euler rotation, scale) for model and cage.
//!
//! Binding and deformation work on local vertex positions; the object
//! transform only places a mesh in the scene. Values mirror what an editor
//! shows, so rotations are in degrees.

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::mesh::MeshData;

/// Position, rotation (degrees, applied Z then Y then X) and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub position: Vec3,
    pub rotation_degrees: Vec3,
    pub scale: Vec3,
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_degrees: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl ObjectTransform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Model matrix `T * Rx * Ry * Rz * S`.
    pub fn matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_x(self.rotation_degrees.x.to_radians())
            * Mat4::from_rotation_y(self.rotation_degrees.y.to_radians())
            * Mat4::from_rotation_z(self.rotation_degrees.z.to_radians());
        Mat4::from_translation(self.position) * rotation * Mat4::from_scale(self.scale)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix().transform_point3(point)
    }

    /// Copy of `mesh` with the transform baked into positions and normals.
    pub fn apply(&self, mesh: &MeshData) -> MeshData {
        let matrix = self.matrix();
        let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();

        MeshData {
            positions: mesh
                .positions
                .iter()
                .map(|&p| matrix.transform_point3(p))
                .collect(),
            triangles: mesh.triangles.clone(),
            normals: mesh
                .normals
                .iter()
                .map(|&n| (normal_matrix * n).normalize_or_zero())
                .collect(),
            uvs: mesh.uvs.clone(),
        }
    }
}
