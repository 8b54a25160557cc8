//! Oriented bounding boxes from principal component analysis.
//!
//! The covariance of a point set is symmetric, so its eigenvectors form a
//! real orthonormal basis. Projecting the points onto each eigenvector gives
//! the box extent along it. Axes are stored sorted by ascending span so the
//! scan axis of the voxelizer is always `axes[0]` and the longest is
//! `axes[2]`.

use glam::Vec3;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::CageError;
use crate::mesh::MeshData;

/// One box axis with the projected extent of the fitted points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SortableAxis {
    /// Unit direction
    pub axis: Vec3,
    pub min: f32,
    pub max: f32,
}

impl SortableAxis {
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn center(&self) -> f32 {
        0.5 * (self.min + self.max)
    }

    /// Signed coordinate of `point` along this axis.
    pub fn project(&self, point: Vec3) -> f32 {
        point.dot(self.axis)
    }
}

/// PCA-fitted oriented bounding box.
///
/// The frame is right-handed: `axes[0] × axes[1] = axes[2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalAxes {
    pub axes: [SortableAxis; 3],
    pub centroid: Vec3,
}

impl PrincipalAxes {
    /// Fit an oriented box to `points`.
    pub fn fit(points: &[Vec3]) -> Result<Self, CageError> {
        if points.is_empty() {
            return Err(CageError::EmptyPointSet);
        }

        let centroid = points.iter().copied().sum::<Vec3>() / points.len() as f32;

        let mut covariance = Matrix3::<f64>::zeros();
        for p in points {
            let d = (*p - centroid).as_dvec3();
            let d = nalgebra::Vector3::new(d.x, d.y, d.z);
            covariance += d * d.transpose();
        }
        covariance /= points.len() as f64;

        let eigen = covariance.symmetric_eigen();
        let mut axes: [SortableAxis; 3] = std::array::from_fn(|k| {
            let column = eigen.eigenvectors.column(k);
            let axis = Vec3::new(column[0] as f32, column[1] as f32, column[2] as f32)
                .normalize_or_zero();
            let (min, max) = points
                .iter()
                .map(|p| p.dot(axis))
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), t| {
                    (lo.min(t), hi.max(t))
                });
            SortableAxis { axis, min, max }
        });

        axes.sort_by(|a, b| a.span().total_cmp(&b.span()));

        // Mirror the last axis if the eigenbasis came out left-handed
        if axes[0].axis.cross(axes[1].axis).dot(axes[2].axis) < 0.0 {
            let last = &mut axes[2];
            *last = SortableAxis {
                axis: -last.axis,
                min: -last.max,
                max: -last.min,
            };
        }

        tracing::trace!(
            "PCA fit over {} points: spans {:.4} / {:.4} / {:.4}",
            points.len(),
            axes[0].span(),
            axes[1].span(),
            axes[2].span()
        );

        Ok(Self { axes, centroid })
    }

    /// Unit axis directions, shortest first.
    pub fn directions(&self) -> [Vec3; 3] {
        self.axes.map(|a| a.axis)
    }

    pub fn shortest(&self) -> &SortableAxis {
        &self.axes[0]
    }

    pub fn longest(&self) -> &SortableAxis {
        &self.axes[2]
    }

    pub fn longest_span(&self) -> f32 {
        self.longest().span()
    }

    /// World-space center of the box (not the centroid of the points).
    pub fn center(&self) -> Vec3 {
        self.axes.iter().map(|a| a.axis * a.center()).sum()
    }

    /// Box corners, corner `i` taking `max` on axis `k` when bit `k` of `i` is set.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            self.axes
                .iter()
                .enumerate()
                .map(|(k, a)| a.axis * if i >> k & 1 == 1 { a.max } else { a.min })
                .sum()
        })
    }

    /// Box mesh with outward normals, for display.
    pub fn box_mesh(&self) -> MeshData {
        let mut mesh = MeshData::from_box_corners(self.corners());
        mesh.recompute_normals();
        mesh
    }
}
