//! Solid voxelization of the model in its oriented bounding box.
//!
//! The grid is aligned with the PCA frame and padded by at least one voxel on
//! every side. Triangles are sampled densely enough that every voxel their
//! surface crosses receives a sample; those voxels become [`VoxelClass::Feature`]
//! and carry the averaged face normal. Lines along the shortest axis are then
//! scanned: a run of empty voxels closed by a feature voxel facing forward
//! along the scan axis lies inside the solid.

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::CageError;
use crate::mesh::{MeshData, face_normal};
use crate::obb::PrincipalAxes;

/// Classification of one voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoxelClass {
    #[default]
    Outer = 0,
    /// Crossed by the model surface
    Feature = 1,
    /// Inside the solid
    Inner = 2,
}

/// A voxel lattice laid over an oriented frame.
///
/// Voxel `(i, j, k)` covers local coordinates
/// `origin[a] + idx[a] * voxel_size ..= origin[a] + (idx[a] + 1) * voxel_size`
/// on each axis `a`, where local coordinates are dot products with `axes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelFrame {
    pub axes: [Vec3; 3],
    /// Local coordinate of the lattice corner on each axis
    pub origin: Vec3,
    pub voxel_size: f32,
    pub dims: UVec3,
}

impl VoxelFrame {
    /// Lattice covering the box `obb` with whole voxels and one voxel of margin.
    pub fn from_axes(obb: &PrincipalAxes, voxel_size: f32) -> Result<Self, CageError> {
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(CageError::InvalidVoxelSize(voxel_size));
        }

        let mut origin = Vec3::ZERO;
        let mut dims = UVec3::ZERO;
        for (k, axis) in obb.axes.iter().enumerate() {
            let half_voxels = (0.5 * axis.span() / voxel_size).ceil() as u32 + 1;
            origin[k] = axis.center() - half_voxels as f32 * voxel_size;
            dims[k] = 2 * half_voxels;
        }

        Ok(Self {
            axes: obb.directions(),
            origin,
            voxel_size,
            dims,
        })
    }

    pub fn voxel_count(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }

    /// Position in lattice units: voxel `idx` spans `idx..idx + 1`.
    pub fn to_lattice(&self, point: Vec3) -> Vec3 {
        let local = Vec3::new(
            point.dot(self.axes[0]),
            point.dot(self.axes[1]),
            point.dot(self.axes[2]),
        );
        (local - self.origin) / self.voxel_size
    }

    /// World position of a lattice-unit coordinate.
    pub fn from_lattice(&self, lattice: Vec3) -> Vec3 {
        let local = self.origin + lattice * self.voxel_size;
        self.axes[0] * local.x + self.axes[1] * local.y + self.axes[2] * local.z
    }

    /// Voxel containing `point`, or `None` outside the lattice.
    pub fn voxel_index(&self, point: Vec3) -> Option<UVec3> {
        self.lattice_voxel(self.to_lattice(point))
    }

    /// Voxel containing `point`, clamped onto the lattice.
    pub fn voxel_index_clamped(&self, point: Vec3) -> UVec3 {
        let lattice = self.to_lattice(point).floor().max(Vec3::ZERO);
        lattice.as_uvec3().min(self.dims.saturating_sub(UVec3::ONE))
    }

    pub fn voxel_center(&self, idx: UVec3) -> Vec3 {
        self.from_lattice(idx.as_vec3() + Vec3::splat(0.5))
    }

    /// Flat index, axis 0 fastest.
    pub fn linear_index(&self, idx: UVec3) -> usize {
        let (nx, ny) = (self.dims.x as usize, self.dims.y as usize);
        idx.x as usize + nx * (idx.y as usize + ny * idx.z as usize)
    }

    pub fn voxel_from_linear(&self, linear: usize) -> UVec3 {
        let nx = self.dims.x as usize;
        let ny = self.dims.y as usize;
        UVec3::new(
            (linear % nx) as u32,
            (linear / nx % ny) as u32,
            (linear / (nx * ny)) as u32,
        )
    }

    fn lattice_voxel(&self, lattice: Vec3) -> Option<UVec3> {
        let cell = lattice.floor();
        if cell.cmplt(Vec3::ZERO).any() || cell.cmpge(self.dims.as_vec3()).any() {
            return None;
        }
        Some(cell.as_uvec3())
    }
}

/// Per-voxel classes and averaged surface normals.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    pub frame: VoxelFrame,
    pub classes: Vec<VoxelClass>,
    /// Unit averaged face normal for feature voxels, zero elsewhere
    pub normals: Vec<Vec3>,
}

impl VoxelGrid {
    pub fn new(frame: VoxelFrame) -> Self {
        let count = frame.voxel_count();
        Self {
            frame,
            classes: vec![VoxelClass::Outer; count],
            normals: vec![Vec3::ZERO; count],
        }
    }

    pub fn class_at(&self, idx: UVec3) -> VoxelClass {
        self.classes[self.frame.linear_index(idx)]
    }

    pub fn count(&self, class: VoxelClass) -> usize {
        self.classes.iter().filter(|&&c| c == class).count()
    }

    /// World-space centers of every voxel with one of the given classes.
    pub fn centers_of(&self, wanted: &[VoxelClass]) -> impl Iterator<Item = Vec3> {
        self.classes
            .iter()
            .enumerate()
            .filter(move |(_, c)| wanted.contains(c))
            .map(|(i, _)| self.frame.voxel_center(self.frame.voxel_from_linear(i)))
    }

    /// Mark every voxel the surface of `model` crosses and average the normals.
    fn mark_features(&mut self, model: &MeshData) {
        let mut touched: Vec<usize> = Vec::new();

        for tri in model.triangles() {
            let [p1, p2, p3] = model.triangle_positions(tri);
            let normal = face_normal(p1, p2, p3);

            touched.clear();
            sample_triangle(&self.frame, [p1, p2, p3], |idx| {
                touched.push(self.frame.linear_index(idx));
            });
            touched.sort_unstable();
            touched.dedup();

            for &i in &touched {
                self.classes[i] = VoxelClass::Feature;
                self.normals[i] += normal;
            }
        }

        for (class, normal) in self.classes.iter().zip(self.normals.iter_mut()) {
            if *class == VoxelClass::Feature {
                *normal = normal.normalize_or_zero();
            }
        }
    }

    /// Scan every line along axis 0 and fill closed runs of empty voxels.
    fn fill_inner(&mut self) {
        let scan_axis = self.frame.axes[0];
        let dims = self.frame.dims;
        let mut pending: Vec<usize> = Vec::new();

        for z in 0..dims.z {
            for y in 0..dims.y {
                pending.clear();
                let mut inside_hull = false;

                for x in 0..dims.x {
                    let i = self.frame.linear_index(UVec3::new(x, y, z));
                    if self.classes[i] != VoxelClass::Feature {
                        if inside_hull {
                            pending.push(i);
                        }
                        continue;
                    }

                    if inside_hull && self.normals[i].dot(scan_axis) > 0.0 {
                        for &p in &pending {
                            self.classes[p] = VoxelClass::Inner;
                        }
                    }
                    pending.clear();
                    inside_hull = true;
                }
            }
        }
    }
}

/// Lattice distance below which a sample is treated as lying on a voxel
/// boundary.
const BOUNDARY_SNAP: f32 = 1e-4;

/// Move lattice coordinates within [`BOUNDARY_SNAP`] of an integer onto it.
///
/// A face lying in a voxel boundary plane otherwise scatters its samples
/// across both neighbouring layers, and the scan closes the gaps between
/// them into inner runs outside the solid.
fn snap_to_boundary(lattice: Vec3) -> Vec3 {
    let nearest = lattice.round();
    let on_boundary = (lattice - nearest).abs().cmplt(Vec3::splat(BOUNDARY_SNAP));
    Vec3::select(on_boundary, nearest, lattice)
}

/// Feed the voxel of every sample on triangle `corners` to `visit`.
///
/// Samples are spaced at most half a voxel apart along both edges leaving
/// the first corner, and the three corners are always sampled. Samples on a
/// voxel boundary go to the voxel above it.
fn sample_triangle(frame: &VoxelFrame, corners: [Vec3; 3], mut visit: impl FnMut(UVec3)) {
    let [a, b, c] = corners.map(|p| frame.to_lattice(p));
    let ab = b - a;
    let ac = c - a;

    let steps_u = (2.0 * ab.abs().max_element()).ceil().max(1.0) as u32;
    let steps_v = (2.0 * ac.abs().max_element()).ceil().max(1.0) as u32;

    for i in 0..=steps_u {
        let u = i as f32 / steps_u as f32;
        for j in 0..=steps_v {
            let v = j as f32 / steps_v as f32;
            if u + v > 1.0 + 1e-6 {
                break;
            }
            if let Some(idx) = frame.lattice_voxel(snap_to_boundary(a + u * ab + v * ac)) {
                visit(idx);
            }
        }
    }

    for corner in [a, b, c] {
        if let Some(idx) = frame.lattice_voxel(snap_to_boundary(corner)) {
            visit(idx);
        }
    }
}

/// Voxel grid of a model plus the point set the cage tree is built from.
#[derive(Debug, Clone)]
pub struct VoxelClassification {
    pub grid: VoxelGrid,
    /// Unique model vertices followed by inner and feature voxel centers
    pub point_set: Vec<Vec3>,
}

/// Voxelize `model` inside the box `obb` with cubic voxels of `voxel_size`.
pub fn classify(
    model: &MeshData,
    obb: &PrincipalAxes,
    voxel_size: f32,
) -> Result<VoxelClassification, CageError> {
    model.validate()?;
    let frame = VoxelFrame::from_axes(obb, voxel_size)?;

    let mut grid = VoxelGrid::new(frame);
    grid.mark_features(model);
    grid.fill_inner();

    let mut point_set = model.unique_positions();
    let vertex_points = point_set.len();
    point_set.extend(grid.centers_of(&[VoxelClass::Inner, VoxelClass::Feature]));

    tracing::debug!(
        "Voxelized {} triangles on a {}x{}x{} grid: {} feature, {} inner, {} points ({} from vertices)",
        model.triangle_count(),
        frame.dims.x,
        frame.dims.y,
        frame.dims.z,
        grid.count(VoxelClass::Feature),
        grid.count(VoxelClass::Inner),
        point_set.len(),
        vertex_points
    );

    Ok(VoxelClassification { grid, point_set })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obb::SortableAxis;

    const HALF: Vec3 = Vec3::new(1.3, 2.1, 3.2);

    fn create_test_box() -> (MeshData, PrincipalAxes) {
        let model = MeshData::cuboid(-HALF, HALF);
        let obb = PrincipalAxes::fit(&model.unique_positions()).unwrap();
        (model, obb)
    }

    #[test]
    fn test_frame_padding() {
        let (_, obb) = create_test_box();
        let frame = VoxelFrame::from_axes(&obb, 0.5).unwrap();

        // ceil(half / 0.5) + 1 voxels on each side of the center
        assert_eq!(frame.dims, UVec3::new(8, 12, 16));
        assert_eq!(frame.voxel_count(), 8 * 12 * 16);

        for k in 0..3 {
            let lattice = frame.to_lattice(obb.corners()[0])[k];
            assert!(lattice >= 1.0, "Box touches the lattice edge on axis {}", k);
        }
    }

    #[test]
    fn test_invalid_voxel_size() {
        let (_, obb) = create_test_box();
        assert!(matches!(
            VoxelFrame::from_axes(&obb, 0.0),
            Err(CageError::InvalidVoxelSize(_))
        ));
        assert!(VoxelFrame::from_axes(&obb, f32::NAN).is_err());
    }

    #[test]
    fn test_linear_index_roundtrip() {
        let (_, obb) = create_test_box();
        let frame = VoxelFrame::from_axes(&obb, 0.5).unwrap();
        let idx = UVec3::new(3, 7, 11);
        assert_eq!(frame.voxel_from_linear(frame.linear_index(idx)), idx);
        assert_eq!(frame.voxel_index(frame.voxel_center(idx)), Some(idx));
    }

    #[test]
    fn test_voxel_index_outside() {
        let (_, obb) = create_test_box();
        let frame = VoxelFrame::from_axes(&obb, 0.5).unwrap();
        let far = Vec3::splat(100.0);
        assert_eq!(frame.voxel_index(far), None);

        let clamped = frame.voxel_index_clamped(far);
        assert!(clamped.cmplt(frame.dims).all());
    }

    #[test]
    fn test_closed_box_fills_interior() {
        let (model, obb) = create_test_box();
        let result = classify(&model, &obb, 0.5).unwrap();

        // Surfaces sit 0.4 voxel inside voxels 1 and dims-2 on every axis,
        // leaving 4 x 8 x 12 strictly interior voxels
        assert_eq!(result.grid.count(VoxelClass::Inner), 4 * 8 * 12);
        assert_eq!(
            result.grid.class_at(result.grid.frame.dims / 2),
            VoxelClass::Inner
        );

        for center in result.grid.centers_of(&[VoxelClass::Inner]) {
            assert!(
                center.abs().cmplt(HALF).all(),
                "Inner voxel center {:?} lies outside the model",
                center
            );
        }
    }

    #[test]
    fn test_feature_normals_are_unit() {
        let (model, obb) = create_test_box();
        let result = classify(&model, &obb, 0.5).unwrap();
        let grid = &result.grid;

        assert!(grid.count(VoxelClass::Feature) > 0);
        for (class, normal) in grid.classes.iter().zip(&grid.normals) {
            match class {
                VoxelClass::Feature => assert!((normal.length() - 1.0).abs() < 1e-4),
                _ => assert_eq!(*normal, Vec3::ZERO),
            }
        }
    }

    #[test]
    fn test_point_set_contains_vertices() {
        let (model, obb) = create_test_box();
        let result = classify(&model, &obb, 0.5).unwrap();
        let grid = &result.grid;

        assert_eq!(&result.point_set[..8], model.unique_positions().as_slice());
        assert_eq!(
            result.point_set.len(),
            8 + grid.count(VoxelClass::Inner) + grid.count(VoxelClass::Feature)
        );
    }

    #[test]
    fn test_near_boundary_face_samples_one_layer() {
        let frame = VoxelFrame {
            axes: [Vec3::X, Vec3::Y, Vec3::Z],
            origin: Vec3::ZERO,
            voxel_size: 1.0,
            dims: UVec3::splat(16),
        };
        let mut layers = std::collections::BTreeSet::new();

        // Tilted by a few ULPs across the x = 9 boundary plane
        let corners = [
            Vec3::new(8.999997, 1.0, 1.0),
            Vec3::new(9.000003, 6.0, 1.0),
            Vec3::new(8.999997, 6.0, 6.0),
        ];
        sample_triangle(&frame, corners, |idx| {
            layers.insert(idx.x);
        });
        assert_eq!(layers.into_iter().collect::<Vec<_>>(), vec![9]);

        let mut layers = std::collections::BTreeSet::new();
        let corners = [
            Vec3::new(8.5, 1.0, 1.0),
            Vec3::new(8.5, 6.0, 1.0),
            Vec3::new(8.5, 6.0, 6.0),
        ];
        sample_triangle(&frame, corners, |idx| {
            layers.insert(idx.x);
        });
        assert_eq!(layers.into_iter().collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn test_faces_on_voxel_boundaries_fill_inside_only() {
        let min = Vec3::ZERO;
        let max = Vec3::new(2.0, 2.0, 1.0);
        let model = MeshData::cuboid(min, max);
        let obb = PrincipalAxes {
            axes: [
                SortableAxis {
                    axis: Vec3::Z,
                    min: 0.0,
                    max: 1.0,
                },
                SortableAxis {
                    axis: Vec3::X,
                    min: 0.0,
                    max: 2.0,
                },
                SortableAxis {
                    axis: Vec3::Y,
                    min: 0.0,
                    max: 2.0,
                },
            ],
            centroid: Vec3::new(1.0, 1.0, 0.5),
        };

        // Every face lies exactly on a lattice plane: 1 and 5 along the scan
        // axis, 1 and 9 along the other two
        let result = classify(&model, &obb, 0.25).unwrap();
        let grid = &result.grid;
        assert_eq!(grid.frame.dims, UVec3::new(6, 10, 10));
        assert_eq!(grid.count(VoxelClass::Inner), 3 * 7 * 7);

        for center in grid.centers_of(&[VoxelClass::Inner]) {
            assert!(
                center.cmpgt(min).all() && center.cmplt(max).all(),
                "Inner voxel center {:?} outside the solid",
                center
            );
        }
    }

    #[test]
    fn test_open_surface_has_no_interior() {
        let model = MeshData::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
            ],
            vec![0, 1, 2],
        )
        .unwrap();
        let obb = PrincipalAxes::fit(&model.positions).unwrap();
        let result = classify(&model, &obb, 0.25).unwrap();

        assert_eq!(result.grid.count(VoxelClass::Inner), 0);
        assert!(result.grid.count(VoxelClass::Feature) > 0);
    }
}
