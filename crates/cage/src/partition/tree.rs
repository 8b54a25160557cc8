//! Recursive box tree over an occupancy grid.
//!
//! Each node trims its region to the occupied voxels, looks for a waist on
//! its longest axis first, and either splits there or becomes a box leaf.
//! Leaves are stitched into one mesh in low-then-high order, so the result
//! does not depend on whether subtrees were built in parallel.

use glam::{UVec3, Vec3};

use crate::mesh::{BOX_TRIANGLES, MeshData};
use crate::voxel::VoxelFrame;

use super::obb_space::{IndexRanges, OccupancyGrid};
use super::splice::search_splice_index;

/// Recursion limits for [`build_tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPolicy {
    /// Nodes at this depth are always leaves
    pub max_depth: u32,
    /// Minima this close to either end of a profile are not split candidates
    pub boundary_margin: usize,
}

impl From<&cage_config::CageConfig> for SplitPolicy {
    fn from(config: &cage_config::CageConfig) -> Self {
        Self {
            max_depth: config.max_recursive_depth,
            boundary_margin: config.splice_boundary_margin,
        }
    }
}

/// Stitched leaf boxes in lattice coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CageTree {
    /// Corners in lattice units (voxel `i` spans `i..i + 1`)
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub leaf_count: usize,
}

impl CageTree {
    /// Box covering every voxel in `ranges`.
    pub fn leaf(ranges: &IndexRanges) -> Self {
        let lo = ranges.min.as_vec3();
        let hi = (ranges.max + UVec3::ONE).as_vec3();
        let vertices = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { lo.x } else { hi.x },
                    if i & 2 == 0 { lo.y } else { hi.y },
                    if i & 4 == 0 { lo.z } else { hi.z },
                )
            })
            .collect();

        Self {
            vertices,
            triangles: BOX_TRIANGLES.to_vec(),
            leaf_count: 1,
        }
    }

    /// Concatenate two subtrees, offsetting `high`'s indices past `low`'s vertices.
    pub fn stitch(mut low: Self, high: Self) -> Self {
        let offset = low.vertices.len() as u32;
        low.vertices.extend(high.vertices);
        low.triangles
            .extend(high.triangles.into_iter().map(|i| i + offset));
        low.leaf_count += high.leaf_count;
        low
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// World-space cage mesh with generated normals.
    pub fn to_mesh(&self, frame: &VoxelFrame) -> MeshData {
        let mut mesh = MeshData {
            positions: self
                .vertices
                .iter()
                .map(|&v| frame.from_lattice(v))
                .collect(),
            triangles: self.triangles.clone(),
            ..MeshData::default()
        };
        mesh.recompute_normals();
        mesh
    }
}

/// Build the box tree for the occupied voxels of `grid` inside `ranges`.
///
/// The lattice frame (axes and voxel size) is shared by every node.
pub fn build_tree(
    grid: &OccupancyGrid,
    ranges: IndexRanges,
    depth: u32,
    policy: &SplitPolicy,
) -> CageTree {
    let Some(ranges) = grid.trim(&ranges) else {
        return CageTree::default();
    };

    if depth >= policy.max_depth {
        tracing::trace!("Depth limit {} reached at {:?}", policy.max_depth, ranges);
        return CageTree::leaf(&ranges);
    }

    for axis in ranges.axes_by_length() {
        let profile = grid.profile(axis, &ranges);
        let Some(offset) = search_splice_index(&profile, policy.boundary_margin) else {
            continue;
        };

        let split = ranges.min[axis] + offset as u32;
        let (low, high) = ranges.split(axis, split);
        tracing::trace!("Depth {}: splitting axis {} at voxel {}", depth, axis, split);

        let (low, high) = join(
            || build_tree(grid, low, depth + 1, policy),
            || build_tree(grid, high, depth + 1, policy),
        );
        return CageTree::stitch(low, high);
    }

    CageTree::leaf(&ranges)
}

#[cfg(feature = "parallel")]
fn join<A, B>(a: impl FnOnce() -> A + Send, b: impl FnOnce() -> B + Send) -> (A, B)
where
    A: Send,
    B: Send,
{
    rayon::join(a, b)
}

#[cfg(not(feature = "parallel"))]
fn join<A, B>(a: impl FnOnce() -> A, b: impl FnOnce() -> B) -> (A, B) {
    (a(), b())
}
