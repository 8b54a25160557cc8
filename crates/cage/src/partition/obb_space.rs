//! Occupancy grid over the refitted oriented box of the point set.

use glam::{UVec3, Vec3};

use crate::error::CageError;
use crate::obb::PrincipalAxes;
use crate::voxel::VoxelFrame;

/// Inclusive voxel index bounds on each lattice axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRanges {
    pub min: UVec3,
    pub max: UVec3,
}

impl IndexRanges {
    pub fn new(min: UVec3, max: UVec3) -> Self {
        Self { min, max }
    }

    /// Number of indices on `axis`.
    pub fn len(&self, axis: usize) -> u32 {
        self.max[axis] - self.min[axis] + 1
    }

    pub fn contains(&self, idx: UVec3) -> bool {
        idx.cmpge(self.min).all() && idx.cmple(self.max).all()
    }

    /// Split on `axis` into `min..=at` and `at + 1..=max`.
    pub fn split(&self, axis: usize, at: u32) -> (Self, Self) {
        let mut low = *self;
        let mut high = *self;
        low.max[axis] = at;
        high.min[axis] = at + 1;
        (low, high)
    }

    /// Axis indices ordered by length, longest first. On equal lengths the
    /// higher axis index (the longer PCA axis) comes first.
    pub fn axes_by_length(&self) -> [usize; 3] {
        let mut order = [2, 1, 0];
        order.sort_by(|&a, &b| self.len(b).cmp(&self.len(a)));
        order
    }

    fn iter(&self) -> impl Iterator<Item = UVec3> + '_ {
        (self.min.z..=self.max.z).flat_map(move |z| {
            (self.min.y..=self.max.y)
                .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| UVec3::new(x, y, z)))
        })
    }
}

/// Point counts per voxel of a lattice over the oriented box of a point set.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    frame: VoxelFrame,
    counts: Vec<u32>,
}

impl OccupancyGrid {
    /// Empty grid over `frame`.
    pub fn new(frame: VoxelFrame) -> Self {
        Self {
            counts: vec![0; frame.voxel_count()],
            frame,
        }
    }

    /// Add one point; points outside the lattice land in the nearest border voxel.
    pub fn insert(&mut self, point: Vec3) {
        let idx = self.frame.voxel_index_clamped(point);
        let i = self.frame.linear_index(idx);
        self.counts[i] += 1;
    }

    pub fn frame(&self) -> &VoxelFrame {
        &self.frame
    }

    pub fn count(&self, idx: UVec3) -> u32 {
        self.counts[self.frame.linear_index(idx)]
    }

    /// Total number of points inserted.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Ranges covering the whole lattice.
    pub fn full_ranges(&self) -> IndexRanges {
        IndexRanges::new(UVec3::ZERO, self.frame.dims.saturating_sub(UVec3::ONE))
    }

    /// Occupancy of each cross-section perpendicular to `axis` inside `ranges`.
    pub fn profile(&self, axis: usize, ranges: &IndexRanges) -> Vec<u32> {
        let mut profile = vec![0u32; ranges.len(axis) as usize];
        for idx in ranges.iter() {
            profile[(idx[axis] - ranges.min[axis]) as usize] += self.count(idx);
        }
        profile
    }

    /// Shrink `ranges` to the first and last occupied cross-section on every
    /// axis. Returns `None` when the region holds no points.
    pub fn trim(&self, ranges: &IndexRanges) -> Option<IndexRanges> {
        let mut trimmed = *ranges;
        for axis in 0..3 {
            let profile = self.profile(axis, ranges);
            let first = profile.iter().position(|&c| c > 0)?;
            let last = profile.iter().rposition(|&c| c > 0)?;
            trimmed.min[axis] = ranges.min[axis] + first as u32;
            trimmed.max[axis] = ranges.min[axis] + last as u32;
        }
        Some(trimmed)
    }
}

/// Refit the oriented box on `points` and count them into a lattice with
/// cubic voxels of `voxel_size`.
pub fn generate_obb_space(points: &[Vec3], voxel_size: f32) -> Result<OccupancyGrid, CageError> {
    let obb = PrincipalAxes::fit(points)?;
    let frame = VoxelFrame::from_axes(&obb, voxel_size)?;

    let mut grid = OccupancyGrid::new(frame);
    for &p in points {
        grid.insert(p);
    }

    tracing::debug!(
        "OBB space: {} points on a {}x{}x{} lattice (voxel {:.4})",
        points.len(),
        frame.dims.x,
        frame.dims.y,
        frame.dims.z,
        voxel_size
    );

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic scatter of points in a slanted slab.
    fn create_test_points(count: usize) -> Vec<Vec3> {
        let mut state: u32 = 0x2545_f491;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 10_000) as f32 / 10_000.0
        };
        (0..count)
            .map(|_| {
                let (a, b, c) = (next(), next(), next());
                Vec3::new(4.0 * a + b, 2.0 * b, 0.5 * c + a)
            })
            .collect()
    }

    #[test]
    fn test_occupancy_conservation() {
        let points = create_test_points(5000);
        let grid = generate_obb_space(&points, 0.1).unwrap();
        assert_eq!(grid.total(), points.len() as u64);
    }

    #[test]
    fn test_profiles_sum_to_total() {
        let points = create_test_points(800);
        let grid = generate_obb_space(&points, 0.25).unwrap();
        let ranges = grid.full_ranges();

        for axis in 0..3 {
            let profile = grid.profile(axis, &ranges);
            assert_eq!(profile.len() as u32, grid.frame().dims[axis]);
            assert_eq!(profile.iter().map(|&c| c as u64).sum::<u64>(), 800);
        }
    }

    #[test]
    fn test_trim_to_occupied() {
        let points = create_test_points(800);
        let grid = generate_obb_space(&points, 0.25).unwrap();
        let trimmed = grid.trim(&grid.full_ranges()).unwrap();

        // One voxel of padding on each side is always empty
        for axis in 0..3 {
            assert!(trimmed.min[axis] >= 1);
            assert!(trimmed.max[axis] <= grid.frame().dims[axis] - 2);

            let profile = grid.profile(axis, &trimmed);
            assert!(profile[0] > 0);
            assert!(profile[profile.len() - 1] > 0);
        }
    }

    #[test]
    fn test_trim_empty_region() {
        let points = create_test_points(100);
        let grid = generate_obb_space(&points, 0.25).unwrap();
        let corner = IndexRanges::new(UVec3::ZERO, UVec3::ZERO);
        assert_eq!(grid.trim(&corner), None);
    }

    #[test]
    fn test_split_ranges() {
        let ranges = IndexRanges::new(UVec3::new(2, 0, 0), UVec3::new(9, 4, 4));
        let (low, high) = ranges.split(0, 5);
        assert_eq!(low.max.x, 5);
        assert_eq!(high.min.x, 6);
        assert_eq!(low.len(0) + high.len(0), ranges.len(0));
        assert!(low.contains(UVec3::new(5, 4, 4)));
        assert!(!low.contains(UVec3::new(6, 4, 4)));
    }

    #[test]
    fn test_axis_order_ties_prefer_higher_axis() {
        let ranges = IndexRanges::new(UVec3::ZERO, UVec3::new(9, 3, 9));
        assert_eq!(ranges.axes_by_length(), [2, 0, 1]);

        let ranges = IndexRanges::new(UVec3::ZERO, UVec3::new(12, 3, 9));
        assert_eq!(ranges.axes_by_length(), [0, 2, 1]);
    }

    #[test]
    fn test_empty_points() {
        assert!(matches!(
            generate_obb_space(&[], 0.1),
            Err(CageError::EmptyPointSet)
        ));
    }
}
