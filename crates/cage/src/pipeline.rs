//! Automatic cage generation.
//!
//! Stages:
//! 1. PCA box of the model vertices; voxel size from its longest span
//! 2. Solid voxelization of the model in that box
//! 3. Point set = model vertices + inner and feature voxel centers
//! 4. PCA box of the point set, held fixed for the rest of the run
//! 5. Occupancy lattice over that box with the same voxel size
//! 6. Recursive box tree, stitched into one world-space mesh

use glam::Vec3;

use cage_config::CageConfig;

use crate::error::CageError;
use crate::mesh::MeshData;
use crate::obb::PrincipalAxes;
use crate::partition::{SplitPolicy, build_tree, generate_obb_space};
use crate::voxel;

/// Output of [`generate_cage`].
#[derive(Debug, Clone)]
pub struct GeneratedCage {
    /// Stitched leaf boxes in world space, with normals
    pub cage: MeshData,
    /// Points the occupancy lattice was built from
    pub point_set: Vec<Vec3>,
    /// Initial box of the model vertices
    pub obb: PrincipalAxes,
    pub voxel_size: f32,
    pub leaf_count: usize,
}

/// Generate a cage enclosing `model`.
pub fn generate_cage(model: &MeshData, config: &CageConfig) -> Result<GeneratedCage, CageError> {
    model.validate()?;

    let obb = PrincipalAxes::fit(&model.unique_positions())?;
    let voxel_size = config.voxel_size_for(obb.longest_span());
    tracing::info!(
        "Cage generation: model OBB spans {:.4} x {:.4} x {:.4}, voxel size {:.5}",
        obb.axes[0].span(),
        obb.axes[1].span(),
        obb.axes[2].span(),
        voxel_size
    );

    let classification = voxel::classify(model, &obb, voxel_size)?;
    let point_set = classification.point_set;
    tracing::info!("Cage generation: {} points in augmented set", point_set.len());

    let grid = generate_obb_space(&point_set, voxel_size)?;
    let tree = build_tree(&grid, grid.full_ranges(), 0, &SplitPolicy::from(config));
    let cage = tree.to_mesh(grid.frame());

    tracing::info!(
        "Cage generation: {} leaf boxes, {} vertices, {} triangles",
        tree.leaf_count,
        cage.vertex_count(),
        cage.triangle_count()
    );

    Ok(GeneratedCage {
        cage,
        point_set,
        obb,
        voxel_size,
        leaf_count: tree.leaf_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two 4x4x4 blocks joined end to end by a thin bar along X.
    fn create_test_dumbbell() -> MeshData {
        let parts = [
            MeshData::cuboid(Vec3::new(-2.0, -2.0, -2.0), Vec3::new(2.0, 2.0, 2.0)),
            MeshData::cuboid(Vec3::new(2.0, -0.25, -0.25), Vec3::new(6.0, 0.25, 0.25)),
            MeshData::cuboid(Vec3::new(6.0, -2.0, -2.0), Vec3::new(10.0, 2.0, 2.0)),
        ];

        let mut mesh = MeshData::default();
        for part in parts {
            let offset = mesh.positions.len() as u32;
            mesh.positions.extend(part.positions);
            mesh.triangles
                .extend(part.triangles.into_iter().map(|i| i + offset));
        }
        mesh
    }

    fn assert_encloses(cage: &MeshData, model: &MeshData, tolerance: f32) {
        let (lo, hi) = cage.positions.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), &p| (lo.min(p), hi.max(p)),
        );
        for p in &model.positions {
            assert!(
                p.cmpge(lo - tolerance).all() && p.cmple(hi + tolerance).all(),
                "Model vertex {:?} outside cage bounds {:?}..{:?}",
                p,
                lo,
                hi
            );
        }
    }

    #[test]
    fn test_box_model_cage() {
        let model = MeshData::cuboid(Vec3::new(-1.0, -2.0, -4.0), Vec3::new(1.0, 2.0, 4.0));
        let result = generate_cage(&model, &CageConfig::with_resolution(32)).unwrap();

        assert!((result.voxel_size - 0.25).abs() < 1e-5);
        assert!(result.leaf_count >= 1);
        assert_eq!(result.cage.vertex_count(), 8 * result.leaf_count);
        assert!(result.cage.validate().is_ok());
        assert_eq!(result.cage.normals.len(), result.cage.vertex_count());
        assert_encloses(&result.cage, &model, result.voxel_size);
    }

    #[test]
    fn test_dumbbell_model_is_split() {
        let model = create_test_dumbbell();
        let result = generate_cage(&model, &CageConfig::default()).unwrap();

        assert!(
            result.leaf_count >= 2,
            "Dumbbell produced {} leaf boxes",
            result.leaf_count
        );
        assert!(result.cage.validate().is_ok());
        assert_encloses(&result.cage, &model, result.voxel_size);
    }

    #[test]
    fn test_depth_zero_gives_single_box() {
        let model = create_test_dumbbell();
        let config = CageConfig {
            max_recursive_depth: 0,
            ..CageConfig::default()
        };
        let result = generate_cage(&model, &config).unwrap();
        assert_eq!(result.leaf_count, 1);
        assert_eq!(result.cage.triangle_count(), 12);
    }

    #[test]
    fn test_point_set_includes_model_vertices() {
        let model = MeshData::cuboid(Vec3::splat(-1.0), Vec3::new(1.0, 1.5, 2.0));
        let result = generate_cage(&model, &CageConfig::with_resolution(16)).unwrap();
        for v in model.unique_positions() {
            assert!(result.point_set.contains(&v));
        }
    }

    #[test]
    fn test_empty_model() {
        assert!(matches!(
            generate_cage(&MeshData::default(), &CageConfig::default()),
            Err(CageError::EmptyPointSet)
        ));
    }
}
