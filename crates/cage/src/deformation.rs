//! Cage-driven model deformation.
//!
//! Once a model is bound, every model vertex is an affine combination of the
//! cage vertices. Moving cage vertices and re-evaluating that combination is
//! the whole deformation; normals are regenerated afterwards so lighting
//! follows the new shape.

use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::mesh::MeshData;
use crate::selection::CageSelection;
use crate::weights::WeightMatrix;

/// Result of a deformation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeformationResult {
    /// Model vertices whose positions were re-evaluated. Vertices with an
    /// all-zero weight row are left in place and not counted.
    pub vertices_updated: usize,
}

/// Re-evaluate every model position from the current cage positions.
///
/// Returns `None` (and leaves the model untouched) when the weight matrix is
/// empty or was computed for a different model/cage pair.
pub fn deform(
    model: &mut MeshData,
    cage: &MeshData,
    weights: &WeightMatrix,
) -> Option<DeformationResult> {
    if weights.is_empty() {
        tracing::debug!("deform: no weights bound, skipping");
        return None;
    }
    if let Err(e) = weights.check_shape(model, cage) {
        tracing::warn!("deform: {}", e);
        return None;
    }

    // Rows left all-zero by binding keep their position
    let is_bound = |i: usize| weights.row_sum(i).abs() > f32::EPSILON;

    let evaluate = |(i, position): (usize, &mut Vec3)| {
        if !is_bound(i) {
            return;
        }
        *position = weights
            .row(i)
            .iter()
            .zip(&cage.positions)
            .fold(Vec3::ZERO, |acc, (&w, &v)| acc + w * v);
    };

    #[cfg(feature = "parallel")]
    model.positions.par_iter_mut().enumerate().for_each(evaluate);
    #[cfg(not(feature = "parallel"))]
    model.positions.iter_mut().enumerate().for_each(evaluate);

    model.recompute_normals();

    let vertices_updated = (0..weights.rows()).filter(|&i| is_bound(i)).count();
    if vertices_updated < model.vertex_count() {
        tracing::debug!(
            "deform: {} unbound model vertices kept their positions",
            model.vertex_count() - vertices_updated
        );
    }

    Some(DeformationResult { vertices_updated })
}

/// Add `delta` to every selected cage vertex.
///
/// Returns whether any vertex moved. Deformation is not triggered here; the
/// session decides whether a binding exists.
pub fn translate_selected(cage: &mut MeshData, selection: &CageSelection, delta: Vec3) -> bool {
    let mut moved = false;
    for (position, _) in cage
        .positions
        .iter_mut()
        .zip(selection.mask())
        .filter(|(_, selected)| **selected)
    {
        *position += delta;
        moved = true;
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::compute_mean_value_weights;

    fn create_test_pair() -> (MeshData, MeshData) {
        let cage = MeshData::cuboid(Vec3::splat(-2.0), Vec3::splat(2.0));
        let model = MeshData::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0));
        (model, cage)
    }

    #[test]
    fn test_identity_deformation() {
        let (mut model, cage) = create_test_pair();
        let original = model.positions.clone();
        let weights = compute_mean_value_weights(&model, &cage, f32::EPSILON).unwrap();

        let result = deform(&mut model, &cage, &weights).unwrap();
        assert_eq!(result.vertices_updated, 8);

        for (before, after) in original.iter().zip(&model.positions) {
            assert!(
                (*before - *after).length() < 1e-3,
                "Unchanged cage moved {:?} to {:?}",
                before,
                after
            );
        }
        assert_eq!(model.normals.len(), model.vertex_count());
    }

    #[test]
    fn test_translating_whole_cage_translates_model() {
        let (mut model, mut cage) = create_test_pair();
        let original = model.positions.clone();
        let weights = compute_mean_value_weights(&model, &cage, f32::EPSILON).unwrap();

        let mut selection = CageSelection::new(cage.vertex_count());
        selection.select_all();
        let delta = Vec3::new(3.0, -1.0, 0.5);
        assert!(translate_selected(&mut cage, &selection, delta));

        deform(&mut model, &cage, &weights).unwrap();
        for (before, after) in original.iter().zip(&model.positions) {
            assert!((*before + delta - *after).length() < 1e-3);
        }
    }

    #[test]
    fn test_deform_without_weights_is_noop() {
        let (mut model, cage) = create_test_pair();
        let original = model.clone();

        assert!(deform(&mut model, &cage, &WeightMatrix::default()).is_none());
        assert_eq!(model, original);
    }

    #[test]
    fn test_deform_rejects_mismatched_weights() {
        let (mut model, cage) = create_test_pair();
        let weights = WeightMatrix::from_rows(vec![vec![1.0; 8]; 3]);
        assert!(deform(&mut model, &cage, &weights).is_none());
    }

    #[test]
    fn test_unbound_vertex_keeps_position() {
        // A collinear cage contributes nothing, leaving the row all-zero
        let cage = MeshData::new(
            vec![Vec3::X, Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)],
            vec![0, 1, 2],
        )
        .unwrap();
        let mut model = MeshData::new(vec![Vec3::new(0.0, -1.0, 0.0)], Vec::new()).unwrap();
        let weights = compute_mean_value_weights(&model, &cage, f32::EPSILON).unwrap();
        assert_eq!(weights.row_sum(0), 0.0);

        let result = deform(&mut model, &cage, &weights).unwrap();
        assert_eq!(result.vertices_updated, 0);
        assert_eq!(model.positions[0], Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_translate_only_selected() {
        let (_, mut cage) = create_test_pair();
        let original = cage.positions.clone();

        let mut selection = CageSelection::new(cage.vertex_count());
        assert!(!translate_selected(&mut cage, &selection, Vec3::X));

        selection.select_range(2, 1);
        assert!(translate_selected(&mut cage, &selection, Vec3::X));
        assert_eq!(cage.positions[2], original[2] + Vec3::X);
        assert_eq!(cage.positions[3], original[3]);
    }
}
