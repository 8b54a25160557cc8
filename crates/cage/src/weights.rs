//! Generalized barycentric binding of model vertices to cage vertices.
//!
//! Every model vertex `x` is written as `x = Σ_j W[i][j] · v_j` over the cage
//! vertices `v_j`. Mean-value coordinates are computed with the "robust"
//! spherical formulation of Ju, Schaefer and Warren: each cage triangle is
//! projected onto the unit sphere around `x` and its spherical triangle
//! contributes to the weights of its three corners.
//!
//! Numerically degenerate triangles are skipped rather than perturbed. The
//! one exception is a model vertex lying on a cage vertex, which aborts the
//! whole computation (see [`CageError::CoincidentVertex`]).

use glam::{DMat3, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::CageError;
use crate::mesh::MeshData;
use crate::types::CoordinateType;

/// Dense `|model| x |cage|` weight matrix, row-major.
///
/// `W[i][j]` is the influence of cage vertex `j` on model vertex `i`. Each
/// computed row sums to 1; entries may be negative for non-convex cages.
/// An empty matrix means "no binding".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl WeightMatrix {
    /// Build from per-model-vertex rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == cols), "Ragged weight rows");
        Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Weights of every cage vertex for model vertex `i`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.cols + j]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.cols.max(1))
    }

    /// Sum of row `i`, 1 for every successfully bound vertex.
    pub fn row_sum(&self, i: usize) -> f32 {
        self.row(i).iter().sum()
    }

    /// Check the matrix is sized for this model/cage pair.
    pub fn check_shape(&self, model: &MeshData, cage: &MeshData) -> Result<(), CageError> {
        if self.rows != model.vertex_count() || self.cols != cage.vertex_count() {
            return Err(CageError::WeightShape {
                rows: self.rows,
                cols: self.cols,
                expected_rows: model.vertex_count(),
                expected_cols: cage.vertex_count(),
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.rows = 0;
        self.cols = 0;
        self.data.clear();
    }
}

/// Compute the weight matrix binding `model` to `cage`.
pub fn compute_weights(
    model: &MeshData,
    cage: &MeshData,
    coordinate_type: CoordinateType,
    epsilon: f32,
) -> Result<WeightMatrix, CageError> {
    match coordinate_type {
        CoordinateType::MeanValue => compute_mean_value_weights(model, cage, epsilon),
        CoordinateType::Hermite | CoordinateType::Green => {
            Err(CageError::UnsupportedCoordinateType(coordinate_type))
        }
    }
}

/// Mean-value weights for every model vertex.
pub fn compute_mean_value_weights(
    model: &MeshData,
    cage: &MeshData,
    epsilon: f32,
) -> Result<WeightMatrix, CageError> {
    let row_for = |(i, &x): (usize, &Vec3)| {
        mean_value_row(x, cage, epsilon).map_err(|cage_vertex| CageError::CoincidentVertex {
            model_vertex: i,
            cage_vertex,
        })
    };

    #[cfg(feature = "parallel")]
    let rows: Result<Vec<Vec<f32>>, CageError> =
        model.positions.par_iter().enumerate().map(row_for).collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Result<Vec<Vec<f32>>, CageError> =
        model.positions.iter().enumerate().map(row_for).collect();

    let rows = rows?;
    tracing::debug!(
        "compute_mean_value_weights: bound {} model vertices to {} cage vertices",
        rows.len(),
        cage.vertex_count()
    );

    Ok(WeightMatrix::from_rows(rows))
}

/// Normalized mean-value weights of one point `x` against every cage vertex.
///
/// Per-triangle geometry is evaluated in f64: in f32 the arc sum of a
/// triangle containing `x` stays one ULP short of pi, so the on-face case
/// would never be detected.
///
/// Returns `Err(cage_vertex)` when `x` coincides with a cage vertex.
pub fn mean_value_row(x: Vec3, cage: &MeshData, epsilon: f32) -> Result<Vec<f32>, usize> {
    let x = x.as_dvec3();
    let epsilon = f64::from(epsilon);
    let mut weights = vec![0.0f64; cage.vertex_count()];

    for tri in cage.triangles() {
        let [i1, i2, i3] = tri.map(|i| i as usize);
        let [p1, p2, p3] = cage.triangle_positions(tri).map(|p| p.as_dvec3());

        let d1 = (p1 - x).length();
        let d2 = (p2 - x).length();
        let d3 = (p3 - x).length();

        if d1 < epsilon {
            return Err(i1);
        }
        if d2 < epsilon {
            return Err(i2);
        }
        if d3 < epsilon {
            return Err(i3);
        }

        // Corners projected on the unit sphere around x
        let u1 = (p1 - x) / d1;
        let u2 = (p2 - x) / d2;
        let u3 = (p3 - x) / d3;

        // Chord lengths, then arc lengths of the spherical triangle
        let theta1 = arc_length((u2 - u3).length());
        let theta2 = arc_length((u3 - u1).length());
        let theta3 = arc_length((u1 - u2).length());

        if theta1 < epsilon || theta2 < epsilon || theta3 < epsilon {
            continue;
        }

        let h = (theta1 + theta2 + theta3) / 2.0;
        if PI - h < epsilon {
            // x lies on this triangle: it alone determines the result
            weights.fill(0.0);
            weights[i1] = theta1.sin() * d2 * d3;
            weights[i2] = theta2.sin() * d3 * d1;
            weights[i3] = theta3.sin() * d1 * d2;
            break;
        }

        let c1 = dihedral_cosine(h, theta1, theta2, theta3);
        let c2 = dihedral_cosine(h, theta2, theta3, theta1);
        let c3 = dihedral_cosine(h, theta3, theta1, theta2);

        let det_sign = sign(DMat3::from_cols(u1, u2, u3).determinant());
        let s1 = det_sign * (1.0 - c1 * c1).sqrt();
        let s2 = det_sign * (1.0 - c2 * c2).sqrt();
        let s3 = det_sign * (1.0 - c3 * c3).sqrt();

        // Coplanar with the triangle but outside it: zero-area projection
        if s1.abs() <= epsilon || s2.abs() <= epsilon || s3.abs() <= epsilon {
            continue;
        }

        weights[i1] += (theta1 - c2 * theta3 - c3 * theta2) / (d1 * theta2.sin() * s3);
        weights[i2] += (theta2 - c3 * theta1 - c1 * theta3) / (d2 * theta3.sin() * s1);
        weights[i3] += (theta3 - c1 * theta2 - c2 * theta1) / (d3 * theta1.sin() * s2);
    }

    let total: f64 = weights.iter().sum();
    if total.abs() <= epsilon {
        tracing::warn!(
            "mean_value_row: weights for {:?} sum to {}, leaving row unbound",
            x,
            total
        );
        return Ok(vec![0.0; weights.len()]);
    }

    Ok(weights.into_iter().map(|w| (w / total) as f32).collect())
}

/// Arc length on the unit sphere for a chord of length `chord`.
fn arc_length(chord: f64) -> f64 {
    // Antipodal corners can round the half chord just past 1
    2.0 * (chord / 2.0).min(1.0).asin()
}

/// Cosine of the dihedral angle opposite arc `theta_a`, clamped to [-1, 1].
fn dihedral_cosine(h: f64, theta_a: f64, theta_b: f64, theta_c: f64) -> f64 {
    ((2.0 * h.sin() * (h - theta_a).sin()) / (theta_b.sin() * theta_c.sin()) - 1.0)
        .clamp(-1.0, 1.0)
}

/// Sign with `sign(0) == 0`.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
