//! Error types for cage operations.

use crate::types::CoordinateType;

/// Errors that can occur while binding, deforming or generating cages.
#[derive(Debug, thiserror::Error)]
pub enum CageError {
    #[error("Triangle index count {0} is not divisible by 3")]
    IncompleteTriangle(usize),

    #[error("Triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Attribute '{attribute}' has {len} entries, expected 0 or {vertex_count}")]
    AttributeLength {
        attribute: &'static str,
        len: usize,
        vertex_count: usize,
    },

    #[error("Model vertex {model_vertex} coincides with cage vertex {cage_vertex}")]
    CoincidentVertex {
        model_vertex: usize,
        cage_vertex: usize,
    },

    #[error("{} coordinates are not implemented", .0.label())]
    UnsupportedCoordinateType(CoordinateType),

    #[error("Weight matrix is {rows}x{cols}, meshes need {expected_rows}x{expected_cols}")]
    WeightShape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("Point set is empty")]
    EmptyPointSet,

    #[error("Invalid voxel size: {0}")]
    InvalidVoxelSize(f32),

    #[error("No model loaded")]
    MissingModel,

    #[error("No cage loaded")]
    MissingCage,

    #[cfg(feature = "bevy")]
    #[error("Bevy mesh has no {0}")]
    MissingBevyAttribute(&'static str),
}
