//! Cage-based mesh deformation.
//!
//! A coarse cage mesh encloses a dense model. Binding expresses every model
//! vertex as a weighted sum of cage vertices (mean-value coordinates), so
//! moving cage vertices smoothly deforms the model.
//!
//! # Architecture
//!
//! - **Binding**: [`weights`] computes the model x cage weight matrix
//! - **Deformation**: [`deformation`] re-evaluates model positions and normals
//! - **Generation**: [`obb`], [`voxel`] and [`partition`] build a cage of
//!   tight oriented boxes around a model; [`pipeline`] runs the stages
//! - **Session**: [`session::CageSession`] owns model, cage, selection and
//!   binding, and reports mesh changes through [`types::MeshObserver`]
//!
//! Enable the `parallel` feature to compute weight rows and cage subtrees on
//! the rayon pool, and `bevy` for conversion to and from Bevy meshes.

pub mod deformation;
pub mod error;
pub mod mesh;
pub mod obb;
pub mod partition;
pub mod pipeline;
pub mod selection;
pub mod session;
pub mod transform;
pub mod types;
pub mod voxel;
pub mod weights;

#[cfg(feature = "bevy")]
pub mod bevy_interop;

pub use cage_config::CageConfig;
pub use deformation::{DeformationResult, deform, translate_selected};
pub use error::CageError;
pub use mesh::{BOX_TRIANGLES, MeshData, face_normal};
pub use obb::{PrincipalAxes, SortableAxis};
pub use pipeline::{GeneratedCage, generate_cage};
pub use selection::CageSelection;
pub use session::CageSession;
pub use transform::ObjectTransform;
pub use types::{CoordinateType, MeshChanges, MeshObserver, MeshRole, RecordingObserver};
pub use voxel::{VoxelClass, VoxelClassification, VoxelFrame, VoxelGrid, classify};
pub use weights::{WeightMatrix, compute_mean_value_weights, compute_weights};
