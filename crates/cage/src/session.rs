//! Editor-facing session state.
//!
//! A [`CageSession`] owns the model, the cage, the cage selection and the
//! weight matrix binding them. Every entry point is a guarded no-op when a
//! prerequisite is missing: it logs why and returns `false` or `None`
//! instead of failing. Replacing either mesh invalidates the binding; the
//! only operation that re-runs deformation is moving cage vertices.

use glam::Vec3;

use cage_config::CageConfig;

use crate::deformation;
use crate::error::CageError;
use crate::mesh::MeshData;
use crate::obb::PrincipalAxes;
use crate::pipeline::{self, GeneratedCage};
use crate::selection::CageSelection;
use crate::transform::ObjectTransform;
use crate::types::{MeshChanges, MeshObserver, MeshRole};
use crate::weights::{self, WeightMatrix};

/// Model, cage and binding for one editing session.
pub struct CageSession<O: MeshObserver = ()> {
    config: CageConfig,
    model: Option<MeshData>,
    cage: Option<MeshData>,
    model_transform: ObjectTransform,
    cage_transform: ObjectTransform,
    selection: CageSelection,
    weights: WeightMatrix,
    observer: O,
}

impl CageSession<()> {
    /// Session without change notifications.
    pub fn new(config: CageConfig) -> Self {
        Self::with_observer(config, ())
    }
}

impl Default for CageSession<()> {
    fn default() -> Self {
        Self::new(CageConfig::default())
    }
}

impl<O: MeshObserver> CageSession<O> {
    pub fn with_observer(config: CageConfig, observer: O) -> Self {
        Self {
            config,
            model: None,
            cage: None,
            model_transform: ObjectTransform::default(),
            cage_transform: ObjectTransform::default(),
            selection: CageSelection::default(),
            weights: WeightMatrix::default(),
            observer,
        }
    }

    pub fn config(&self) -> &CageConfig {
        &self.config
    }

    /// Replace the configuration. A different coordinate type or epsilon
    /// only takes effect on the next `compute_weights`.
    pub fn set_config(&mut self, config: CageConfig) {
        self.config = config;
    }

    pub fn model(&self) -> Option<&MeshData> {
        self.model.as_ref()
    }

    pub fn cage(&self) -> Option<&MeshData> {
        self.cage.as_ref()
    }

    pub fn selection(&self) -> &CageSelection {
        &self.selection
    }

    pub fn weights(&self) -> &WeightMatrix {
        &self.weights
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn model_transform(&self) -> &ObjectTransform {
        &self.model_transform
    }

    pub fn cage_transform(&self) -> &ObjectTransform {
        &self.cage_transform
    }

    pub fn set_model_transform(&mut self, transform: ObjectTransform) {
        self.model_transform = transform;
    }

    pub fn set_cage_transform(&mut self, transform: ObjectTransform) {
        self.cage_transform = transform;
    }

    // --- Meshes ---

    /// Load a model. Normals are generated when the mesh has none.
    pub fn set_model(&mut self, mut model: MeshData) -> Result<(), CageError> {
        model.validate()?;
        if model.normals.is_empty() {
            model.recompute_normals();
        }
        self.model = Some(model);
        self.invalidate_weights();
        Ok(())
    }

    pub fn clear_model(&mut self) {
        self.model = None;
        self.invalidate_weights();
    }

    /// Load a cage. The previous selection is dropped.
    pub fn set_cage(&mut self, mut cage: MeshData) -> Result<(), CageError> {
        cage.validate()?;
        if cage.normals.is_empty() {
            cage.recompute_normals();
        }
        self.selection.reset(cage.vertex_count());
        self.cage = Some(cage);
        self.invalidate_weights();
        Ok(())
    }

    pub fn clear_cage(&mut self) {
        self.cage = None;
        self.selection.reset(0);
        self.invalidate_weights();
    }

    /// Oriented bounding box of the model vertices, as a display mesh.
    pub fn model_obb_mesh(&self) -> Option<MeshData> {
        let model = self.model.as_ref()?;
        match PrincipalAxes::fit(&model.unique_positions()) {
            Ok(obb) => Some(obb.box_mesh()),
            Err(e) => {
                tracing::warn!("model_obb_mesh: {}", e);
                None
            }
        }
    }

    // --- Binding and deformation ---

    /// Bind the model to the cage with the configured coordinate type.
    ///
    /// On failure the weight matrix is left empty.
    pub fn compute_weights(&mut self) -> bool {
        let (Some(model), Some(cage)) = (&self.model, &self.cage) else {
            tracing::warn!("compute_weights: model and cage are both required");
            return false;
        };

        match weights::compute_weights(
            model,
            cage,
            self.config.coordinate_type,
            self.config.epsilon,
        ) {
            Ok(weights) => {
                tracing::info!(
                    "Computed {} weights ({} x {})",
                    self.config.coordinate_type.label(),
                    weights.rows(),
                    weights.cols()
                );
                self.weights = weights;
                true
            }
            Err(e) => {
                tracing::warn!("compute_weights: {}", e);
                self.weights.clear();
                false
            }
        }
    }

    pub fn clear_weights(&mut self) {
        self.invalidate_weights();
    }

    pub fn has_weights(&self) -> bool {
        !self.weights.is_empty()
    }

    /// Re-evaluate the model from the current cage.
    pub fn deform_model(&mut self) -> bool {
        let (Some(model), Some(cage)) = (&mut self.model, &self.cage) else {
            tracing::debug!("deform_model: model and cage are both required");
            return false;
        };

        if deformation::deform(model, cage, &self.weights).is_none() {
            return false;
        }
        self.observer
            .mesh_vertices_changed(MeshRole::Model, model, MeshChanges::DEFORMED);
        true
    }

    // --- Cage editing ---

    pub fn select_cage_vertices(&mut self, start: usize, count: usize) -> bool {
        self.edit_selection(|s| s.select_range(start, count))
    }

    pub fn unselect_cage_vertices(&mut self, start: usize, count: usize) -> bool {
        self.edit_selection(|s| s.unselect_range(start, count))
    }

    pub fn toggle_cage_vertices(&mut self, start: usize, count: usize) -> bool {
        self.edit_selection(|s| s.toggle_range(start, count))
    }

    pub fn select_all_cage_vertices(&mut self) -> bool {
        self.edit_selection(CageSelection::select_all)
    }

    pub fn clear_cage_selection(&mut self) -> bool {
        self.edit_selection(|s| {
            s.clear();
            true
        })
    }

    /// Move every selected cage vertex by `delta`, refresh the cage normals,
    /// then deform the model when a binding exists.
    pub fn translate_selected_cage_vertices(&mut self, delta: Vec3) -> bool {
        let Some(cage) = &mut self.cage else {
            tracing::debug!("translate_selected_cage_vertices: no cage loaded");
            return false;
        };

        if !deformation::translate_selected(cage, &self.selection, delta) {
            return false;
        }
        cage.recompute_normals();
        self.observer
            .mesh_vertices_changed(MeshRole::Cage, cage, MeshChanges::DEFORMED);

        if self.has_weights() {
            self.deform_model();
        }
        true
    }

    /// Editor step: move the selection by `direction` scaled by the
    /// configured `delta_move`.
    pub fn step_selected_cage_vertices(&mut self, direction: Vec3) -> bool {
        let delta = Vec3::from_array(self.config.scaled_move(direction.to_array()));
        self.translate_selected_cage_vertices(delta)
    }

    // --- Generation ---

    /// Replace the cage with one generated around the model.
    ///
    /// The new cage shares the model's object transform. Returns the
    /// number of leaf boxes.
    pub fn generate_cage(&mut self) -> Option<usize> {
        let Some(model) = &self.model else {
            tracing::warn!("generate_cage: no model loaded");
            return None;
        };

        let GeneratedCage {
            cage, leaf_count, ..
        } = match pipeline::generate_cage(model, &self.config) {
            Ok(generated) => generated,
            Err(e) => {
                tracing::warn!("generate_cage: {}", e);
                return None;
            }
        };

        if cage.is_empty() {
            tracing::warn!("generate_cage: no occupied voxels, keeping the current cage");
            return None;
        }

        self.cage_transform = self.model_transform;
        if let Err(e) = self.set_cage(cage) {
            tracing::warn!("generate_cage: {}", e);
            return None;
        }
        Some(leaf_count)
    }

    fn invalidate_weights(&mut self) {
        if self.has_weights() {
            tracing::debug!("Cage binding invalidated");
        }
        self.weights.clear();
    }

    fn edit_selection(&mut self, edit: impl FnOnce(&mut CageSelection) -> bool) -> bool {
        let Some(cage) = &self.cage else {
            return false;
        };
        if !edit(&mut self.selection) {
            return false;
        }
        self.observer
            .mesh_vertices_changed(MeshRole::Cage, cage, MeshChanges::COLOURS);
        true
    }
}
