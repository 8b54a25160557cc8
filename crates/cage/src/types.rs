//! Core cage tool types shared by binding, deformation and generation.
//!
//! The engine never talks to the GPU directly. After it mutates a mesh it
//! reports which vertex attributes changed through [`MeshObserver`], and the
//! renderer decides what to re-upload.

use serde::{Deserialize, Serialize};

use crate::mesh::MeshData;

pub use cage_config::CoordinateType;

/// Which of the two session meshes a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshRole {
    /// The dense mesh being deformed
    Model,
    /// The coarse control mesh
    Cage,
}

/// Per-vertex attributes that changed in a mesh.
///
/// Topology (the triangle list) is never reported here; a topology change
/// means a new mesh, which the renderer uploads from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeshChanges {
    pub positions: bool,
    pub uvs: bool,
    pub normals: bool,
    pub colours: bool,
}

impl MeshChanges {
    /// Positions and normals, the result of a deformation pass.
    pub const DEFORMED: Self = Self {
        positions: true,
        uvs: false,
        normals: true,
        colours: false,
    };

    /// Positions only, for edits that leave normals and colours valid.
    pub const POSITIONS: Self = Self {
        positions: true,
        uvs: false,
        normals: false,
        colours: false,
    };

    /// Colour tags only, the result of a selection change.
    pub const COLOURS: Self = Self {
        positions: false,
        uvs: false,
        normals: false,
        colours: true,
    };

    /// Whether any attribute changed.
    pub fn any(&self) -> bool {
        self.positions || self.uvs || self.normals || self.colours
    }
}

/// Receives "recompute and re-upload" notifications after a mesh mutation.
pub trait MeshObserver {
    fn mesh_vertices_changed(&mut self, role: MeshRole, mesh: &MeshData, changes: MeshChanges);
}

/// The unit observer ignores every notification.
impl MeshObserver for () {
    fn mesh_vertices_changed(&mut self, _role: MeshRole, _mesh: &MeshData, _changes: MeshChanges) {}
}

/// Observer that records every notification in order.
///
/// Useful for headless tools that batch uploads, and for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<(MeshRole, MeshChanges)>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications received for `role`.
    pub fn count_for(&self, role: MeshRole) -> usize {
        self.events.iter().filter(|(r, _)| *r == role).count()
    }

    /// Most recent notification, if any.
    pub fn last(&self) -> Option<(MeshRole, MeshChanges)> {
        self.events.last().copied()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl MeshObserver for RecordingObserver {
    fn mesh_vertices_changed(&mut self, role: MeshRole, _mesh: &MeshData, changes: MeshChanges) {
        self.events.push((role, changes));
    }
}
