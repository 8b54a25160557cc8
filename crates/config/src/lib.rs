//! Shared configuration for the cage tool
//!
//! This crate is the single source of truth for the numeric tolerances and
//! tuning parameters used by weight binding, deformation and automatic cage
//! generation. Every field has a documented default so editors can expose
//! them without guessing.

use serde::{Deserialize, Serialize};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default tolerance for degenerate-geometry tests (single-precision machine epsilon)
pub const DEFAULT_EPSILON: f32 = f32::EPSILON;

/// Default number of voxels spanning the longest axis of the initial OBB
pub const DEFAULT_VOXELS_ALONG_LONGEST_AXIS: u32 = 64;

/// Default recursion limit for the cage tree
pub const DEFAULT_MAX_RECURSIVE_DEPTH: u32 = 100;

/// Default number of indices at either end of a trimmed range that can never
/// hold a split point. Profiles shorter than `2 * margin + 1` are never split,
/// so small lattices such as a 7-voxel dumbbell need a margin of 2 or less.
pub const DEFAULT_SPLICE_BOUNDARY_MARGIN: usize = 10;

/// Default scalar applied to cage vertex translations
pub const DEFAULT_DELTA_MOVE: f32 = 1.0;

/// Generalized barycentric coordinate family used to bind a model to its cage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CoordinateType {
    /// Mean-value coordinates (robust spherical formulation)
    #[default]
    MeanValue = 0,
    /// Hermite coordinates
    Hermite = 1,
    /// Green coordinates
    Green = 2,
}

impl CoordinateType {
    /// Short label for logs and UI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MeanValue => "MVC",
            Self::Hermite => "HC",
            Self::Green => "GC",
        }
    }
}

/// Tuning parameters for binding, deformation and cage generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct CageConfig {
    /// Tolerance for near-zero distances, angles and sines
    pub epsilon: f32,
    /// Which coordinate family `compute_weights` uses
    pub coordinate_type: CoordinateType,
    /// Voxel size is the longest initial OBB span divided by this
    pub voxels_along_longest_axis: u32,
    /// Tree nodes at this depth always become leaves
    pub max_recursive_depth: u32,
    /// Minima closer than this to either end of a range are ignored
    pub splice_boundary_margin: usize,
    /// Scalar applied to cage translations by editors
    pub delta_move: f32,
}

impl Default for CageConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            coordinate_type: CoordinateType::default(),
            voxels_along_longest_axis: DEFAULT_VOXELS_ALONG_LONGEST_AXIS,
            max_recursive_depth: DEFAULT_MAX_RECURSIVE_DEPTH,
            splice_boundary_margin: DEFAULT_SPLICE_BOUNDARY_MARGIN,
            delta_move: DEFAULT_DELTA_MOVE,
        }
    }
}

impl CageConfig {
    /// Create a config with a custom voxel resolution
    pub fn with_resolution(voxels_along_longest_axis: u32) -> Self {
        Self {
            voxels_along_longest_axis,
            ..Self::default()
        }
    }

    /// Voxel resolution as f32, never below one voxel
    pub fn resolution_f32(&self) -> f32 {
        self.voxels_along_longest_axis.max(1) as f32
    }

    /// Voxel edge length for an OBB whose longest span is `longest_span`
    pub fn voxel_size_for(&self, longest_span: f32) -> f32 {
        longest_span / self.resolution_f32()
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Pretty-printed JSON, for settings files.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Translation actually applied for a unit editor step along `direction`
    pub fn scaled_move(&self, direction: [f32; 3]) -> [f32; 3] {
        direction.map(|c| c * self.delta_move)
    }
}
