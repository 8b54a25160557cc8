//! OBB space partitioning.
//!
//! The augmented point set is counted into a lattice over its own oriented
//! box ([`generate_obb_space`]). The lattice is then split recursively at the
//! waists of its cross-sectional occupancy profile ([`search_splice_index`]),
//! and every final region becomes one box of the cage ([`build_tree`]).

pub mod obb_space;
pub mod splice;
pub mod tree;

pub use obb_space::{IndexRanges, OccupancyGrid, generate_obb_space};
pub use splice::{local_extrema, search_splice_index};
pub use tree::{CageTree, SplitPolicy, build_tree};
