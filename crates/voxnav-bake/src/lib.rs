//! Baking of free space into a voxel navigation graph
//!
//! The [`Voxelizer`] decomposes a bake area into axis-aligned free-space
//! rectangles around obstacles, merges them where possible and links
//! edge-adjacent voxels through [`Portal`]s. The resulting [`VoxelGraph`] is
//! what path queries run over, and it can be stored and restored with the
//! packed format in the serializer module.

mod config;
mod context;
mod portal;
mod simplifier;
mod voxel;
mod voxelizer;

#[cfg(feature = "serialization")]
pub mod serializer;

#[cfg(test)]
mod test_helpers;



pub use config::{BakeMode, VoxelizerConfig};
pub use context::{BakeContext, BakeMessage, PhaseTiming, TimerCategory, MAX_BAKE_MESSAGES};
pub use portal::{shared_edge, Portal};
pub use simplifier::{can_merge, merge, simplify, SimplifyStats};
pub use voxel::{Neighbor, Voxel, VoxelEntry, VoxelGraph, VoxelId, VoxelKind};
pub use voxelizer::{Voxelizer, INCLUDE_ALL_VOLUME};

#[cfg(feature = "serialization")]
pub use serializer::{deserialize_graph, serialize_graph, Encoding, Payload};
