//! Common geometry, spatial indexing and error types shared by the voxnav crates
//!
//! Everything in voxnav works on a 2D plane using `glam::Vec2` points and
//! axis-aligned [`Rect`]s. The [`QuadTree`] defined here is the spatial index
//! behind voxel lookups, obstacle tests during baking and line-of-sight walks.

mod geometry;
mod math;
mod quadtree;
mod ray;

pub use geometry::*;
pub use math::*;
pub use quadtree::*;
pub use ray::*;

/// Represents a 2D position or direction
pub type Vec2 = glam::Vec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Setup happened in the wrong order or with unusable parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A query referenced a point that is not covered by the baked mesh.
    #[error("query error: {0}")]
    Query(String),

    /// Graph search ran out of candidates before reaching the goal voxel.
    #[error("search exhausted: {0}")]
    SearchExhausted(String),

    /// Packed navigation data could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for voxnav operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true for errors a caller is expected to recover from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Query(_))
    }
}
