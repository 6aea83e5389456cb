//! Path queries over baked voxel navigation graphs
//!
//! [`NavMesh`] is the entry point: it bakes a [`voxnav_bake::VoxelGraph`] from
//! obstacles and volumes, then plans paths with the [`PathFinder`] (best-first
//! voxel search, funnel string pulling and any-angle shortcutting), casts rays
//! and snaps points onto walkable space.

mod any_angle;
mod congestion;
mod funnel;
mod nav_mesh;
mod path_finder;
mod raycast_hit;
mod registry;

#[cfg(test)]
mod test_helpers;


pub use any_angle::smooth_path_in_place;
pub use congestion::{
    CongestionGrid, CongestionMap, NoCongestion, CONGESTION_LINE_STRIDE, CONGESTION_STAMP_RADIUS,
};
pub use funnel::string_pull;
pub use nav_mesh::{NavMesh, NavMeshConfig, DEFAULT_RAYCAST_DISTANCE};
pub use path_finder::{build_portals, PathFinder, PathFinderOptions};
pub use raycast_hit::RaycastHit;
pub use registry::{NoObstacleRegistry, ObstacleRegistry};
