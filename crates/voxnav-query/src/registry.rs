//! Seam through which a bake forwards its geometry to an avoidance solver

use glam::Vec2;

/// Receives obstacle polygons whenever a navigation mesh is baked or imported.
///
/// Counter-clockwise polygons are solid obstacles; clockwise polygons are
/// boundaries that keep agents inside.
pub trait ObstacleRegistry {
    /// Drops every previously registered polygon
    fn clear_obstacles(&mut self);

    /// Registers one closed polygon, returning its id
    fn register_obstacle(&mut self, vertices: &[Vec2]) -> Option<usize>;

    /// Finalizes registration (rebuilds spatial structures)
    fn process_obstacles(&mut self);
}

/// Registry that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstacleRegistry;

impl ObstacleRegistry for NoObstacleRegistry {
    fn clear_obstacles(&mut self) {}

    fn register_obstacle(&mut self, _vertices: &[Vec2]) -> Option<usize> {
        None
    }

    fn process_obstacles(&mut self) {}
}
