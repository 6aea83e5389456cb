//! Result of a navigation mesh raycast

use glam::Vec2;

/// Provides information about a raycast against walkable space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// True when the ray left walkable space before its maximum distance
    pub hit: bool,
    /// Where walkable space ended, or the end of the ray when nothing was hit
    pub point: Vec2,
}

impl RaycastHit {
    /// Creates a result for a ray that stayed in walkable space up to `end`
    pub fn no_hit(end: Vec2) -> Self {
        Self {
            hit: false,
            point: end,
        }
    }

    /// Creates a result for a ray that left walkable space at `point`
    pub fn boundary_hit(point: Vec2) -> Self {
        Self { hit: true, point }
    }

    /// Distance from `origin` to the reported point
    pub fn distance_from(&self, origin: Vec2) -> f32 {
        origin.distance(self.point)
    }
}
