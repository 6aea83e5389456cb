//! Portals: the shared boundary segments between adjacent voxels

use glam::Vec2;
use voxnav_common::{approx_eq, det, Rect};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Ordered pair of points on the boundary shared by two voxels
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Portal {
    pub a: Vec2,
    pub b: Vec2,
}

impl Portal {
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Zero-length portal at a single point, used for jump links
    pub const fn point(p: Vec2) -> Self {
        Self { a: p, b: p }
    }

    #[inline]
    pub fn midpoint(&self) -> Vec2 {
        (self.a + self.b) * 0.5
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    /// Same portal with its endpoints swapped
    pub fn reversed(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }

    /// Orders the endpoints so `a` is left of the ray from `origin` along `direction`.
    ///
    /// A point counts as left when `det(direction, p - origin) > 0`; otherwise
    /// the endpoints are swapped.
    pub fn oriented(&self, origin: Vec2, direction: Vec2) -> Self {
        if det(direction, self.a - origin) > 0.0 {
            *self
        } else {
            self.reversed()
        }
    }
}

#[inline]
fn overlaps(min1: f32, max1: f32, min2: f32, max2: f32) -> bool {
    min1.max(min2) < max1.min(max2)
}

/// Finds the boundary segment shared by two rectangles.
///
/// Edges are compared pairwise in top, left, right, bottom order. Two edges
/// share a portal when they coincide on one axis (within the edge tolerance)
/// and their ranges on the other axis overlap by a positive length. Touching
/// only at a corner yields `None`.
pub fn shared_edge(a: &Rect, b: &Rect) -> Option<Portal> {
    let edges_b = b.edges();
    for (a0, a1) in a.edges() {
        for &(b0, b1) in &edges_b {
            if approx_eq(a0.x, b0.x) && approx_eq(a1.x, b1.x) && overlaps(a0.y, a1.y, b0.y, b1.y) {
                let min_y = a0.y.max(b0.y);
                let max_y = a1.y.min(b1.y);
                return Some(Portal::new(Vec2::new(a0.x, min_y), Vec2::new(a0.x, max_y)));
            }
            if approx_eq(a0.y, b0.y) && approx_eq(a1.y, b1.y) && overlaps(a0.x, a1.x, b0.x, b1.x) {
                let min_x = a0.x.max(b0.x);
                let max_x = a1.x.min(b1.x);
                return Some(Portal::new(Vec2::new(min_x, a0.y), Vec2::new(max_x, a0.y)));
            }
        }
    }
    None
}
