//! Axis-aligned rectangles
//!
//! [`Rect`] is the base primitive for voxels, obstacles and walkable volumes.
//! Intersection tests are inclusive: rectangles that only touch along an edge
//! or a corner count as intersecting.

use glam::Vec2;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Side length of the degenerate rectangle used for point lookups.
pub const POINT_EPSILON: f32 = 1e-4;

/// Axis-aligned rectangle anchored at its minimum corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Creates a new rectangle
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle spanning two corner points
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Creates the epsilon-sized rectangle used to look up a point
    pub fn around_point(point: Vec2) -> Self {
        Self::new(point.x, point.y, POINT_EPSILON, POINT_EPSILON)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Gets the center of the rectangle
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Length of the longer side
    #[inline]
    pub fn max_side(&self) -> f32 {
        self.width.max(self.height)
    }

    /// Checks whether the rectangle has no area
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Checks whether all components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Inclusive overlap test; touching rectangles intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x > self.right()
            || other.right() < self.x
            || other.y > self.bottom()
            || other.bottom() < self.y)
    }

    /// Checks whether `other` lies entirely inside this rectangle
    pub fn envelopes(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Inclusive point containment
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Grows (or shrinks, for negative amounts) the rectangle around its center
    pub fn inflate(&self, amount: f32) -> Rect {
        let center = self.center();
        let width = self.width + 2.0 * amount;
        let height = self.height + 2.0 * amount;
        Rect::new(center.x - width * 0.5, center.y - height * 0.5, width, height)
    }

    /// Smallest rectangle covering both inputs
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_corners(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// Corner points, starting at the minimum corner
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.right(), self.y),
            Vec2::new(self.x, self.bottom()),
        ]
    }

    /// Boundary segments in top, left, right, bottom order.
    ///
    /// Every segment runs from its smaller coordinate to its larger one.
    pub fn edges(&self) -> [(Vec2, Vec2); 4] {
        let (l, t, r, b) = (self.x, self.y, self.right(), self.bottom());
        [
            (Vec2::new(l, t), Vec2::new(r, t)),
            (Vec2::new(l, t), Vec2::new(l, b)),
            (Vec2::new(r, t), Vec2::new(r, b)),
            (Vec2::new(l, b), Vec2::new(r, b)),
        ]
    }

    /// Splits the rectangle into four equal quadrants
    pub fn quadrants(&self) -> [Rect; 4] {
        let hw = self.width * 0.5;
        let hh = self.height * 0.5;
        [
            Rect::new(self.x, self.y, hw, hh),
            Rect::new(self.x + hw, self.y, hw, hh),
            Rect::new(self.x, self.y + hh, hw, hh),
            Rect::new(self.x + hw, self.y + hh, hw, hh),
        ]
    }

    /// Counter-clockwise outline (solid obstacle winding)
    pub fn outline_ccw(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.right(), self.y),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.x, self.bottom()),
        ]
    }

    /// Clockwise outline (boundary winding, keeps agents inside)
    pub fn outline_cw(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.x, self.bottom()),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.right(), self.y),
        ]
    }
}

/// Anything that can be stored in a [`crate::QuadTree`]
pub trait Bounded {
    fn bounds(&self) -> Rect;
}

impl Bounded for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_rects_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(10.5, 0.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_envelopes() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.envelopes(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(outer.envelopes(&Rect::new(10.0, 10.0, 5.0, 5.0)));
        assert!(!outer.envelopes(&Rect::new(90.0, 90.0, 20.0, 5.0)));
    }

    #[test]
    fn test_inflate_keeps_center() {
        let r = Rect::new(10.0, 20.0, 4.0, 6.0);
        let grown = r.inflate(1.0);
        assert_eq!(grown, Rect::new(9.0, 19.0, 6.0, 8.0));
        assert_eq!(grown.center(), r.center());
    }

    #[test]
    fn test_quadrants_cover_rect() {
        let r = Rect::new(0.0, 0.0, 8.0, 4.0);
        let quads = r.quadrants();
        let total: f32 = quads.iter().map(|q| q.area()).sum();
        assert_eq!(total, r.area());
        assert!(quads.iter().all(|q| r.envelopes(q)));
    }

    #[test]
    fn test_outline_windings() {
        let r = Rect::new(0.0, 0.0, 2.0, 2.0);
        let signed_area = |pts: &[Vec2; 4]| {
            let mut sum = 0.0;
            for i in 0..4 {
                let a = pts[i];
                let b = pts[(i + 1) % 4];
                sum += a.x * b.y - b.x * a.y;
            }
            sum * 0.5
        };
        assert!(signed_area(&r.outline_ccw()) > 0.0);
        assert!(signed_area(&r.outline_cw()) < 0.0);
    }
}
