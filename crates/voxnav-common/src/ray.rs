//! Rays and ray intersection tests against segments and rectangles

use glam::Vec2;

use crate::Rect;

/// Half-line with an origin and a (normally unit-length) direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec2,
    pub direction: Vec2,
}

impl Ray {
    /// Creates a new ray
    pub fn new(origin: Vec2, direction: Vec2) -> Self {
        Self { origin, direction }
    }

    /// Creates a ray from `start` pointing at `end`
    pub fn from_points(start: Vec2, end: Vec2) -> Self {
        Self::new(start, (end - start).normalize_or_zero())
    }

    /// Point at parameter `t` along the ray
    #[inline]
    pub fn at(&self, t: f32) -> Vec2 {
        self.origin + self.direction * t
    }
}

/// Intersects a ray with the segment `a -> b`.
///
/// Returns the hit point when the segment is crossed at or ahead of the origin.
pub fn intersect_ray_segment(ray: &Ray, a: Vec2, b: Vec2) -> Option<Vec2> {
    let seg = b - a;
    let det = ray.direction.x * seg.y - ray.direction.y * seg.x;
    if det.abs() <= f32::EPSILON {
        return None;
    }

    let w = ray.origin - a;
    let ua = (seg.x * w.y - seg.y * w.x) / det;
    let ub = (ray.direction.x * w.y - ray.direction.y * w.x) / det;

    if ua >= 0.0 && (0.0..=1.0).contains(&ub) {
        Some(ray.at(ua))
    } else {
        None
    }
}

/// Intersects a ray with the four boundary segments of a rectangle.
///
/// Returns the boundary point closest to the ray origin. When the origin is
/// inside the rectangle this is the exit point.
pub fn intersect_ray_rect(ray: &Ray, rect: &Rect) -> Option<Vec2> {
    let mut closest: Option<(f32, Vec2)> = None;
    for (a, b) in rect.edges() {
        if let Some(hit) = intersect_ray_segment(ray, a, b) {
            let d = ray.origin.distance_squared(hit);
            if closest.map_or(true, |(best, _)| d < best) {
                closest = Some((d, hit));
            }
        }
    }
    closest.map(|(_, hit)| hit)
}
