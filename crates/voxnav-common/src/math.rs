//! Math utilities for 2D navigation and avoidance

use glam::Vec2;
use std::f32::consts::PI;

/// Numerical tolerance used by the avoidance solver
pub const RVO_EPSILON: f32 = 1e-5;

/// Tolerance used when comparing voxel edges and funnel points
pub const EDGE_TOLERANCE: f32 = 0.1;

/// Calculates the determinant (2D cross product) of two vectors
#[inline]
pub fn det(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Signed distance-like value telling which side of the line `a -> b` point `c` is on.
///
/// Positive: left, negative: right, zero: collinear.
#[inline]
pub fn left_of(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    det(a - c, b - a)
}

/// Twice the signed area of triangle `abc` using the funnel convention.
///
/// Positive when `c` is clockwise from `a -> b`.
#[inline]
pub fn tri_area_2(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let ab = b - a;
    let ac = c - a;
    ac.x * ab.y - ab.x * ac.y
}

/// Checks two scalars for equality within [`EDGE_TOLERANCE`]
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EDGE_TOLERANCE
}

/// Checks two points for equality within [`EDGE_TOLERANCE`] on each axis
#[inline]
pub fn approx_eq_vec(a: Vec2, b: Vec2) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

/// Normalizes with a small bias so a zero vector maps to zero instead of NaN
#[inline]
pub fn normalize_biased(v: Vec2) -> Vec2 {
    v / (v.length() + 1e-4)
}

/// Squared distance from point `c` to segment `a -> b`
pub fn dist_sq_point_segment(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return (c - a).length_squared();
    }
    let r = (c - a).dot(ab) / len_sq;
    if r < 0.0 {
        (c - a).length_squared()
    } else if r > 1.0 {
        (c - b).length_squared()
    } else {
        (c - (a + r * ab)).length_squared()
    }
}

/// Total length of a polyline
pub fn path_length(points: &[Vec2]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Wraps an angle in radians into `[-PI, PI]`
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Converts degrees to radians
#[inline]
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_of_sign() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);
        assert!(left_of(a, b, Vec2::new(0.5, 1.0)) > 0.0);
        assert!(left_of(a, b, Vec2::new(0.5, -1.0)) < 0.0);
        assert_eq!(left_of(a, b, Vec2::new(2.0, 0.0)), 0.0);
    }

    #[test]
    fn test_tri_area_is_opposite_of_left_of() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);
        let c = Vec2::new(0.5, 1.0);
        assert!(tri_area_2(a, b, c) < 0.0);
        assert!(tri_area_2(a, b, Vec2::new(0.5, -1.0)) > 0.0);
    }

    #[test]
    fn test_dist_sq_point_segment() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(dist_sq_point_segment(a, b, Vec2::new(5.0, 3.0)), 9.0);
        assert_eq!(dist_sq_point_segment(a, b, Vec2::new(-2.0, 0.0)), 4.0);
        assert_eq!(dist_sq_point_segment(a, b, Vec2::new(13.0, 4.0)), 25.0);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_biased_zero() {
        assert_eq!(normalize_biased(Vec2::ZERO), Vec2::ZERO);
        assert!((normalize_biased(Vec2::new(3.0, 4.0)).length() - 1.0).abs() < 1e-3);
    }
}
