//! Funnel string pulling over a portal corridor
//!
//! Portals are expected with their left point in `a` and right point in `b`,
//! relative to the direction of travel. The first portal is normally a
//! degenerate portal at the start point and the last one a degenerate portal
//! at the end point.

use glam::Vec2;
use voxnav_bake::Portal;
use voxnav_common::{approx_eq_vec, tri_area_2};

/// Shortest polyline through `portals`.
///
/// The funnel keeps an apex with a left and a right boundary point. Each new
/// portal narrows the funnel when its endpoint moves inward. When an endpoint
/// crosses the opposite boundary, that boundary point becomes a path corner
/// and the scan restarts from the portal after it.
pub fn string_pull(portals: &[Portal]) -> Vec<Vec2> {
    let Some(first) = portals.first() else {
        return Vec::new();
    };

    let mut path = Vec::with_capacity(portals.len());
    let mut apex = first.a;
    let mut left = first.a;
    let mut right = first.b;
    let mut apex_index = 0;
    let mut left_index = 0;
    let mut right_index = 0;
    path.push(apex);

    let mut i = 1;
    while i < portals.len() {
        let new_left = portals[i].a;
        let new_right = portals[i].b;

        if tri_area_2(apex, right, new_right) <= 0.0 {
            if approx_eq_vec(apex, right) || tri_area_2(apex, left, new_right) > 0.0 {
                right = new_right;
                right_index = i;
            } else {
                path.push(left);
                apex = left;
                apex_index = left_index;
                right = apex;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        if tri_area_2(apex, left, new_left) >= 0.0 {
            if approx_eq_vec(apex, left) || tri_area_2(apex, right, new_left) < 0.0 {
                left = new_left;
                left_index = i;
            } else {
                path.push(right);
                apex = right;
                apex_index = right_index;
                left = apex;
                left_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        i += 1;
    }

    if let Some(last) = portals.last() {
        if path.last().map_or(true, |&p| !approx_eq_vec(p, last.b)) {
            path.push(last.b);
        }
    }

    path
}
