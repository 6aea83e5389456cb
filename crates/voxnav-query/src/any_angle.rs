//! Line-of-sight shortcutting of polylines

use glam::Vec2;

/// Removes intermediate points that can be skipped with a clear line of sight.
///
/// From each kept point a binary search looks for the farthest later point
/// that `line_of_sight` accepts. If none is accepted the next point is kept.
/// Only straight shortcuts replace sub-paths, so the result is never longer
/// and never has more points than the input.
pub fn smooth_path_in_place(path: &mut Vec<Vec2>, mut line_of_sight: impl FnMut(Vec2, Vec2) -> bool) {
    if path.len() <= 2 {
        return;
    }

    let mut current = 0;
    let mut written = 0;
    while current < path.len() - 1 {
        let origin = path[current];
        let mut lo = current + 1;
        let mut hi = path.len() - 1;
        let mut next = None;

        while lo <= hi {
            let mid = (lo + hi) / 2;
            if line_of_sight(origin, path[mid]) {
                next = Some(mid);
                lo = mid + 1;
            } else {
                hi = mid - 1;
            }
        }

        let next = next.unwrap_or(current + 1);
        written += 1;
        path[written] = path[next];
        current = next;
    }

    path.truncate(written + 1);
}
