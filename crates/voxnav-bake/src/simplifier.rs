//! Merging of adjacent voxels into larger rectangles
//!
//! Two rectangles merge when they share a full edge: the same row and height
//! while touching horizontally, or the same column and width while touching
//! vertically. Comparisons are exact, so only rectangles produced by the same
//! subdivision grid merge. Merging repeats until no pair qualifies.

use voxnav_common::Rect;

/// Statistics from a simplification pass
#[derive(Debug, Default, Clone, Copy)]
pub struct SimplifyStats {
    /// Rectangles before merging
    pub input_count: usize,
    /// Rectangles after merging
    pub output_count: usize,
    /// Number of pairwise merges performed
    pub merges: usize,
}

/// Checks whether two rectangles share a full edge
pub fn can_merge(a: &Rect, b: &Rect) -> bool {
    let horizontal = a.y == b.y && a.height == b.height && (a.right() == b.x || b.right() == a.x);
    let vertical = a.x == b.x && a.width == b.width && (a.bottom() == b.y || b.bottom() == a.y);
    horizontal || vertical
}

/// Merges two rectangles accepted by [`can_merge`]
pub fn merge(a: &Rect, b: &Rect) -> Rect {
    if a.y == b.y && a.height == b.height {
        Rect::new(a.x.min(b.x), a.y, a.width + b.width, a.height)
    } else {
        Rect::new(a.x, a.y.min(b.y), a.width, a.height + b.height)
    }
}

/// Merges rectangles in place until no pair can be merged
pub fn simplify(rects: &mut Vec<Rect>) -> SimplifyStats {
    let mut stats = SimplifyStats {
        input_count: rects.len(),
        ..Default::default()
    };

    let mut merged = rects.len() > 1;
    while merged {
        merged = false;
        'scan: for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                if can_merge(&rects[i], &rects[j]) {
                    rects[i] = merge(&rects[i], &rects[j]);
                    rects.swap_remove(j);
                    stats.merges += 1;
                    merged = true;
                    break 'scan;
                }
            }
        }
    }

    stats.output_count = rects.len();
    stats
}
