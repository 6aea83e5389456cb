//! Region quadtree over rectangles
//!
//! Items are stored once in an arena owned by the tree and referenced by index
//! from every leaf they overlap. An item spanning a split boundary therefore
//! lives in several leaves, and all multi-result queries deduplicate by index.

use glam::Vec2;

use crate::{intersect_ray_rect, Bounded, Ray, Rect};

/// Number of items a leaf holds before it splits
pub const QUADTREE_MAX_ITEMS: usize = 8;

/// Depth at which leaves stop splitting
pub const QUADTREE_MAX_LEVEL: usize = 8;

/// Inflation applied to each cell while walking a line of sight
const THROUGHCAST_INFLATION: f32 = 1.1;

/// Distance stepped past a cell boundary before the next lookup
const THROUGHCAST_STEP: f32 = 0.01;

/// Hard cap on cells visited by one line-of-sight walk
const THROUGHCAST_MAX_STEPS: usize = 100_000;

/// Closest hit found by [`QuadTree::raycast`]
#[derive(Debug, Clone, Copy)]
pub struct QuadRaycastHit<'a, T> {
    /// Hit point on the boundary of `item`
    pub point: Vec2,
    /// Distance from the ray origin to `point`
    pub distance: f32,
    /// Item that was hit
    pub item: &'a T,
}

/// Outcome of [`QuadTree::throughcast`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughcast {
    /// True when the walk reached the end point without leaving covered space
    pub passed: bool,
    /// Point where the walk stopped, if it stopped somewhere other than inside the end cell
    pub boundary: Option<Vec2>,
}

#[derive(Debug, Clone)]
struct QuadNode {
    level: usize,
    bounds: Rect,
    objects: Vec<usize>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    fn new(level: usize, bounds: Rect) -> Self {
        Self {
            level,
            bounds,
            objects: Vec::new(),
            children: None,
        }
    }

    fn split<T: Bounded>(&mut self, items: &[T]) {
        if self.level >= QUADTREE_MAX_LEVEL {
            return;
        }

        let b = self.bounds;
        let (w, h) = (b.width * 0.5, b.height * 0.5);
        let level = self.level + 1;
        let mut children = Box::new([
            QuadNode::new(level, Rect::new(b.x + w, b.y, w, h)),
            QuadNode::new(level, Rect::new(b.x, b.y, w, h)),
            QuadNode::new(level, Rect::new(b.x, b.y + h, w, h)),
            QuadNode::new(level, Rect::new(b.x + w, b.y + h, w, h)),
        ]);

        for idx in self.objects.drain(..) {
            for child in children.iter_mut() {
                child.insert(idx, items);
            }
        }
        self.children = Some(children);
    }

    fn insert<T: Bounded>(&mut self, idx: usize, items: &[T]) -> bool {
        let rect = items[idx].bounds();
        if !self.bounds.intersects(&rect) {
            return false;
        }

        if let Some(children) = self.children.as_mut() {
            let mut stored = false;
            for child in children.iter_mut() {
                stored |= child.insert(idx, items);
            }
            return stored;
        }

        self.objects.push(idx);
        if self.objects.len() >= QUADTREE_MAX_ITEMS {
            self.split(items);
        }
        true
    }

    fn query<T: Bounded>(&self, range: &Rect, items: &[T], out: &mut Vec<usize>) {
        if !self.bounds.intersects(range) {
            return;
        }
        for &idx in &self.objects {
            if items[idx].bounds().intersects(range) {
                out.push(idx);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(range, items, out);
            }
        }
    }

    fn intersect<T: Bounded>(&self, range: &Rect, items: &[T]) -> bool {
        if !self.bounds.intersects(range) {
            return false;
        }
        if self
            .objects
            .iter()
            .any(|&idx| items[idx].bounds().intersects(range))
        {
            return true;
        }
        match &self.children {
            Some(children) => children.iter().any(|c| c.intersect(range, items)),
            None => false,
        }
    }

    fn envelopes<T: Bounded>(&self, rect: &Rect, items: &[T]) -> bool {
        if let Some(children) = &self.children {
            if children.iter().any(|c| c.envelopes(rect, items)) {
                return true;
            }
        }
        self.objects
            .iter()
            .any(|&idx| items[idx].bounds().envelopes(rect))
    }

    /// Returns `(distance, point, item index)` of the closest hit under `max_distance`
    fn raycast<T: Bounded>(
        &self,
        ray: &Ray,
        max_distance: f32,
        items: &[T],
    ) -> Option<(f32, Vec2, usize)> {
        if intersect_ray_rect(ray, &self.bounds).is_none() {
            return None;
        }

        let mut best: Option<(f32, Vec2, usize)> = None;
        let mut consider = |candidate: (f32, Vec2, usize)| {
            if candidate.0 < max_distance && best.map_or(true, |b| candidate.0 < b.0) {
                best = Some(candidate);
            }
        };

        if let Some(children) = &self.children {
            for child in children.iter() {
                if let Some(hit) = child.raycast(ray, max_distance, items) {
                    consider(hit);
                }
            }
        }

        for &idx in &self.objects {
            if let Some(point) = intersect_ray_rect(ray, &items[idx].bounds()) {
                consider((ray.origin.distance(point), point, idx));
            }
        }

        best
    }

    fn depth(&self) -> usize {
        match &self.children {
            Some(children) => children.iter().map(|c| c.depth()).max().unwrap_or(0) + 1,
            None => 1,
        }
    }
}

/// Quadtree holding rectangle-bounded items
#[derive(Debug, Clone)]
pub struct QuadTree<T> {
    items: Vec<T>,
    root: QuadNode,
}

impl<T: Bounded> QuadTree<T> {
    /// Creates an empty tree covering `bounds`
    pub fn new(bounds: Rect) -> Self {
        Self {
            items: Vec::new(),
            root: QuadNode::new(0, bounds),
        }
    }

    /// Builds a tree from an iterator of items
    pub fn from_items(bounds: Rect, items: impl IntoIterator<Item = T>) -> Self {
        let mut tree = Self::new(bounds);
        for item in items {
            tree.insert(item);
        }
        tree
    }

    /// Bounds covered by the root node
    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    pub fn width(&self) -> f32 {
        self.root.bounds.width
    }

    pub fn height(&self) -> f32 {
        self.root.bounds.height
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Depth of the deepest leaf (a lone root counts as 1)
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// All stored items in insertion order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Removes every item and collapses the tree back to a single root
    pub fn clear(&mut self) {
        self.items.clear();
        self.root = QuadNode::new(0, self.root.bounds);
    }

    /// Inserts an item into every leaf it overlaps.
    ///
    /// Items that do not touch the root bounds are dropped and `false` is returned.
    pub fn insert(&mut self, item: T) -> bool {
        if !self.root.bounds.intersects(&item.bounds()) {
            return false;
        }
        let idx = self.items.len();
        self.items.push(item);
        self.root.insert(idx, &self.items)
    }

    /// All items intersecting `range`, deduplicated, in insertion order
    pub fn query(&self, range: &Rect) -> Vec<&T> {
        let mut hits = Vec::new();
        self.root.query(range, &self.items, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits.into_iter().map(|idx| &self.items[idx]).collect()
    }

    /// Items overlapping the epsilon-sized box at `point`
    pub fn get_at(&self, point: Vec2) -> Vec<&T> {
        self.query(&Rect::around_point(point))
    }

    /// Fast existence check for any item intersecting `range`
    pub fn intersect(&self, range: &Rect) -> bool {
        self.root.intersect(range, &self.items)
    }

    /// Checks whether some stored item fully contains `rect`
    pub fn envelopes(&self, rect: &Rect) -> bool {
        self.root.envelopes(rect, &self.items)
    }

    /// Finds the closest boundary crossing of `ray` with any stored item
    /// strictly closer than `max_distance`.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<QuadRaycastHit<'_, T>> {
        self.root
            .raycast(ray, max_distance, &self.items)
            .map(|(distance, point, idx)| QuadRaycastHit {
                point,
                distance,
                item: &self.items[idx],
            })
    }

    /// Walks from `start` toward `end` hopping from item to item.
    ///
    /// At each step the walk looks up the items under the current point, exits
    /// the nearest (slightly inflated) item boundary along the line and steps a
    /// little past it. The walk fails as soon as no item covers the current point.
    pub fn throughcast(&self, start: Vec2, end: Vec2) -> Throughcast {
        let delta = end - start;
        let length = delta.length();
        if length <= f32::EPSILON {
            return if self.get_at(start).is_empty() {
                Throughcast {
                    passed: false,
                    boundary: Some(start),
                }
            } else {
                Throughcast {
                    passed: true,
                    boundary: None,
                }
            };
        }

        let direction = delta / length;
        let mut current = start;

        for _ in 0..THROUGHCAST_MAX_STEPS {
            let covering = self.get_at(current);
            if covering.is_empty() {
                return Throughcast {
                    passed: false,
                    boundary: Some(current),
                };
            }

            let ray = Ray::new(current, direction);
            let mut closest: Option<(f32, Vec2, Rect)> = None;
            for item in covering {
                let rect = item.bounds();
                if let Some(exit) = intersect_ray_rect(&ray, &rect.inflate(THROUGHCAST_INFLATION)) {
                    let d = current.distance(exit);
                    if closest.map_or(true, |(best, _, _)| d < best) {
                        closest = Some((d, exit, rect));
                    }
                }
            }

            let Some((_, exit, last_rect)) = closest else {
                return Throughcast {
                    passed: false,
                    boundary: None,
                };
            };

            current = exit + direction * THROUGHCAST_STEP;

            if (current - start).dot(direction) >= length {
                let boundary = if last_rect.contains_point(end) {
                    None
                } else {
                    Some(current)
                };
                return Throughcast {
                    passed: true,
                    boundary,
                };
            }
        }

        Throughcast {
            passed: false,
            boundary: Some(current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, size: f32) -> Vec<Rect> {
        let mut out = Vec::new();
        for y in 0..n {
            for x in 0..n {
                out.push(Rect::new(x as f32 * size, y as f32 * size, size, size));
            }
        }
        out
    }

    #[test]
    fn test_insert_splits_after_threshold() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        for r in grid(4, 25.0).into_iter().take(QUADTREE_MAX_ITEMS - 1) {
            tree.insert(r);
        }
        assert_eq!(tree.depth(), 1);
        tree.insert(Rect::new(80.0, 80.0, 5.0, 5.0));
        assert!(tree.depth() > 1);
        assert_eq!(tree.len(), QUADTREE_MAX_ITEMS);
    }

    #[test]
    fn test_query_deduplicates_spanning_items() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let spanning = Rect::new(40.0, 40.0, 20.0, 20.0);
        tree.insert(spanning);
        for r in grid(3, 10.0) {
            tree.insert(r);
        }
        let hits = tree.query(&Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(hits.len(), 10);
        assert_eq!(hits.iter().filter(|r| ***r == spanning).count(), 1);
    }

    #[test]
    fn test_items_outside_bounds_are_dropped() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(!tree.insert(Rect::new(50.0, 50.0, 1.0, 1.0)));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_get_at_and_intersect() {
        let tree = QuadTree::from_items(Rect::new(0.0, 0.0, 100.0, 100.0), grid(10, 10.0));
        let hits = tree.get_at(Vec2::new(15.0, 15.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0], Rect::new(10.0, 10.0, 10.0, 10.0));
        assert!(tree.intersect(&Rect::new(55.0, 55.0, 1.0, 1.0)));
        assert!(!tree.intersect(&Rect::new(150.0, 150.0, 1.0, 1.0)));
    }

    #[test]
    fn test_envelopes() {
        let tree = QuadTree::from_items(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![Rect::new(0.0, 0.0, 50.0, 50.0)],
        );
        assert!(tree.envelopes(&Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!tree.envelopes(&Rect::new(40.0, 40.0, 20.0, 20.0)));
    }

    #[test]
    fn test_raycast_returns_closest_hit() {
        let tree = QuadTree::from_items(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![Rect::new(60.0, 40.0, 10.0, 20.0), Rect::new(30.0, 40.0, 10.0, 20.0)],
        );
        let ray = Ray::new(Vec2::new(0.0, 50.0), Vec2::X);
        let hit = tree.raycast(&ray, f32::INFINITY).expect("ray should hit");
        assert_eq!(*hit.item, Rect::new(30.0, 40.0, 10.0, 20.0));
        assert!((hit.point - Vec2::new(30.0, 50.0)).length() < 1e-4);

        assert!(tree.raycast(&ray, 20.0).is_none());
    }

    #[test]
    fn test_throughcast_passes_over_covered_strip() {
        let strip: Vec<Rect> = (0..5)
            .map(|i| Rect::new(i as f32 * 20.0, 0.0, 20.0, 20.0))
            .collect();
        let tree = QuadTree::from_items(Rect::new(0.0, 0.0, 100.0, 100.0), strip);
        let cast = tree.throughcast(Vec2::new(2.0, 10.0), Vec2::new(95.0, 10.0));
        assert!(cast.passed);
        assert!(cast.boundary.is_none());
    }

    #[test]
    fn test_throughcast_fails_across_gap() {
        let tree = QuadTree::from_items(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![Rect::new(0.0, 0.0, 30.0, 20.0), Rect::new(60.0, 0.0, 40.0, 20.0)],
        );
        let cast = tree.throughcast(Vec2::new(5.0, 10.0), Vec2::new(90.0, 10.0));
        assert!(!cast.passed);
        let stop = cast.boundary.expect("walk should stop in the gap");
        assert!(stop.x > 30.0 && stop.x < 60.0);
    }
}
