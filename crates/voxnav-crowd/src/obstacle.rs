//! Polygon obstacles for the avoidance solver
//!
//! Polygons are stored as circular doubly-linked lists of vertices inside one
//! arena. Each vertex starts the edge running to its `next` vertex, so edges
//! need no storage of their own.

use glam::Vec2;
use voxnav_common::{left_of, Bounded, QuadTree, Rect};

/// One polygon corner and the edge leaving it
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleVertex {
    pub id: usize,
    pub point: Vec2,
    /// Unit vector along the edge to `next`
    pub direction: Vec2,
    /// True when the polygon turns left (or goes straight) at this vertex
    pub convex: bool,
    pub next: usize,
    pub previous: usize,
    /// Id of the first vertex of the owning polygon
    pub polygon: usize,
}

/// Edge entry stored in the obstacle index
#[derive(Debug, Clone, Copy)]
pub struct ObstacleEdge {
    pub vertex: usize,
    bounds: Rect,
}

impl Bounded for ObstacleEdge {
    fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// Arena of obstacle vertices plus the edge index built from them
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    vertices: Vec<ObstacleVertex>,
    index: Option<QuadTree<ObstacleEdge>>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a closed polygon.
    ///
    /// Counter-clockwise polygons are solid; clockwise ones keep agents
    /// inside. Returns the id of the first vertex, or `None` for fewer than
    /// two vertices. The polygon is not seen by queries until
    /// [`ObstacleSet::process`] runs.
    pub fn add_polygon(&mut self, points: &[Vec2]) -> Option<usize> {
        if points.len() < 2 {
            return None;
        }

        let first = self.vertices.len();
        let count = points.len();
        for (i, &point) in points.iter().enumerate() {
            let prev_point = points[(i + count - 1) % count];
            let next_point = points[(i + 1) % count];
            let convex = count == 2 || left_of(prev_point, point, next_point) >= 0.0;

            self.vertices.push(ObstacleVertex {
                id: first + i,
                point,
                direction: (next_point - point).normalize_or_zero(),
                convex,
                next: first + (i + 1) % count,
                previous: first + (i + count - 1) % count,
                polygon: first,
            });
        }
        Some(first)
    }

    /// Shifts every vertex of the polygon containing `vertex` and rebuilds the index
    pub fn move_polygon(&mut self, vertex: usize, offset: Vec2) -> bool {
        if vertex >= self.vertices.len() {
            return false;
        }
        let mut current = vertex;
        loop {
            self.vertices[current].point += offset;
            current = self.vertices[current].next;
            if current == vertex {
                break;
            }
        }
        self.process();
        true
    }

    /// Rebuilds the edge index from the current vertices
    pub fn process(&mut self) {
        let edges: Vec<ObstacleEdge> = self
            .vertices
            .iter()
            .map(|v| ObstacleEdge {
                vertex: v.id,
                bounds: Rect::from_corners(v.point, self.vertices[v.next].point),
            })
            .collect();

        let Some(bounds) = edges
            .iter()
            .map(|e| e.bounds)
            .reduce(|a, b| a.union(&b))
        else {
            self.index = None;
            return;
        };
        self.index = Some(QuadTree::from_items(bounds.inflate(1.0), edges));
    }

    pub fn is_processed(&self) -> bool {
        self.index.is_some()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.index = None;
    }

    pub fn vertex(&self, id: usize) -> Option<&ObstacleVertex> {
        self.vertices.get(id)
    }

    pub fn vertices(&self) -> &[ObstacleVertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edges whose bounding boxes come within `range` of `position`
    pub fn edges_near(&self, position: Vec2, range: f32) -> Vec<usize> {
        match &self.index {
            Some(index) => index
                .query(&Rect::new(position.x, position.y, 0.0, 0.0).inflate(range))
                .into_iter()
                .map(|e| e.vertex)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Checks whether `q1` and `q2` see each other past every processed edge.
    ///
    /// An edge blocks when the segment enters it from its outer (right) side
    /// and passes closer than `radius` to it. Edges are one-sided, so looking
    /// out of a solid polygon is never blocked. Unprocessed obstacles never
    /// block.
    pub fn query_visibility(&self, q1: Vec2, q2: Vec2, radius: f32) -> bool {
        let Some(index) = &self.index else {
            return true;
        };

        let range = Rect::from_corners(q1, q2).inflate(radius.max(0.0));
        let length_sq = (q2 - q1).length_squared();
        let radius_sq = radius * radius;

        index.query(&range).into_iter().all(|edge| {
            let v1 = &self.vertices[edge.vertex];
            let v2 = &self.vertices[v1.next];

            let q1_left = left_of(v1.point, v2.point, q1);
            let q2_left = left_of(v1.point, v2.point, q2);
            let crosses_inward = q1_left < 0.0 && q2_left > 0.0;
            if !crosses_inward {
                return true;
            }
            if length_sq <= f32::EPSILON {
                return false;
            }

            let p1_left = left_of(q1, q2, v1.point);
            let p2_left = left_of(q1, q2, v2.point);
            let inv_length = 1.0 / length_sq;
            p1_left * p2_left >= 0.0
                && p1_left * p1_left * inv_length > radius_sq
                && p2_left * p2_left * inv_length > radius_sq
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec2> {
        Rect::new(40.0, 40.0, 20.0, 20.0).outline_ccw().to_vec()
    }

    #[test]
    fn test_polygon_links_are_circular() {
        let mut set = ObstacleSet::new();
        assert_eq!(set.add_polygon(&[Vec2::ZERO]), None);

        let first = set.add_polygon(&square()).expect("square has 4 vertices");
        assert_eq!(first, 0);
        assert_eq!(set.len(), 4);
        for v in set.vertices() {
            assert_eq!(set.vertices()[v.next].previous, v.id);
            assert_eq!(v.polygon, 0);
            assert!((v.direction.length() - 1.0).abs() < 1e-5);
        }
        assert_eq!(set.vertex(3).map(|v| v.next), Some(0));
    }

    #[test]
    fn test_convexity_follows_winding() {
        let mut set = ObstacleSet::new();
        set.add_polygon(&square());
        assert!(set.vertices().iter().all(|v| v.convex));

        let mut boundary = ObstacleSet::new();
        boundary.add_polygon(&Rect::new(0.0, 0.0, 100.0, 100.0).outline_cw());
        assert!(boundary.vertices().iter().all(|v| !v.convex));
    }

    #[test]
    fn test_visibility() {
        let mut set = ObstacleSet::new();
        set.add_polygon(&square());
        assert!(
            set.query_visibility(Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0), 0.0),
            "unprocessed obstacles do not block"
        );

        set.process();
        assert!(!set.query_visibility(Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0), 0.0));
        assert!(set.query_visibility(Vec2::new(0.0, 10.0), Vec2::new(100.0, 10.0), 0.0));
        // Grazes past the lower left corner.
        assert!(set.query_visibility(Vec2::new(30.0, 30.0), Vec2::new(70.0, 38.0), 0.0));
        // Looking out of the solid square is allowed.
        assert!(set.query_visibility(Vec2::new(50.0, 50.0), Vec2::new(100.0, 50.0), 0.0));
        // Looking into it is not, and a full pass is blocked either way.
        assert!(!set.query_visibility(Vec2::new(100.0, 50.0), Vec2::new(50.0, 50.0), 0.0));
        assert!(!set.query_visibility(Vec2::new(100.0, 50.0), Vec2::new(0.0, 50.0), 0.0));
    }

    #[test]
    fn test_move_polygon_shifts_every_vertex() {
        let mut set = ObstacleSet::new();
        set.add_polygon(&square());
        set.process();
        assert!(set.move_polygon(2, Vec2::new(0.0, 100.0)));
        assert_eq!(set.vertex(0).map(|v| v.point), Some(Vec2::new(40.0, 140.0)));
        assert!(set.query_visibility(Vec2::new(0.0, 50.0), Vec2::new(100.0, 50.0), 0.0));
        assert!(!set.move_polygon(99, Vec2::ONE));
    }

    #[test]
    fn test_edges_near() {
        let mut set = ObstacleSet::new();
        set.add_polygon(&square());
        assert!(set.edges_near(Vec2::new(35.0, 50.0), 10.0).is_empty());
        set.process();
        let near = set.edges_near(Vec2::new(35.0, 50.0), 10.0);
        assert!(near.contains(&3), "left edge starts at the last vertex");
        assert!(set.edges_near(Vec2::new(0.0, 0.0), 5.0).is_empty());
    }
}
