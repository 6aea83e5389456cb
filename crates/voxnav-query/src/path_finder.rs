//! Voxel graph search with funnel and any-angle refinement
//!
//! The search is a greedy best-first walk over voxel neighbors. Candidates are
//! scored by distance travelled, hop count, distance left, congestion toward
//! the goal, traversed area and the size of the last voxel, so coarse and
//! congested regions are avoided at the cost of strict optimality. Each voxel
//! is entered at most once.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::Vec2;
use voxnav_bake::{shared_edge, Portal, VoxelGraph, VoxelId};
use voxnav_common::{normalize_biased, Error, Result};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::any_angle::smooth_path_in_place;
use crate::congestion::CongestionMap;
use crate::funnel::string_pull;

const TRAVEL_WEIGHT: f32 = 1_000.0;
const STEP_WEIGHT: f32 = 1_000.0;
const CONGESTION_WEIGHT: f32 = 1_000.0;
const AREA_WEIGHT: f32 = 1_000.0;
const MAX_SIDE_WEIGHT: f32 = 2_000.0;

/// Path refinement switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct PathFinderOptions {
    /// Pull the path taut through the crossed portals; otherwise use voxel centers
    pub use_funnel: bool,
    /// Drop waypoints that can be skipped with a clear line of sight
    pub use_any_angle: bool,
    /// Remember voxel routes between start and end voxels
    pub cache_paths: bool,
}

impl Default for PathFinderOptions {
    fn default() -> Self {
        Self {
            use_funnel: true,
            use_any_angle: true,
            cache_paths: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    steps: Vec<VoxelId>,
    travelled: f32,
    area: f32,
    score: f32,
}

/// Finds paths over a [`VoxelGraph`]
#[derive(Debug, Clone, Default)]
pub struct PathFinder {
    options: PathFinderOptions,
    cache: HashMap<(VoxelId, VoxelId), Vec<VoxelId>>,
}

impl PathFinder {
    pub fn new(options: PathFinderOptions) -> Self {
        Self {
            options,
            cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &PathFinderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: PathFinderOptions) {
        if !options.cache_paths {
            self.cache.clear();
        }
        self.options = options;
    }

    /// Forgets cached routes; needed whenever the graph changes
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached_routes(&self) -> usize {
        self.cache.len()
    }

    /// Plans a path from `start` to `end`.
    ///
    /// Returns [`Error::Query`] when either point is outside every voxel and
    /// [`Error::SearchExhausted`] when the voxels are not connected.
    pub fn find_path(
        &mut self,
        graph: &VoxelGraph,
        start: Vec2,
        end: Vec2,
        congestion: &dyn CongestionMap,
    ) -> Result<Vec<Vec2>> {
        let start_voxel = graph
            .voxel_at(start)
            .ok_or_else(|| Error::Query(format!("no voxel found at start point {}", start)))?;
        let end_voxel = graph
            .voxel_at(end)
            .ok_or_else(|| Error::Query(format!("no voxel found at end point {}", end)))?;

        if start_voxel == end_voxel {
            let mut path = vec![start, end];
            self.smooth(graph, &mut path);
            return Ok(path);
        }

        let route = match self.cache.get(&(start_voxel, end_voxel)) {
            Some(route) => {
                log::debug!("Path cache hit for {:?} -> {:?}", start_voxel, end_voxel);
                route.clone()
            }
            None => {
                let route = self.search(graph, start_voxel, end_voxel, end, congestion)?;
                if self.options.cache_paths {
                    self.cache.insert((start_voxel, end_voxel), route.clone());
                }
                route
            }
        };

        let mut path = if self.options.use_funnel {
            string_pull(&build_portals(graph, &route, start, end))
        } else {
            route
                .iter()
                .filter_map(|&id| graph.voxel(id))
                .map(|v| v.center())
                .collect()
        };
        self.smooth(graph, &mut path);
        Ok(path)
    }

    fn smooth(&self, graph: &VoxelGraph, path: &mut Vec<Vec2>) {
        if self.options.use_any_angle {
            smooth_path_in_place(path, |a, b| graph.throughcast(a, b).passed);
        }
    }

    /// Best-first search from `start` to `goal`, returning the voxels visited in order
    pub fn search(
        &self,
        graph: &VoxelGraph,
        start: VoxelId,
        goal: VoxelId,
        end_point: Vec2,
        congestion: &dyn CongestionMap,
    ) -> Result<Vec<VoxelId>> {
        let first = graph
            .voxel(start)
            .ok_or_else(|| Error::Query(format!("unknown start voxel {:?}", start)))?;

        let mut queue = VecDeque::new();
        queue.push_back(Candidate {
            steps: vec![start],
            travelled: 0.0,
            area: first.rect.area(),
            score: 0.0,
        });
        let mut seen = HashSet::new();

        while let Some(current) = queue.pop_front() {
            let Some(&last_id) = current.steps.last() else {
                continue;
            };
            let Some(last) = graph.voxel(last_id) else {
                continue;
            };

            for neighbor in &last.neighbors {
                if neighbor.voxel == goal {
                    let mut steps = current.steps;
                    steps.push(goal);
                    return Ok(steps);
                }

                if !seen.insert(neighbor.voxel) {
                    continue;
                }
                let Some(next) = graph.voxel(neighbor.voxel) else {
                    continue;
                };

                let target = next.position();
                let hop = last
                    .rect
                    .corners()
                    .iter()
                    .map(|corner| corner.distance_squared(target))
                    .fold(f32::INFINITY, f32::min);

                let mut steps = current.steps.clone();
                steps.push(neighbor.voxel);
                let mut candidate = Candidate {
                    steps,
                    travelled: current.travelled + hop,
                    area: current.area + next.rect.area(),
                    score: 0.0,
                };
                candidate.score = score(&candidate, graph, end_point, congestion);

                let best = queue.front().map_or(f32::INFINITY, |c| c.score);
                if candidate.score > best {
                    queue.push_back(candidate);
                } else {
                    queue.push_front(candidate);
                }
            }
        }

        Err(Error::SearchExhausted(format!(
            "no route from voxel {} to voxel {}",
            start.index(),
            goal.index()
        )))
    }
}

/// Lower is better
fn score(candidate: &Candidate, graph: &VoxelGraph, end: Vec2, congestion: &dyn CongestionMap) -> f32 {
    let Some(last) = candidate.steps.last().and_then(|&id| graph.voxel(id)) else {
        return 1.0;
    };
    let center = last.center();

    candidate.travelled * TRAVEL_WEIGHT
        + candidate.steps.len() as f32 * STEP_WEIGHT
        + center.distance(end)
        + congestion.sample_along_line(center, end) * CONGESTION_WEIGHT
        + candidate.area * AREA_WEIGHT
        + last.rect.max_side() * MAX_SIDE_WEIGHT
}

/// Builds the oriented portal corridor for a voxel route.
///
/// Each portal is ordered left/right as seen from the center of the voxel it
/// leaves toward the portal's midpoint. Degenerate portals at `start` and
/// `end` close the corridor.
pub fn build_portals(graph: &VoxelGraph, route: &[VoxelId], start: Vec2, end: Vec2) -> Vec<Portal> {
    let mut portals = Vec::with_capacity(route.len() + 1);
    portals.push(Portal::point(start));

    for pair in route.windows(2) {
        let (Some(prev), Some(cur)) = (graph.voxel(pair[0]), graph.voxel(pair[1])) else {
            continue;
        };
        let portal = prev.portal_to(cur.id).or_else(|| {
            if prev.is_virtual() || cur.is_virtual() {
                None
            } else {
                shared_edge(&cur.rect, &prev.rect)
            }
        });
        let Some(portal) = portal else {
            continue;
        };

        let origin = prev.center();
        let direction = normalize_biased(portal.midpoint() - origin);
        portals.push(portal.oriented(origin, direction));
    }

    portals.push(Portal::point(end));
    portals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::NoCongestion;
    use voxnav_common::Rect;

    fn corridor() -> VoxelGraph {
        // An L: three cells along the bottom, then two going up on the right.
        VoxelGraph::from_rects(
            Rect::new(0.0, 0.0, 40.0, 40.0),
            vec![
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(10.0, 0.0, 10.0, 10.0),
                Rect::new(20.0, 0.0, 10.0, 10.0),
                Rect::new(20.0, 10.0, 10.0, 10.0),
                Rect::new(20.0, 20.0, 10.0, 10.0),
            ],
        )
    }

    #[test]
    fn test_search_follows_adjacency() -> Result<()> {
        let graph = corridor();
        let finder = PathFinder::default();
        let route = finder.search(&graph, VoxelId(0), VoxelId(4), Vec2::new(25.0, 25.0), &NoCongestion)?;
        assert_eq!(
            route,
            vec![VoxelId(0), VoxelId(1), VoxelId(2), VoxelId(3), VoxelId(4)]
        );
        Ok(())
    }

    #[test]
    fn test_portals_are_oriented_left_first() {
        let graph = corridor();
        let portals = build_portals(
            &graph,
            &[VoxelId(0), VoxelId(1)],
            Vec2::new(5.0, 5.0),
            Vec2::new(15.0, 5.0),
        );
        assert_eq!(portals.len(), 3);
        // Moving +x the left side is +y.
        assert_eq!(portals[1], Portal::new(Vec2::new(10.0, 10.0), Vec2::new(10.0, 0.0)));
        assert!(portals[0].is_degenerate() && portals[2].is_degenerate());
    }

    #[test]
    fn test_corner_path_hugs_inner_corner() -> Result<()> {
        let graph = corridor();
        let mut finder = PathFinder::new(PathFinderOptions {
            use_any_angle: false,
            ..Default::default()
        });
        let path = finder.find_path(&graph, Vec2::new(5.0, 5.0), Vec2::new(25.0, 25.0), &NoCongestion)?;
        assert_eq!(path.first(), Some(&Vec2::new(5.0, 5.0)));
        assert_eq!(path.last(), Some(&Vec2::new(25.0, 25.0)));
        assert!(path.contains(&Vec2::new(20.0, 10.0)), "{:?}", path);
        Ok(())
    }

    #[test]
    fn test_centers_without_funnel() -> Result<()> {
        let graph = corridor();
        let mut finder = PathFinder::new(PathFinderOptions {
            use_funnel: false,
            use_any_angle: false,
            cache_paths: false,
        });
        let path = finder.find_path(&graph, Vec2::new(5.0, 5.0), Vec2::new(25.0, 25.0), &NoCongestion)?;
        assert_eq!(path.len(), 5);
        assert_eq!(path[1], Vec2::new(15.0, 5.0));
        Ok(())
    }

    #[test]
    fn test_disconnected_graph_exhausts_search() {
        let graph = VoxelGraph::from_rects(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(50.0, 50.0, 10.0, 10.0)],
        );
        let mut finder = PathFinder::default();
        let result = finder.find_path(&graph, Vec2::new(5.0, 5.0), Vec2::new(55.0, 55.0), &NoCongestion);
        assert!(matches!(result, Err(Error::SearchExhausted(_))));
    }

    #[test]
    fn test_missing_voxel_is_query_error() {
        let graph = corridor();
        let mut finder = PathFinder::default();
        let result = finder.find_path(&graph, Vec2::new(5.0, 35.0), Vec2::new(25.0, 25.0), &NoCongestion);
        assert!(matches!(result, Err(Error::Query(_))));
    }

    #[test]
    fn test_cache_stores_routes() -> Result<()> {
        let graph = corridor();
        let mut finder = PathFinder::new(PathFinderOptions {
            cache_paths: true,
            ..Default::default()
        });
        let first = finder.find_path(&graph, Vec2::new(5.0, 5.0), Vec2::new(25.0, 25.0), &NoCongestion)?;
        assert_eq!(finder.cached_routes(), 1);
        let second = finder.find_path(&graph, Vec2::new(5.0, 5.0), Vec2::new(25.0, 25.0), &NoCongestion)?;
        assert_eq!(first, second);

        // A different end point in the same voxel reuses the route but ends where asked.
        let third = finder.find_path(&graph, Vec2::new(5.0, 5.0), Vec2::new(22.0, 28.0), &NoCongestion)?;
        assert_eq!(third.last(), Some(&Vec2::new(22.0, 28.0)));
        finder.clear_cache();
        assert_eq!(finder.cached_routes(), 0);
        Ok(())
    }
}
