//! Proximity grid for agent neighbor queries
//!
//! The simulator rebuilds this hash grid once per step. Queries only visit
//! the cells overlapping the search radius instead of every agent.

use std::collections::HashMap;

use glam::Vec2;

/// Default cell size for the proximity grid (in world units)
pub const DEFAULT_CELL_SIZE: f32 = 64.0;

/// Agent entry stored in the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAgent {
    pub id: usize,
    pub position: Vec2,
}

/// Grid cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GridCoord {
    x: i32,
    y: i32,
}

impl GridCoord {
    fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn from_world_pos(pos: Vec2, cell_size: f32) -> Self {
        Self {
            x: (pos.x / cell_size).floor() as i32,
            y: (pos.y / cell_size).floor() as i32,
        }
    }
}

/// Hash grid of agent positions
#[derive(Debug, Clone)]
pub struct ProximityGrid {
    cells: HashMap<GridCoord, Vec<GridAgent>>,
    cell_size: f32,
    agent_count: usize,
}

impl Default for ProximityGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl ProximityGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cells: HashMap::new(),
            // Minimum cell size to avoid division by zero
            cell_size: cell_size.max(0.1),
            agent_count: 0,
        }
    }

    pub fn insert(&mut self, id: usize, position: Vec2) {
        let coord = GridCoord::from_world_pos(position, self.cell_size);
        self.cells
            .entry(coord)
            .or_default()
            .push(GridAgent { id, position });
        self.agent_count += 1;
    }

    /// Replaces the grid contents with `agents`
    pub fn rebuild(&mut self, agents: impl IntoIterator<Item = (usize, Vec2)>) {
        self.clear();
        for (id, position) in agents {
            self.insert(id, position);
        }
    }

    /// Agents strictly closer than `radius` to `pos`, sorted by id
    pub fn query(&self, pos: Vec2, radius: f32) -> Vec<GridAgent> {
        let mut result = Vec::new();
        let center = GridCoord::from_world_pos(pos, self.cell_size);
        let cell_radius = ((radius / self.cell_size).ceil() as i32).max(1);
        let radius_sq = radius * radius;

        for dx in -cell_radius..=cell_radius {
            for dy in -cell_radius..=cell_radius {
                let coord = GridCoord::new(center.x + dx, center.y + dy);
                if let Some(cell) = self.cells.get(&coord) {
                    result.extend(
                        cell.iter()
                            .filter(|a| a.position.distance_squared(pos) < radius_sq)
                            .copied(),
                    );
                }
            }
        }

        result.sort_unstable_by_key(|a| a.id);
        result
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.agent_count = 0;
    }

    pub fn len(&self) -> usize {
        self.agent_count
    }

    pub fn is_empty(&self) -> bool {
        self.agent_count == 0
    }

    /// Gets the number of active cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
}
