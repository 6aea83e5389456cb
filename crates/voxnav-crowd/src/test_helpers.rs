//! Shared fixtures for avoidance and adapter tests

use glam::Vec2;
use voxnav_common::Rect;
use voxnav_query::NavMesh;

use crate::config::{AgentDefaults, SimulatorConfig};
use crate::crowd::Crowd;
use crate::simulator::Simulator;

pub const CENTER_OBSTACLE: Rect = Rect::new(40.0, 40.0, 20.0, 20.0);

/// Simulator with default settings that accepts agents
pub fn simulator() -> Simulator {
    Simulator::with_defaults(SimulatorConfig::default(), AgentDefaults::default())
}

pub fn crowd() -> Crowd {
    Crowd::new(simulator())
}

/// Unbaked 100x100 mesh without obstacles
pub fn open_nav() -> NavMesh {
    NavMesh::with_dimensions(100.0, 100.0)
}

/// Unbaked 100x100 mesh with one square obstacle in the middle
pub fn obstacle_nav() -> NavMesh {
    let mut nav = NavMesh::with_dimensions(100.0, 100.0);
    nav.add_obstacle(CENTER_OBSTACLE);
    nav
}

/// How far two agents' discs overlap; zero when apart
pub fn overlap(sim: &Simulator, a: usize, b: usize) -> f32 {
    let (Some(a), Some(b)) = (sim.agent(a), sim.agent(b)) else {
        return 0.0;
    };
    (a.radius + b.radius - a.position.distance(b.position)).max(0.0)
}

pub fn strictly_inside(rect: &Rect, p: Vec2) -> bool {
    p.x > rect.x && p.x < rect.right() && p.y > rect.y && p.y < rect.bottom()
}
