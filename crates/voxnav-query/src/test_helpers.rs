//! Shared fixtures for navmesh tests

use glam::Vec2;
use voxnav_bake::BakeMode;
use voxnav_common::Rect;

use crate::nav_mesh::NavMesh;
use crate::registry::ObstacleRegistry;

pub const CENTER_OBSTACLE: Rect = Rect::new(40.0, 40.0, 20.0, 20.0);

/// 100x100 mesh with nothing in it
pub fn open_mesh() -> NavMesh {
    let mut mesh = NavMesh::with_dimensions(100.0, 100.0);
    mesh.bake_default().expect("open field bakes");
    mesh
}

/// 100x100 mesh with one square obstacle in the middle
pub fn obstacle_mesh() -> NavMesh {
    let mut mesh = NavMesh::with_dimensions(100.0, 100.0);
    mesh.add_obstacle(CENTER_OBSTACLE);
    mesh.bake_default().expect("obstacle field bakes");
    mesh
}

/// Two 20x20 walkable islands 20 units apart, baked in volume mode
pub fn islands_mesh() -> NavMesh {
    let mut mesh = NavMesh::with_dimensions(80.0, 80.0);
    mesh.set_bake_mode(BakeMode::Volume);
    mesh.set_volumes(vec![
        Rect::new(0.0, 0.0, 20.0, 20.0),
        Rect::new(40.0, 0.0, 20.0, 20.0),
    ]);
    mesh.bake_default().expect("islands bake");
    mesh
}

/// True if some sample along `a -> b` lies strictly inside `rect`
pub fn segment_enters(rect: &Rect, a: Vec2, b: Vec2) -> bool {
    const SAMPLES: usize = 200;
    (0..=SAMPLES).any(|i| {
        let p = a.lerp(b, i as f32 / SAMPLES as f32);
        p.x > rect.x && p.x < rect.right() && p.y > rect.y && p.y < rect.bottom()
    })
}

/// Registry that records every call it receives
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    pub clears: usize,
    pub processed: usize,
    pub polygons: Vec<Vec<Vec2>>,
}

impl ObstacleRegistry for RecordingRegistry {
    fn clear_obstacles(&mut self) {
        self.clears += 1;
        self.polygons.clear();
    }

    fn register_obstacle(&mut self, vertices: &[Vec2]) -> Option<usize> {
        self.polygons.push(vertices.to_vec());
        Some(self.polygons.len() - 1)
    }

    fn process_obstacles(&mut self) {
        self.processed += 1;
    }
}

/// Twice the signed area of a polygon; positive for counter-clockwise
pub fn signed_area_2(polygon: &[Vec2]) -> f32 {
    (0..polygon.len())
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            a.x * b.y - b.x * a.y
        })
        .sum()
}
