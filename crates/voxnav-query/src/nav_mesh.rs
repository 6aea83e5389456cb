//! Navigation mesh facade
//!
//! [`NavMesh`] owns the obstacle and volume lists, runs bakes, and answers
//! path, raycast and point queries against the last baked [`VoxelGraph`].

use std::f32::consts::PI;

use glam::Vec2;
use voxnav_bake::{
    BakeContext, BakeMode, Portal, Voxel, VoxelGraph, VoxelId, Voxelizer, VoxelizerConfig,
};
use voxnav_common::{Error, Ray, Rect, Result};
use web_time::Instant;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serialization")]
use voxnav_bake::serializer::{self, Encoding, Payload};
#[cfg(feature = "serialization")]
use voxnav_bake::TimerCategory;

use crate::congestion::{CongestionMap, NoCongestion};
use crate::path_finder::{PathFinder, PathFinderOptions};
use crate::raycast_hit::RaycastHit;
use crate::registry::{NoObstacleRegistry, ObstacleRegistry};

/// Default ray length for [`NavMesh::raycast`]
pub const DEFAULT_RAYCAST_DISTANCE: f32 = 1000.0;

/// Number of rays cast by [`NavMesh::get_nearest_point`]
const NEAREST_POINT_RAYS: usize = 8;

/// Navigation mesh parameters
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct NavMeshConfig {
    /// Width of the default bake area
    pub width: f32,
    /// Height of the default bake area
    pub height: f32,
    /// Smallest quadrant the voxelizer keeps splitting into
    pub min_voxel_size: f32,
    pub bake_mode: BakeMode,
    pub path_finder: PathFinderOptions,
}

impl Default for NavMeshConfig {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            min_voxel_size: 5.0,
            bake_mode: BakeMode::IncludeAll,
            path_finder: PathFinderOptions::default(),
        }
    }
}

impl NavMeshConfig {
    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.width.is_finite() || !self.height.is_finite() || self.width < 0.0 || self.height < 0.0 {
            return Err(Error::Configuration(format!(
                "navmesh dimensions must be finite and non-negative, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.min_voxel_size.is_finite() || self.min_voxel_size <= 0.0 {
            return Err(Error::Configuration(format!(
                "min_voxel_size must be positive, got {}",
                self.min_voxel_size
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "serialization")]
#[derive(Debug, Serialize, Deserialize)]
struct NavMeshDocument {
    min_voxel_size: f32,
    obstacles: Payload,
    volumes: Payload,
    mode: BakeMode,
    voxelizer: String,
}

/// Baked navigation mesh plus the inputs it was baked from
pub struct NavMesh {
    config: NavMeshConfig,
    obstacles: Vec<Rect>,
    volumes: Vec<Rect>,
    graph: Option<VoxelGraph>,
    path_finder: PathFinder,
    congestion: Box<dyn CongestionMap>,
    context: BakeContext,
}

impl Default for NavMesh {
    fn default() -> Self {
        Self::new(NavMeshConfig::default())
    }
}

impl NavMesh {
    pub fn new(config: NavMeshConfig) -> Self {
        let path_finder = PathFinder::new(config.path_finder);
        Self {
            config,
            obstacles: Vec::new(),
            volumes: Vec::new(),
            graph: None,
            path_finder,
            congestion: Box::new(NoCongestion),
            context: BakeContext::new(),
        }
    }

    /// Creates a mesh with the given default bake area and default settings
    pub fn with_dimensions(width: f32, height: f32) -> Self {
        Self::new(NavMeshConfig {
            width,
            height,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &NavMeshConfig {
        &self.config
    }

    pub fn set_bake_mode(&mut self, mode: BakeMode) {
        self.config.bake_mode = mode;
    }

    pub fn bake_mode(&self) -> BakeMode {
        self.config.bake_mode
    }

    pub fn set_min_voxel_size(&mut self, size: f32) {
        self.config.min_voxel_size = size;
    }

    pub fn min_voxel_size(&self) -> f32 {
        self.config.min_voxel_size
    }

    pub fn set_dimensions(&mut self, width: f32, height: f32) {
        self.config.width = width;
        self.config.height = height;
    }

    pub fn dimensions(&self) -> (f32, f32) {
        (self.config.width, self.config.height)
    }

    pub fn set_obstacles(&mut self, obstacles: Vec<Rect>) {
        self.obstacles = obstacles;
    }

    pub fn add_obstacle(&mut self, obstacle: Rect) {
        self.obstacles.push(obstacle);
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    pub fn set_volumes(&mut self, volumes: Vec<Rect>) {
        if self.config.bake_mode != BakeMode::Volume {
            log::warn!("Setting volumes on a navmesh that is not in volume mode");
        }
        self.volumes = volumes;
    }

    pub fn add_volume(&mut self, volume: Rect) {
        if self.config.bake_mode != BakeMode::Volume {
            log::warn!("Adding a volume to a navmesh that is not in volume mode");
        }
        self.volumes.push(volume);
    }

    pub fn volumes(&self) -> &[Rect] {
        &self.volumes
    }

    pub fn path_finder(&self) -> &PathFinder {
        &self.path_finder
    }

    pub fn set_path_finder_options(&mut self, options: PathFinderOptions) {
        self.config.path_finder = options;
        self.path_finder.set_options(options);
    }

    pub fn set_congestion_map(&mut self, congestion: Box<dyn CongestionMap>) {
        self.congestion = congestion;
        self.path_finder.clear_cache();
    }

    pub fn congestion(&self) -> &dyn CongestionMap {
        self.congestion.as_ref()
    }

    pub fn congestion_mut(&mut self) -> &mut dyn CongestionMap {
        self.congestion.as_mut()
    }

    /// Log and timers of the most recent bake or import
    pub fn context(&self) -> &BakeContext {
        &self.context
    }

    pub fn is_baked(&self) -> bool {
        self.graph.is_some()
    }

    pub fn graph(&self) -> Option<&VoxelGraph> {
        self.graph.as_ref()
    }

    /// All voxels of the baked graph (empty before the first bake)
    pub fn voxels(&self) -> &[Voxel] {
        self.graph.as_ref().map_or(&[], |g| g.voxels())
    }

    fn baked_graph(&self) -> Result<&VoxelGraph> {
        self.graph
            .as_ref()
            .ok_or_else(|| Error::Query("navmesh has not been baked".to_string()))
    }

    /// Bakes the default `(0, 0, width, height)` area without padding
    pub fn bake_default(&mut self) -> Result<()> {
        let area = Rect::new(0.0, 0.0, self.config.width, self.config.height);
        self.bake(area, 0.0)
    }

    /// Bakes `area` without forwarding obstacles anywhere
    pub fn bake(&mut self, area: Rect, padding: f32) -> Result<()> {
        self.bake_into(area, padding, &mut NoObstacleRegistry)
    }

    /// Bakes `area`, then hands volumes and obstacles to `registry`.
    ///
    /// Volumes are registered clockwise and obstacles counter-clockwise. A
    /// failed bake leaves both the previous graph and `registry` untouched.
    pub fn bake_into(
        &mut self,
        area: Rect,
        padding: f32,
        registry: &mut dyn ObstacleRegistry,
    ) -> Result<()> {
        self.config.validate()?;

        let voxelizer = Voxelizer::new(VoxelizerConfig {
            min_voxel_size: self.config.min_voxel_size,
            obstacle_padding: padding,
            simplify: true,
        });
        let mut context = BakeContext::new();
        let graph = voxelizer.voxelize(
            area,
            self.config.bake_mode,
            &self.volumes,
            &self.obstacles,
            &mut context,
        )?;

        self.register_geometry(registry);
        self.graph = Some(graph);
        self.context = context;
        self.path_finder.clear_cache();
        Ok(())
    }

    fn register_geometry(&self, registry: &mut dyn ObstacleRegistry) {
        registry.clear_obstacles();
        for volume in &self.volumes {
            registry.register_obstacle(&volume.outline_cw());
        }
        for obstacle in &self.obstacles {
            registry.register_obstacle(&obstacle.outline_ccw());
        }
        registry.process_obstacles();
    }

    /// Plans a path, returning query errors instead of logging them
    pub fn find_path(&mut self, start: Vec2, end: Vec2) -> Result<Vec<Vec2>> {
        let graph = self
            .graph
            .as_ref()
            .ok_or_else(|| Error::Query("navmesh has not been baked".to_string()))?;
        let started = Instant::now();
        let path = self
            .path_finder
            .find_path(graph, start, end, self.congestion.as_ref())?;
        log::debug!(
            "Path {} -> {} with {} points in {:.3}ms",
            start,
            end,
            path.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(path)
    }

    /// Plans a path; points outside the mesh give an empty path.
    ///
    /// A disconnected graph is still an error.
    pub fn get_path(&mut self, start: Vec2, end: Vec2) -> Result<Vec<Vec2>> {
        match self.find_path(start, end) {
            Err(Error::Query(message)) => {
                log::warn!("Path query failed: {}", message);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Walks from `origin` along `direction` until walkable space ends
    pub fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Result<RaycastHit> {
        let graph = self.baked_graph()?;
        let end = origin + direction * max_distance;
        let cast = graph.throughcast(origin, end);
        Ok(match cast.boundary {
            Some(point) => RaycastHit::boundary_hit(point),
            None => RaycastHit::no_hit(end),
        })
    }

    /// True if some voxel covers `point`
    pub fn validate_point(&self, point: Vec2) -> bool {
        self.graph.as_ref().is_some_and(|g| g.contains_point(point))
    }

    /// Returns `point` if it is walkable, else the closest walkable point found
    /// by casting evenly spaced rays up to `range`.
    pub fn get_nearest_point(&self, point: Vec2, range: f32) -> Option<Vec2> {
        let graph = self.graph.as_ref()?;
        if graph.contains_point(point) {
            return Some(point);
        }

        let step = 2.0 * PI / NEAREST_POINT_RAYS as f32;
        (0..NEAREST_POINT_RAYS)
            .filter_map(|i| {
                let angle = step * i as f32;
                let ray = Ray::new(point, Vec2::new(angle.cos(), angle.sin()));
                graph.raycast(&ray, range).map(|hit| (hit.distance, hit.point))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, p)| p)
    }

    /// Adds a manual link from `from` to `to`, e.g. for teleports.
    ///
    /// Logs an error and returns `None` when either point is outside the mesh.
    pub fn add_jump_point(&mut self, from: Vec2, to: Vec2) -> Option<VoxelId> {
        let Some(graph) = self.graph.as_mut() else {
            log::error!("Invalid jump point: navmesh has not been baked");
            return None;
        };
        let start = graph.voxel_at(from);
        let dest = graph.voxel_at(to);
        let (Some(start), Some(dest)) = (start, dest) else {
            log::error!(
                "Invalid jump point - voxel not found (start: {}, destination: {})",
                start.is_some(),
                dest.is_some()
            );
            return None;
        };

        let jump = graph.add_virtual(from);
        graph.link(start, jump, Portal::point(from));
        graph.link(jump, dest, Portal::point(to));
        self.path_finder.clear_cache();
        Some(jump)
    }

    /// Serializes settings, inputs and the baked graph to JSON
    #[cfg(feature = "serialization")]
    pub fn serialize(&mut self, encoding: Encoding) -> Result<String> {
        let graph = self
            .graph
            .as_ref()
            .ok_or_else(|| Error::Query("navmesh has not been baked".to_string()))?;
        self.context.start_timer(TimerCategory::Serialize);
        let voxelizer = serializer::serialize_graph(graph, encoding)?;
        let document = NavMeshDocument {
            min_voxel_size: self.config.min_voxel_size,
            obstacles: Payload::encode(&serializer::pack_rects(&self.obstacles), encoding),
            volumes: Payload::encode(&serializer::pack_rects(&self.volumes), encoding),
            mode: self.config.bake_mode,
            voxelizer,
        };
        let out = serde_json::to_string(&document).map_err(|e| Error::Serialization(e.to_string()));
        self.context.stop_timer(TimerCategory::Serialize);
        out
    }

    /// Restores a mesh written by [`NavMesh::serialize`] without rebaking
    #[cfg(feature = "serialization")]
    pub fn import(&mut self, data: &str) -> Result<()> {
        self.import_into(data, &mut NoObstacleRegistry)
    }

    /// Restores a mesh and registers its obstacles and volumes with `registry`.
    ///
    /// Nothing changes unless the whole document decodes.
    #[cfg(feature = "serialization")]
    pub fn import_into(&mut self, data: &str, registry: &mut dyn ObstacleRegistry) -> Result<()> {
        let mut context = BakeContext::new();
        context.start_timer(TimerCategory::Deserialize);

        let document: NavMeshDocument =
            serde_json::from_str(data).map_err(|e| Error::Serialization(e.to_string()))?;
        let obstacles = serializer::unpack_rects(&document.obstacles.decode()?)?;
        let volumes = serializer::unpack_rects(&document.volumes.decode()?)?;
        let graph = serializer::deserialize_graph(&document.voxelizer)?;

        context.stop_timer(TimerCategory::Deserialize);
        context.log_info(format!("Imported navmesh with {} voxels", graph.len()));

        let bounds = graph.bounds();
        self.config.width = bounds.right();
        self.config.height = bounds.bottom();
        self.config.min_voxel_size = document.min_voxel_size;
        self.config.bake_mode = document.mode;
        self.obstacles = obstacles;
        self.volumes = volumes;
        self.register_geometry(registry);
        self.graph = Some(graph);
        self.context = context;
        self.path_finder.clear_cache();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mesh = NavMesh::with_dimensions(100.0, 100.0);
        assert_eq!(mesh.min_voxel_size(), 5.0);
        assert_eq!(mesh.bake_mode(), BakeMode::IncludeAll);
        assert!(!mesh.is_baked());
        assert!(mesh.voxels().is_empty());
    }

    #[test]
    fn test_unbaked_queries_are_guarded() {
        let mut mesh = NavMesh::with_dimensions(100.0, 100.0);
        assert!(!mesh.validate_point(Vec2::new(5.0, 5.0)));
        assert!(mesh.get_nearest_point(Vec2::new(5.0, 5.0), 10.0).is_none());
        assert!(matches!(
            mesh.raycast(Vec2::ZERO, Vec2::X, 10.0),
            Err(Error::Query(_))
        ));
        assert!(matches!(
            mesh.find_path(Vec2::ZERO, Vec2::ONE),
            Err(Error::Query(_))
        ));
        assert!(mesh.add_jump_point(Vec2::ZERO, Vec2::ONE).is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut mesh = NavMesh::with_dimensions(100.0, 100.0);
        mesh.set_min_voxel_size(0.0);
        assert!(matches!(mesh.bake_default(), Err(Error::Configuration(_))));
        assert!(!mesh.is_baked());
    }

    #[test]
    fn test_bake_keeps_context() -> Result<()> {
        let mut mesh = NavMesh::with_dimensions(100.0, 100.0);
        mesh.bake_default()?;
        assert_eq!(mesh.context().phase(voxnav_bake::TimerCategory::Total).runs, 1);
        Ok(())
    }
}
