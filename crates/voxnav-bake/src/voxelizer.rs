//! Recursive quadrant subdivision of free space
//!
//! A region becomes a voxel when it is walkable (IncludeAll mode, or fully
//! inside a volume) and touches no padded obstacle. Otherwise, if it overlaps
//! walkable area, it is split into four quadrants until they would fall below
//! the minimum voxel size, at which point the remainder is discarded.

use voxnav_common::{Error, QuadTree, Rect, Result};

use crate::config::{BakeMode, VoxelizerConfig};
use crate::context::{BakeContext, TimerCategory};
use crate::simplifier::simplify;
use crate::voxel::VoxelGraph;

/// Walkable volume standing in for "everything" in IncludeAll mode
pub const INCLUDE_ALL_VOLUME: Rect = Rect::new(-50_000.0, -50_000.0, 100_000.0, 100_000.0);

/// Bakes obstacles and walkable volumes into a [`VoxelGraph`]
#[derive(Debug, Clone, Default)]
pub struct Voxelizer {
    config: VoxelizerConfig,
}

impl Voxelizer {
    pub fn new(config: VoxelizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VoxelizerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut VoxelizerConfig {
        &mut self.config
    }

    /// Runs subdivision, optional simplification and neighbor construction over `area`
    pub fn voxelize(
        &self,
        area: Rect,
        mode: BakeMode,
        volumes: &[Rect],
        obstacles: &[Rect],
        ctx: &mut BakeContext,
    ) -> Result<VoxelGraph> {
        self.config.validate()?;
        if !area.is_finite() || area.is_degenerate() {
            return Err(Error::InvalidInput(format!(
                "bake area must be finite with positive size, got {:?}",
                area
            )));
        }

        ctx.start_timer(TimerCategory::Total);

        let padding = self.config.obstacle_padding;
        let obstacle_tree = QuadTree::from_items(
            area,
            obstacles.iter().map(|obstacle| obstacle.inflate(padding)),
        );
        let volume_tree = match mode {
            BakeMode::IncludeAll => QuadTree::from_items(area, [INCLUDE_ALL_VOLUME]),
            BakeMode::Volume => QuadTree::from_items(area, volumes.iter().copied()),
        };

        ctx.start_timer(TimerCategory::Subdivide);
        let mut rects = Vec::new();
        self.subdivide(area, &volume_tree, &obstacle_tree, &mut rects);
        ctx.stop_timer(TimerCategory::Subdivide);

        let subdivided = rects.len();
        if self.config.simplify {
            ctx.start_timer(TimerCategory::Simplify);
            let stats = simplify(&mut rects);
            ctx.stop_timer(TimerCategory::Simplify);
            ctx.log_debug(format!("Simplifier performed {} merges", stats.merges));
        }

        ctx.start_timer(TimerCategory::Neighbors);
        let graph = VoxelGraph::from_rects(area, rects);
        ctx.stop_timer(TimerCategory::Neighbors);

        let elapsed = ctx.stop_timer(TimerCategory::Total);
        ctx.log_info(format!(
            "Baked {} voxels ({} before simplification) in {:.2}ms",
            graph.len(),
            subdivided,
            elapsed.map_or(0.0, |d| d.as_secs_f64() * 1000.0)
        ));

        Ok(graph)
    }

    /// Collects free rectangles for `area` into `out`
    pub fn subdivide(
        &self,
        area: Rect,
        volumes: &QuadTree<Rect>,
        obstacles: &QuadTree<Rect>,
        out: &mut Vec<Rect>,
    ) {
        if volumes.envelopes(&area) && !obstacles.intersect(&area) {
            out.push(area);
            return;
        }

        if !volumes.intersect(&area) {
            return;
        }

        let half_width = area.width * 0.5;
        let half_height = area.height * 0.5;
        if half_width < self.config.min_voxel_size || half_height < self.config.min_voxel_size {
            return;
        }

        for quadrant in area.quadrants() {
            self.subdivide(quadrant, volumes, obstacles, out);
        }
    }
}
