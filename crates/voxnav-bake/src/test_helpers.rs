//! Bake fixtures shared by the test modules

use voxnav_common::{Rect, Result};

use crate::{BakeContext, BakeMode, VoxelGraph, Voxelizer, VoxelizerConfig};

/// The 100x100 area most tests bake over
pub const TEST_AREA: Rect = Rect::new(0.0, 0.0, 100.0, 100.0);

/// 20x20 obstacle centered in [`TEST_AREA`]
pub const CENTER_OBSTACLE: Rect = Rect::new(40.0, 40.0, 20.0, 20.0);

/// Bakes `TEST_AREA` in IncludeAll mode around `obstacles`
pub fn bake_include_all(min_voxel_size: f32, obstacles: &[Rect]) -> Result<VoxelGraph> {
    let voxelizer = Voxelizer::new(VoxelizerConfig {
        min_voxel_size,
        ..Default::default()
    });
    voxelizer.voxelize(
        TEST_AREA,
        BakeMode::IncludeAll,
        &[],
        obstacles,
        &mut BakeContext::new(),
    )
}

/// Bakes `TEST_AREA` in Volume mode
pub fn bake_volumes(min_voxel_size: f32, volumes: &[Rect], obstacles: &[Rect]) -> Result<VoxelGraph> {
    let voxelizer = Voxelizer::new(VoxelizerConfig {
        min_voxel_size,
        ..Default::default()
    });
    voxelizer.voxelize(
        TEST_AREA,
        BakeMode::Volume,
        volumes,
        obstacles,
        &mut BakeContext::new(),
    )
}

/// Sum of voxel areas
pub fn covered_area(graph: &VoxelGraph) -> f32 {
    graph.free_voxels().map(|v| v.rect.area()).sum()
}

/// Sorted neighbor rectangles per voxel rectangle, for storage-order independent comparison
pub fn topology(graph: &VoxelGraph) -> Vec<(String, Vec<String>)> {
    let key = |r: &Rect| format!("{:.2},{:.2},{:.2},{:.2}", r.x, r.y, r.width, r.height);
    let mut out: Vec<_> = graph
        .free_voxels()
        .map(|v| {
            let mut neighbors: Vec<_> = v
                .neighbors
                .iter()
                .filter_map(|n| graph.voxel(n.voxel))
                .filter(|n| !n.is_virtual())
                .map(|n| key(&n.rect))
                .collect();
            neighbors.sort();
            (key(&v.rect), neighbors)
        })
        .collect();
    out.sort();
    out
}
