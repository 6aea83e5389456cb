//! Voxel arena and neighbor graph
//!
//! Voxels are addressed by [`VoxelId`], their index in the arena. Neighbor
//! lists hold ids rather than references, and every link is stored on both
//! ends with the same portal. Free voxels are also indexed in a [`QuadTree`]
//! for point and line-of-sight queries; jump voxels live only in the arena.

use glam::Vec2;
use voxnav_common::{Bounded, QuadRaycastHit, QuadTree, Ray, Rect, Throughcast, EDGE_TOLERANCE};

use crate::portal::{shared_edge, Portal};

/// Stable index of a voxel in a [`VoxelGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoxelId(pub usize);

impl VoxelId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a voxel stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelKind {
    /// Free-space rectangle produced by baking
    Free,
    /// Zero-size link inserted by a jump point
    Jump,
}

/// One entry of a voxel's neighbor list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub voxel: VoxelId,
    pub portal: Portal,
}

/// Node of the navigation graph
#[derive(Debug, Clone)]
pub struct Voxel {
    pub id: VoxelId,
    pub rect: Rect,
    pub kind: VoxelKind,
    pub neighbors: Vec<Neighbor>,
}

impl Voxel {
    pub fn is_virtual(&self) -> bool {
        self.kind == VoxelKind::Jump
    }

    /// Minimum corner, which is the jump location for virtual voxels
    pub fn position(&self) -> Vec2 {
        self.rect.min()
    }

    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    /// Portal to `other`, if the two are linked
    pub fn portal_to(&self, other: VoxelId) -> Option<Portal> {
        self.neighbors
            .iter()
            .find(|n| n.voxel == other)
            .map(|n| n.portal)
    }
}

/// Spatial index entry for a free voxel
#[derive(Debug, Clone, Copy)]
pub struct VoxelEntry {
    pub id: VoxelId,
    pub rect: Rect,
}

impl Bounded for VoxelEntry {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

/// Arena of voxels plus the spatial index over the free ones
#[derive(Debug, Clone)]
pub struct VoxelGraph {
    voxels: Vec<Voxel>,
    index: QuadTree<VoxelEntry>,
}

impl Default for VoxelGraph {
    fn default() -> Self {
        Self::new(Rect::default())
    }
}

impl VoxelGraph {
    /// Creates an empty graph whose spatial index covers `bounds`
    pub fn new(bounds: Rect) -> Self {
        Self {
            voxels: Vec::new(),
            index: QuadTree::new(bounds),
        }
    }

    /// Builds a graph from free-space rectangles and computes its neighbor links
    pub fn from_rects(bounds: Rect, rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut graph = Self::new(bounds);
        for rect in rects {
            graph.push_free(rect);
        }
        graph.build_neighbors();
        graph
    }

    /// Adds a free voxel without linking it
    pub fn push_free(&mut self, rect: Rect) -> VoxelId {
        let id = VoxelId(self.voxels.len());
        self.voxels.push(Voxel {
            id,
            rect,
            kind: VoxelKind::Free,
            neighbors: Vec::new(),
        });
        self.index.insert(VoxelEntry { id, rect });
        id
    }

    /// Adds a zero-size jump voxel at `point` without linking it.
    ///
    /// Jump voxels are not placed in the spatial index.
    pub fn add_virtual(&mut self, point: Vec2) -> VoxelId {
        let id = VoxelId(self.voxels.len());
        self.voxels.push(Voxel {
            id,
            rect: Rect::new(point.x, point.y, 0.0, 0.0),
            kind: VoxelKind::Jump,
            neighbors: Vec::new(),
        });
        id
    }

    /// Links two voxels on both ends with the same portal.
    ///
    /// Returns false if either id is unknown, the ids are equal, or they are already linked.
    pub fn link(&mut self, a: VoxelId, b: VoxelId, portal: Portal) -> bool {
        if a == b || a.0 >= self.voxels.len() || b.0 >= self.voxels.len() {
            return false;
        }
        if self.voxels[a.0].portal_to(b).is_some() {
            return false;
        }
        self.voxels[a.0].neighbors.push(Neighbor { voxel: b, portal });
        self.voxels[b.0].neighbors.push(Neighbor { voxel: a, portal });
        true
    }

    /// Recomputes every link between free voxels from their geometry.
    ///
    /// Each voxel probes a slightly inflated box, so only edge-adjacent voxels
    /// are considered, and links are made once per unordered pair.
    pub fn build_neighbors(&mut self) {
        for voxel in &mut self.voxels {
            voxel.neighbors.clear();
        }

        let mut links = Vec::new();
        for voxel in self.voxels.iter().filter(|v| !v.is_virtual()) {
            for entry in self.index.query(&voxel.rect.inflate(EDGE_TOLERANCE)) {
                if entry.id <= voxel.id {
                    continue;
                }
                if let Some(portal) = shared_edge(&voxel.rect, &entry.rect) {
                    links.push((voxel.id, entry.id, portal));
                }
            }
        }

        for (a, b, portal) in links {
            self.link(a, b, portal);
        }
    }

    pub fn voxel(&self, id: VoxelId) -> Option<&Voxel> {
        self.voxels.get(id.0)
    }

    /// All voxels in id order, jump voxels included
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voxel> {
        self.voxels.iter()
    }

    /// Free voxels only
    pub fn free_voxels(&self) -> impl Iterator<Item = &Voxel> {
        self.voxels.iter().filter(|v| !v.is_virtual())
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.free_voxels().count()
    }

    /// Bounds of the spatial index
    pub fn bounds(&self) -> Rect {
        self.index.bounds()
    }

    pub fn index(&self) -> &QuadTree<VoxelEntry> {
        &self.index
    }

    /// Free voxels whose rectangle covers `point`
    pub fn voxels_at(&self, point: Vec2) -> Vec<VoxelId> {
        self.index.get_at(point).into_iter().map(|e| e.id).collect()
    }

    /// First free voxel covering `point`
    pub fn voxel_at(&self, point: Vec2) -> Option<VoxelId> {
        self.index.get_at(point).first().map(|e| e.id)
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        !self.index.get_at(point).is_empty()
    }

    /// Line-of-sight walk across free voxels
    pub fn throughcast(&self, start: Vec2, end: Vec2) -> Throughcast {
        self.index.throughcast(start, end)
    }

    /// Closest voxel boundary crossed by `ray` before `max_distance`
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<QuadRaycastHit<'_, VoxelEntry>> {
        self.index.raycast(ray, max_distance)
    }

    /// Checks that every link is stored on both ends with the same portal
    pub fn is_symmetric(&self) -> bool {
        self.voxels.iter().all(|voxel| {
            voxel.neighbors.iter().all(|n| {
                self.voxel(n.voxel)
                    .and_then(|other| other.portal_to(voxel.id))
                    .is_some_and(|p| p == n.portal)
            })
        })
    }
}
