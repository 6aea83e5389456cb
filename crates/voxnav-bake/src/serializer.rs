//! Packed persistence format for voxel graphs
//!
//! A graph is stored as the JSON envelope `[width, height, payload]`. The
//! payload is a flat sequence of records
//! `x, y, width, height, count, (index, p1.x, p1.y, p2.x, p2.y) * count`
//! with every value rounded to two decimals. It is written either as a plain
//! JSON number array or as a compact string where each value becomes one or
//! more code units.
//!
//! Compact values are scaled by 100, zigzag encoded and written as base-2^14
//! digits, least significant first. Bit 14 of a digit marks that more digits
//! follow. Digits are offset into U+0100..U+80FF so no control characters or
//! surrogates are produced.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use voxnav_common::{Error, Rect, Result};

use crate::portal::Portal;
use crate::voxel::{VoxelGraph, VoxelId};

const CODE_OFFSET: u32 = 0x100;
const DIGIT_BITS: u32 = 14;
const DIGIT_MASK: u64 = (1 << DIGIT_BITS) - 1;
const CONTINUATION: u32 = 1 << DIGIT_BITS;
const CODE_MAX: u32 = CODE_OFFSET + (CONTINUATION << 1) - 1;

/// Values per record header (`x, y, width, height, count`)
const HEADER_LEN: usize = 5;
/// Values per neighbor entry (`index, p1.x, p1.y, p2.x, p2.y`)
const NEIGHBOR_LEN: usize = 5;

/// How the packed payload is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// JSON array of numbers
    Plain,
    /// String of code units
    #[default]
    Compact,
}

/// Packed payload as it appears in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Plain(Vec<f64>),
    Compact(String),
}

impl Payload {
    pub fn encode(values: &[f64], encoding: Encoding) -> Self {
        match encoding {
            Encoding::Plain => Payload::Plain(values.iter().map(|&v| round2(v)).collect()),
            Encoding::Compact => Payload::Compact(encode_compact(values)),
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            Payload::Plain(_) => Encoding::Plain,
            Payload::Compact(_) => Encoding::Compact,
        }
    }

    pub fn decode(&self) -> Result<Vec<f64>> {
        match self {
            Payload::Plain(values) => Ok(values.clone()),
            Payload::Compact(text) => decode_compact(text),
        }
    }
}

/// One decoded voxel record
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelRecord {
    pub rect: Rect,
    pub neighbors: Vec<(usize, Portal)>,
}

#[inline]
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Writes values as compact code units
pub fn encode_compact(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 2);
    for &value in values {
        let scaled = (value * 100.0).round() as i64;
        let mut zigzag = ((scaled << 1) ^ (scaled >> 63)) as u64;
        loop {
            let digit = (zigzag & DIGIT_MASK) as u32;
            zigzag >>= DIGIT_BITS;
            let code = if zigzag == 0 {
                CODE_OFFSET + digit
            } else {
                CODE_OFFSET + (digit | CONTINUATION)
            };
            // Every code in CODE_OFFSET..=CODE_MAX is below the surrogate range.
            if let Some(c) = char::from_u32(code) {
                out.push(c);
            }
            if zigzag == 0 {
                break;
            }
        }
    }
    out
}

/// Reads values written by [`encode_compact`]
pub fn decode_compact(text: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    let mut acc: u64 = 0;
    let mut shift: u32 = 0;
    let mut pending = false;

    for (pos, c) in text.chars().enumerate() {
        let code = c as u32;
        if !(CODE_OFFSET..=CODE_MAX).contains(&code) {
            return Err(Error::Serialization(format!(
                "invalid code unit U+{:04X} at position {}",
                code, pos
            )));
        }
        if shift >= 64 {
            return Err(Error::Serialization(format!(
                "value overflows at position {}",
                pos
            )));
        }

        let raw = code - CODE_OFFSET;
        acc |= ((raw as u64) & DIGIT_MASK) << shift;
        shift += DIGIT_BITS;
        pending = raw & CONTINUATION != 0;

        if !pending {
            let scaled = ((acc >> 1) as i64) ^ -((acc & 1) as i64);
            values.push(scaled as f64 / 100.0);
            acc = 0;
            shift = 0;
        }
    }

    if pending {
        return Err(Error::Serialization(
            "compact payload ends inside a value".to_string(),
        ));
    }
    Ok(values)
}

/// Flattens the free voxels of a graph into packed records.
///
/// Jump voxels and links to them are left out, and the remaining voxels are
/// renumbered contiguously.
pub fn pack_graph(graph: &VoxelGraph) -> Vec<f64> {
    let mut remap = vec![None; graph.len()];
    for (packed, voxel) in graph.free_voxels().enumerate() {
        remap[voxel.id.index()] = Some(packed);
    }

    let mut out = Vec::new();
    for voxel in graph.free_voxels() {
        push_rect(&mut out, &voxel.rect);

        let links: Vec<_> = voxel
            .neighbors
            .iter()
            .filter_map(|n| remap.get(n.voxel.index()).copied().flatten().map(|idx| (idx, n.portal)))
            .collect();
        out.push(links.len() as f64);
        for (idx, portal) in links {
            out.push(idx as f64);
            out.extend([portal.a.x, portal.a.y, portal.b.x, portal.b.y].map(|v| round2(v as f64)));
        }
    }
    out
}

/// Flattens plain rectangles (records without neighbors)
pub fn pack_rects(rects: &[Rect]) -> Vec<f64> {
    let mut out = Vec::with_capacity(rects.len() * HEADER_LEN);
    for rect in rects {
        push_rect(&mut out, rect);
        out.push(0.0);
    }
    out
}

fn push_rect(out: &mut Vec<f64>, rect: &Rect) {
    out.extend([rect.x, rect.y, rect.width, rect.height].map(|v| round2(v as f64)));
}

fn read_index(value: f64, what: &str, offset: usize) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(Error::Serialization(format!(
            "{} must be a non-negative integer at offset {}, got {}",
            what, offset, value
        )));
    }
    Ok(value as usize)
}

fn read_finite(values: &[f64], offset: usize) -> Result<[f32; 4]> {
    let chunk = &values[offset..offset + 4];
    if let Some(bad) = chunk.iter().find(|v| !v.is_finite()) {
        return Err(Error::Serialization(format!(
            "non-finite value {} in record at offset {}",
            bad, offset
        )));
    }
    Ok([chunk[0] as f32, chunk[1] as f32, chunk[2] as f32, chunk[3] as f32])
}

/// Parses packed records and validates their structure
pub fn unpack_records(values: &[f64]) -> Result<Vec<VoxelRecord>> {
    let mut records = Vec::new();
    let mut i = 0;

    while i < values.len() {
        if i + HEADER_LEN > values.len() {
            return Err(Error::Serialization(format!(
                "truncated record header at offset {}",
                i
            )));
        }
        let [x, y, width, height] = read_finite(values, i)?;
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::Serialization(format!(
                "voxel at offset {} has non-positive size {}x{}",
                i, width, height
            )));
        }
        let count = read_index(values[i + 4], "neighbor count", i + 4)?;
        i += HEADER_LEN;

        let needed = count
            .checked_mul(NEIGHBOR_LEN)
            .and_then(|n| n.checked_add(i))
            .filter(|&end| end <= values.len());
        if needed.is_none() {
            return Err(Error::Serialization(format!(
                "record declares {} neighbors but data ends at offset {}",
                count,
                values.len()
            )));
        }

        let mut neighbors = Vec::with_capacity(count);
        for _ in 0..count {
            let idx = read_index(values[i], "neighbor index", i)?;
            let [ax, ay, bx, by] = read_finite(values, i + 1)?;
            neighbors.push((idx, Portal::new(Vec2::new(ax, ay), Vec2::new(bx, by))));
            i += NEIGHBOR_LEN;
        }

        records.push(VoxelRecord {
            rect: Rect::new(x, y, width, height),
            neighbors,
        });
    }

    let total = records.len();
    for (own, record) in records.iter().enumerate() {
        for &(idx, _) in &record.neighbors {
            if idx >= total || idx == own {
                return Err(Error::Serialization(format!(
                    "voxel {} references invalid neighbor {} ({} voxels)",
                    own, idx, total
                )));
            }
        }
    }

    Ok(records)
}

/// Parses packed rectangles, ignoring any neighbor entries
pub fn unpack_rects(values: &[f64]) -> Result<Vec<Rect>> {
    Ok(unpack_records(values)?.into_iter().map(|r| r.rect).collect())
}

/// Serializes the free voxels of `graph` into the JSON envelope
pub fn serialize_graph(graph: &VoxelGraph, encoding: Encoding) -> Result<String> {
    let bounds = graph.bounds();
    let payload = Payload::encode(&pack_graph(graph), encoding);
    serde_json::to_string(&(bounds.width, bounds.height, payload))
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Rebuilds a graph from the JSON envelope.
///
/// The spatial index covers `(0, 0, width, height)` grown to include every
/// stored voxel. Nothing is returned unless the whole payload is valid.
pub fn deserialize_graph(data: &str) -> Result<VoxelGraph> {
    let (width, height, payload): (f32, f32, Payload) =
        serde_json::from_str(data).map_err(|e| Error::Serialization(e.to_string()))?;
    if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
        return Err(Error::Serialization(format!(
            "invalid envelope dimensions {}x{}",
            width, height
        )));
    }

    let records = unpack_records(&payload.decode()?)?;
    Ok(graph_from_records(Rect::new(0.0, 0.0, width, height), &records))
}

/// Builds a graph from validated records
pub fn graph_from_records(bounds: Rect, records: &[VoxelRecord]) -> VoxelGraph {
    let bounds = records
        .iter()
        .fold(bounds, |acc, record| acc.union(&record.rect));

    let mut graph = VoxelGraph::new(bounds);
    for record in records {
        graph.push_free(record.rect);
    }
    for (own, record) in records.iter().enumerate() {
        for &(idx, portal) in &record.neighbors {
            graph.link(VoxelId(own), VoxelId(idx), portal);
        }
    }
    graph
}
