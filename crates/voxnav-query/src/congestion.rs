//! Congestion signals consulted by the path finder
//!
//! The path finder only reads congestion through [`CongestionMap`]. Hosts that
//! do not track congestion use [`NoCongestion`]; [`CongestionGrid`] is a simple
//! grid-backed implementation with radial stamps and exponential decay.

use glam::Vec2;

/// World units between samples or stamps along a line
pub const CONGESTION_LINE_STRIDE: usize = 25;

/// Radius in world units of one congestion stamp
pub const CONGESTION_STAMP_RADIUS: f32 = 10.0;

/// Source of congestion values
pub trait CongestionMap {
    /// Stamps `value` at regular intervals along a line, replacing what was there
    fn set_congestion_line(&mut self, from: Vec2, to: Vec2, value: f32);

    /// Adds `value` in a radial falloff around `point`
    fn add_congestion_at(&mut self, point: Vec2, value: f32);

    fn congestion_at(&self, point: Vec2) -> f32;

    /// Sum of congestion sampled at regular intervals along a line
    fn sample_along_line(&self, from: Vec2, to: Vec2) -> f32;

    /// Advances time-based effects such as decay
    fn update(&mut self, dt: f32);
}

/// Congestion map that always reads zero
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCongestion;

impl CongestionMap for NoCongestion {
    fn set_congestion_line(&mut self, _from: Vec2, _to: Vec2, _value: f32) {}

    fn add_congestion_at(&mut self, _point: Vec2, _value: f32) {}

    fn congestion_at(&self, _point: Vec2) -> f32 {
        0.0
    }

    fn sample_along_line(&self, _from: Vec2, _to: Vec2) -> f32 {
        0.0
    }

    fn update(&mut self, _dt: f32) {}
}

/// Visits integer points on the line between two integer points
fn plot_line(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        plot(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Grid of congestion values covering `(0, 0, width, height)`
#[derive(Debug, Clone)]
pub struct CongestionGrid {
    cols: usize,
    rows: usize,
    cell_size: f32,
    values: Vec<f32>,
    /// Fraction of congestion retained after one second
    retention: f32,
    max_value: f32,
}

impl CongestionGrid {
    /// Creates a grid over `width` x `height` world units
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cell_size = cell_size.max(f32::EPSILON);
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Self {
            cols,
            rows,
            cell_size,
            values: vec![0.0; cols * rows],
            retention: 0.5,
            max_value: f32::MAX,
        }
    }

    /// Sets the fraction of congestion left after one second (clamped to `0..=1`)
    pub fn with_retention(mut self, retention: f32) -> Self {
        self.retention = retention.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_value(mut self, max_value: f32) -> Self {
        self.max_value = max_value;
        self
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, point: Vec2) -> (i32, i32) {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    fn index(&self, cx: i32, cy: i32) -> Option<usize> {
        if cx < 0 || cy < 0 || cx as usize >= self.cols || cy as usize >= self.rows {
            return None;
        }
        Some(cy as usize * self.cols + cx as usize)
    }

    fn cell_value(&self, cx: i32, cy: i32) -> f32 {
        self.index(cx, cy).map_or(0.0, |idx| self.values[idx])
    }

    fn stamp(&mut self, cx: i32, cy: i32, value: f32, add: bool) {
        let radius = (CONGESTION_STAMP_RADIUS / self.cell_size).ceil() as i32;
        let radius_sq = CONGESTION_STAMP_RADIUS * CONGESTION_STAMP_RADIUS;
        for oy in -radius..=radius {
            for ox in -radius..=radius {
                let offset = Vec2::new(ox as f32, oy as f32) * self.cell_size;
                let dist_sq = offset.length_squared();
                if dist_sq > radius_sq {
                    continue;
                }
                let Some(idx) = self.index(cx + ox, cy + oy) else {
                    continue;
                };
                let falloff = value * (1.0 - dist_sq / (radius_sq + 1e-4));
                let next = if add {
                    self.values[idx] + falloff.max(0.0)
                } else {
                    falloff.max(0.0)
                };
                self.values[idx] = next.min(self.max_value);
            }
        }
    }

    /// Cells under every [`CONGESTION_LINE_STRIDE`]th world point along a line
    fn strided_cells(&self, from: Vec2, to: Vec2) -> Vec<(i32, i32)> {
        let (x0, y0) = (from.x.round() as i32, from.y.round() as i32);
        let (x1, y1) = (to.x.round() as i32, to.y.round() as i32);
        let mut out = Vec::new();
        let mut count = 0;
        plot_line(x0, y0, x1, y1, |x, y| {
            count += 1;
            if count >= CONGESTION_LINE_STRIDE {
                count = 0;
                out.push(self.cell_of(Vec2::new(x as f32, y as f32)));
            }
        });
        out
    }
}

impl CongestionMap for CongestionGrid {
    fn set_congestion_line(&mut self, from: Vec2, to: Vec2, value: f32) {
        for (x, y) in self.strided_cells(from, to) {
            self.stamp(x, y, value, false);
        }
    }

    fn add_congestion_at(&mut self, point: Vec2, value: f32) {
        let (cx, cy) = self.cell_of(point);
        self.stamp(cx, cy, value, true);
    }

    fn congestion_at(&self, point: Vec2) -> f32 {
        let (cx, cy) = self.cell_of(point);
        self.cell_value(cx, cy)
    }

    fn sample_along_line(&self, from: Vec2, to: Vec2) -> f32 {
        self.strided_cells(from, to)
            .into_iter()
            .map(|(x, y)| self.cell_value(x, y))
            .sum()
    }

    fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let factor = self.retention.powf(dt);
        for value in &mut self.values {
            *value *= factor;
        }
    }
}
