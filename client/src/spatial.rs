use std::collections::HashMap;

use hexworld_shared::{Tile, TileId};

use crate::layout::Layout;
use crate::viewport::{Camera, wrap_world_x};

/// Column/row buckets over one world period for hex picking.
/// Only occupied cells are stored. Rebuilt only when the layout changes.
pub struct HexPicker {
    cells: HashMap<(i64, i64), Vec<usize>>,
    ids: Vec<TileId>,
    centers: Vec<(f64, f64)>,
    cols: i64,
    rows: i64,
    world_width: f64,
    column_spacing: f64,
    row_spacing: f64,
    padding: f64,
    accept_radius: f64,
}

impl HexPicker {
    pub fn build(tiles: &[Tile], layout: &Layout) -> Self {
        let metrics = layout.metrics;
        let mut picker = Self {
            cells: HashMap::new(),
            ids: Vec::new(),
            centers: Vec::new(),
            cols: 0,
            rows: 0,
            world_width: layout.world_width,
            column_spacing: metrics.column_spacing(),
            row_spacing: metrics.row_spacing(),
            padding: metrics.padding(),
            accept_radius: metrics.hex_width / 2.0,
        };
        if layout.is_empty() {
            return picker;
        }

        picker.cols = layout.column_count();
        picker.rows = i64::from(layout.max_row) + 1;
        picker.cells.reserve(layout.len());
        picker.ids.reserve(layout.len());
        picker.centers.reserve(layout.len());

        for tile in tiles {
            let Some(center) = layout.position(tile.id) else {
                continue;
            };
            let idx = picker.ids.len();
            picker.ids.push(tile.id);
            picker.centers.push(center);
            picker
                .cells
                .entry((i64::from(tile.x), i64::from(tile.y)))
                .or_default()
                .push(idx);
        }
        picker
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve a screen point to the logical tile under it.
    pub fn pick(&self, camera: &Camera, sx: f64, sy: f64) -> Option<TileId> {
        if self.is_empty() {
            return None;
        }
        let (wx, wy) = camera.screen_to_world(sx, sy, self.world_width);
        self.find_at(wx, wy)
    }

    /// Nearest tile center to a world point, searching the 3×3 column/row
    /// neighborhood of the estimated cell. Scan order is column offset -1..=1
    /// outer, row offset -1..=1 inner; ties keep the first candidate found.
    pub fn find_at(&self, wx: f64, wy: f64) -> Option<TileId> {
        if self.is_empty() || !wx.is_finite() || !wy.is_finite() {
            return None;
        }
        let nx = wrap_world_x(wx, self.world_width);
        let approx_col = ((nx - self.padding) / self.column_spacing).round();
        let approx_row = ((wy - self.padding) / self.row_spacing).round();
        // More than one row outside the grid cannot reach any tile.
        if approx_row < -1.0 || approx_row > self.rows as f64 {
            return None;
        }
        let (approx_col, approx_row) = (approx_col as i64, approx_row as i64);

        let mut best: Option<(usize, f64)> = None;
        for dc in -1..=1 {
            let col = (approx_col + dc).rem_euclid(self.cols);
            for dr in -1..=1 {
                let row = approx_row + dr;
                if row < 0 || row >= self.rows {
                    continue;
                }
                let Some(cell) = self.cells.get(&(col, row)) else {
                    continue;
                };
                for &idx in cell {
                    let (cx, cy) = self.centers[idx];
                    let dist = self.wrapped_dx(nx, cx).hypot(wy - cy);
                    if best.is_none_or(|(_, d)| dist < d) {
                        best = Some((idx, dist));
                    }
                }
            }
        }

        best.filter(|&(_, dist)| dist < self.accept_radius)
            .map(|(idx, _)| self.ids[idx])
    }

    fn wrapped_dx(&self, a: f64, b: f64) -> f64 {
        let dx = (a - b).abs();
        if self.world_width > 0.0 {
            let dx = dx.rem_euclid(self.world_width);
            dx.min(self.world_width - dx)
        } else {
            dx
        }
    }
}
