use std::collections::HashMap;
use std::rc::Rc;

use hexworld_shared::{Tile, TileId};

/// Hexagon footprint in world pixels. Columns overlap by a quarter width and
/// odd columns sit half a hex lower (flat-top offset coordinates).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexMetrics {
    pub hex_width: f64,
    pub hex_height: f64,
}

impl HexMetrics {
    pub fn new(hex_width: f64, hex_height: f64) -> Self {
        Self {
            hex_width,
            hex_height,
        }
    }

    pub fn column_spacing(&self) -> f64 {
        self.hex_width * 0.75
    }

    pub fn row_spacing(&self) -> f64 {
        self.hex_height
    }

    /// Margin on both axes so no tile sits flush against the container edge.
    pub fn padding(&self) -> f64 {
        self.hex_width
    }

    /// Center of column/row inside one world period.
    pub fn center(&self, col: i32, row: i32) -> (f64, f64) {
        let odd_shift = if col.rem_euclid(2) == 1 {
            self.hex_height / 2.0
        } else {
            0.0
        };
        (
            self.padding() + col as f64 * self.column_spacing(),
            self.padding() + row as f64 * self.row_spacing() + odd_shift,
        )
    }

    /// The six corners of a hexagon centered at the origin, clockwise from east.
    pub fn corners(&self) -> [(f64, f64); 6] {
        let hw = self.hex_width / 2.0;
        let qw = self.hex_width / 4.0;
        let hh = self.hex_height / 2.0;
        [
            (hw, 0.0),
            (qw, hh),
            (-qw, hh),
            (-hw, 0.0),
            (-qw, -hh),
            (qw, -hh),
        ]
    }
}

/// Content signature over tile ids and coordinates. Two tile lists with the
/// same signature produce the same layout.
pub fn tile_signature(tiles: &[Tile]) -> u64 {
    tiles.iter().fold(tiles.len() as u64, |acc, tile| {
        let coords = ((tile.x as u32 as u64) << 32) | tile.y as u32 as u64;
        acc.wrapping_mul(1_099_511_628_211)
            .wrapping_add(tile.id as u64)
            .wrapping_mul(1_099_511_628_211)
            .wrapping_add(coords)
    })
}

/// Pixel positions for one logical period of the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub metrics: HexMetrics,
    positions: HashMap<TileId, (f64, f64)>,
    pub world_width: f64,
    pub world_height: f64,
    pub max_col: i32,
    pub max_row: i32,
    pub signature: u64,
}

impl Layout {
    pub fn empty(metrics: HexMetrics) -> Self {
        Self {
            metrics,
            positions: HashMap::new(),
            world_width: 0.0,
            world_height: 0.0,
            max_col: 0,
            max_row: 0,
            signature: tile_signature(&[]),
        }
    }

    pub fn compute(tiles: &[Tile], metrics: HexMetrics) -> Self {
        let mut layout = Self::empty(metrics);
        layout.signature = tile_signature(tiles);

        let mut placed = 0usize;
        for tile in tiles {
            if tile.x < 0 || tile.y < 0 {
                tracing::warn!(id = tile.id, x = tile.x, y = tile.y, "skipping tile with negative coordinates");
                continue;
            }
            layout.max_col = layout.max_col.max(tile.x);
            layout.max_row = layout.max_row.max(tile.y);
            layout.positions.insert(tile.id, metrics.center(tile.x, tile.y));
            placed += 1;
        }

        if placed == 0 {
            return layout;
        }

        layout.world_width = (f64::from(layout.max_col) + 1.0) * metrics.column_spacing();
        layout.world_height = 2.0 * metrics.padding()
            + layout.max_row as f64 * metrics.row_spacing()
            + metrics.row_spacing() / 2.0;
        layout
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, id: TileId) -> Option<(f64, f64)> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Column count of one period; columns wrap modulo this.
    pub fn column_count(&self) -> i64 {
        i64::from(self.max_col) + 1
    }
}

/// Keeps the last computed layout and only recomputes when the tile set's
/// signature changes. Camera changes never touch it.
pub struct LayoutCache {
    metrics: HexMetrics,
    current: Rc<Layout>,
}

impl LayoutCache {
    pub fn new(metrics: HexMetrics) -> Self {
        Self {
            metrics,
            current: Rc::new(Layout::empty(metrics)),
        }
    }

    pub fn layout(&self) -> Rc<Layout> {
        self.current.clone()
    }

    /// Returns true when a new layout was computed.
    pub fn refresh(&mut self, tiles: &[Tile]) -> bool {
        if tile_signature(tiles) == self.current.signature {
            return false;
        }
        let layout = Layout::compute(tiles, self.metrics);
        tracing::debug!(
            tiles = layout.len(),
            world_width = layout.world_width,
            world_height = layout.world_height,
            "layout rebuilt"
        );
        self.current = Rc::new(layout);
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn tile(id: TileId, x: i32, y: i32) -> Tile {
        Tile {
            id,
            x,
            y,
            terrain_type: "grassland".to_string(),
            climate_zone: "temperate".to_string(),
            elevation: 0.2,
            color: "#6a9a4a".to_string(),
            suitability: Default::default(),
        }
    }

    /// `cols × rows` grid with ids assigned row-major starting at 1.
    pub(crate) fn grid(cols: i32, rows: i32) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for y in 0..rows {
            for x in 0..cols {
                tiles.push(tile((y * cols + x + 1) as TileId, x, y));
            }
        }
        tiles
    }

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-9, "expected {expected}, got {actual} (diff: {diff})");
    }

    #[test]
    fn identical_coordinates_give_identical_positions() {
        let metrics = HexMetrics::new(40.0, 34.0);
        let layout = Layout::compute(&[tile(1, 3, 4), tile(2, 3, 4)], metrics);
        assert_eq!(layout.position(1), layout.position(2));
    }

    #[test]
    fn odd_columns_shift_by_half_a_hex() {
        let metrics = HexMetrics::new(40.0, 34.0);
        let layout = Layout::compute(&grid(6, 3), metrics);
        for row in 0..3 {
            for col in 0..5 {
                let a = layout.position((row * 6 + col + 1) as TileId).expect("a");
                let b = layout.position((row * 6 + col + 2) as TileId).expect("b");
                assert_close((b.1 - a.1).abs(), 17.0);
                assert_close(b.0 - a.0, 30.0);
            }
        }
    }

    #[test]
    fn world_extent_includes_padding() {
        let metrics = HexMetrics::new(40.0, 34.0);
        let layout = Layout::compute(&grid(10, 10), metrics);
        assert_eq!((layout.max_col, layout.max_row), (9, 9));
        assert_close(layout.world_width, 10.0 * 30.0);
        assert_close(layout.world_height, 80.0 + 9.0 * 34.0 + 17.0);
        assert_eq!(layout.position(1), Some((40.0, 40.0)));
    }

    #[test]
    fn empty_tiles_give_zero_world() {
        let layout = Layout::compute(&[], HexMetrics::new(40.0, 34.0));
        assert!(layout.is_empty());
        assert_eq!(layout.world_width, 0.0);
        assert_eq!(layout.world_height, 0.0);
        assert_eq!(layout.position(1), None);
    }

    #[test]
    fn negative_coordinates_are_skipped() {
        let layout = Layout::compute(&[tile(1, -1, 0), tile(2, 0, 0)], HexMetrics::new(40.0, 34.0));
        assert!(!layout.contains(1));
        assert!(layout.contains(2));
    }

    #[test]
    fn cache_recomputes_only_on_tile_change() {
        let mut cache = LayoutCache::new(HexMetrics::new(40.0, 34.0));
        let tiles = grid(4, 4);
        assert!(cache.refresh(&tiles));
        let first = cache.layout();
        assert!(!cache.refresh(&tiles.clone()));
        assert!(Rc::ptr_eq(&first, &cache.layout()));

        let bigger = grid(6, 5);
        assert!(cache.refresh(&bigger));
        let second = cache.layout();
        assert_close(second.world_width, 6.0 * 30.0);
        assert_eq!(second.len(), 30);
    }
}
