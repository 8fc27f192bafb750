use std::collections::HashMap;

use hexworld_shared::TileId;

use super::{
    Blob, DrawSurface, FrameInput, Rgba, RiverStroke, ViewMode, draw_highlights,
    label_color, label_size, period_offsets, river_strokes, tile_fill, vegetation_blobs,
};

/// One persistent terrain hexagon in one world copy.
#[derive(Debug, Clone, PartialEq)]
pub struct HexSprite {
    pub id: TileId,
    pub center: (f64, f64),
    pub fill: Rgba,
    pub label: String,
    /// Index into the map's tile list the sprite was built from.
    tile_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Positions were rebuilt from a new layout.
    Rebuilt,
    /// Same tile set, but map content changed: overlays rebuilt and fills retinted.
    Refreshed,
    /// Only the fill colors changed.
    Retinted,
    Unchanged,
}

impl SyncOutcome {
    pub fn fills_changed(self) -> bool {
        self != SyncOutcome::Unchanged
    }
}

/// Drawable primitives for every tile, prebuilt for each of the three
/// world copies. Keyed by the layout signature; appearance is keyed by
/// view mode and species.
#[derive(Debug, Default)]
pub struct SpritePool {
    signature: Option<u64>,
    generation: u64,
    tint: Option<(ViewMode, Option<String>)>,
    slots: HashMap<TileId, usize>,
    terrain: [Vec<HexSprite>; 3],
    rivers: [Vec<RiverStroke>; 3],
    vegetation: [Vec<Blob>; 3],
}

impl SpritePool {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Sprite of `id` in the center world copy.
    pub fn sprite(&self, id: TileId) -> Option<&HexSprite> {
        self.slots.get(&id).and_then(|&slot| self.terrain[1].get(slot))
    }

    /// Every terrain sprite in draw order: copy by copy, tiles in map order.
    pub fn terrain(&self) -> impl Iterator<Item = &HexSprite> {
        self.terrain.iter().flatten()
    }

    pub fn sync(&mut self, frame: &FrameInput<'_>) -> SyncOutcome {
        let layout = frame.layout;
        let tint = (frame.view_mode, frame.species.map(str::to_owned));

        let outcome = if self.signature != Some(layout.signature) {
            self.rebuild(frame);
            SyncOutcome::Rebuilt
        } else if self.generation != frame.generation {
            self.rebuild_overlays(frame);
            SyncOutcome::Refreshed
        } else if self.tint.as_ref() != Some(&tint) {
            SyncOutcome::Retinted
        } else {
            return SyncOutcome::Unchanged;
        };

        self.retint(frame);
        self.signature = Some(layout.signature);
        self.generation = frame.generation;
        self.tint = Some(tint);
        tracing::debug!(?outcome, sprites = self.len(), "sprite pool synced");
        outcome
    }

    fn rebuild(&mut self, frame: &FrameInput<'_>) {
        let layout = frame.layout;
        self.slots.clear();
        for copy in &mut self.terrain {
            copy.clear();
        }

        let offsets = period_offsets(layout.world_width);
        for (tile_index, tile) in frame.map.tiles.iter().enumerate() {
            let Some((cx, cy)) = layout.position(tile.id) else {
                continue;
            };
            let slot = self.terrain[0].len();
            if self.slots.insert(tile.id, slot).is_some() {
                tracing::warn!(id = tile.id, "duplicate tile id, keeping the last sprite");
            }
            let label = tile.terrain_code();
            for (copy, dx) in self.terrain.iter_mut().zip(offsets) {
                copy.push(HexSprite {
                    id: tile.id,
                    center: (cx + dx, cy),
                    fill: Rgba::opaque((0, 0, 0)),
                    label: label.clone(),
                    tile_index,
                });
            }
        }
        self.rebuild_overlays(frame);
    }

    fn rebuild_overlays(&mut self, frame: &FrameInput<'_>) {
        let layout = frame.layout;
        let metrics = &layout.metrics;
        let offsets = period_offsets(layout.world_width);
        let strokes = river_strokes(frame.map, layout);

        for (k, dx) in offsets.into_iter().enumerate() {
            self.rivers[k] = strokes.iter().map(|s| s.shifted(dx)).collect();

            let blobs = &mut self.vegetation[k];
            blobs.clear();
            let Some(vegetation) = frame.map.vegetation.as_ref() else {
                continue;
            };
            for sprite in &self.terrain[k] {
                if let Some(cover) = vegetation.get(&sprite.id) {
                    blobs.extend(vegetation_blobs(sprite.id, sprite.center, cover, metrics));
                }
            }
        }
    }

    fn retint(&mut self, frame: &FrameInput<'_>) {
        let tiles = &frame.map.tiles;
        for sprite in self.terrain.iter_mut().flatten() {
            if let Some(tile) = tiles.get(sprite.tile_index) {
                sprite.fill = tile_fill(tile, frame.view_mode, frame.species);
            }
        }
    }
}

/// Keeps a [`SpritePool`] and redraws it under the current camera transform.
#[derive(Debug, Default)]
pub struct RetainedRenderer {
    pool: SpritePool,
}

impl RetainedRenderer {
    pub fn pool(&self) -> &SpritePool {
        &self.pool
    }

    pub fn sync(&mut self, frame: &FrameInput<'_>) -> SyncOutcome {
        self.pool.sync(frame)
    }

    pub fn render(&mut self, surface: &mut dyn DrawSurface, frame: &FrameInput<'_>) -> bool {
        let (vw, vh) = frame.viewport;
        surface.begin_frame(vw, vh, frame.background());
        let layout = frame.layout;
        if layout.is_empty() {
            return false;
        }
        self.pool.sync(frame);
        let camera = frame.camera;
        surface.set_camera(camera.zoom, camera.effective_x(layout.world_width), camera.y);

        let metrics = &layout.metrics;
        let pool = &self.pool;

        if !frame.skip_terrain {
            for sprite in pool.terrain() {
                surface.fill_hex(sprite.center, metrics, sprite.fill);
            }
        }
        for s in pool.rivers.iter().flatten() {
            surface.stroke_curve(s.from, s.ctrl, s.to, s.color, s.width);
        }
        for blob in pool.vegetation.iter().flatten() {
            surface.fill_circle(blob.center, blob.radius, blob.color);
        }
        if frame.show_labels() {
            let size = label_size(metrics);
            for sprite in pool.terrain().filter(|s| !s.label.is_empty()) {
                surface.fill_text(&sprite.label, sprite.center, size, label_color());
            }
        }

        draw_highlights(surface, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::grid;
    use crate::layout::{HexMetrics, Layout};
    use crate::renderer::ImmediateRenderer;
    use crate::renderer::recording::RecordingSurface;
    use crate::viewport::Camera;
    use hexworld_shared::{
        MapOverview, RiverSegment, VegetationCover, VegetationKind, suitability_color,
    };

    fn metrics() -> HexMetrics {
        HexMetrics::new(40.0, 34.0)
    }

    fn rich_map(cols: i32, rows: i32) -> MapOverview {
        let mut tiles = grid(cols, rows);
        for (i, tile) in tiles.iter_mut().enumerate() {
            tile.terrain_type = ["grassland", "forest", "desert", "tundra"][i % 4].to_string();
            tile.color = ["#6a9a4a", "#2e6e34", "#d8c27a", "#a0a88c"][i % 4].to_string();
            tile.suitability.insert("deer".to_string(), (i % 10) as f64 / 10.0);
        }
        let mut rivers = HashMap::new();
        let mut vegetation = HashMap::new();
        for tile in &tiles {
            if tile.id % 3 == 0 && tile.y + 1 < rows {
                let target = tile.id + cols as TileId;
                rivers.insert(tile.id, RiverSegment { target_id: target, flux: tile.id as f64 });
            }
            if tile.id % 2 == 0 {
                vegetation.insert(
                    tile.id,
                    VegetationCover {
                        kind: VegetationKind::Forest,
                        density: (tile.id % 7) as f64 / 7.0,
                    },
                );
            }
        }
        MapOverview {
            tiles,
            rivers: Some(rivers),
            vegetation: Some(vegetation),
            ..MapOverview::default()
        }
    }

    fn frame<'a>(
        camera: &'a Camera,
        layout: &'a Layout,
        map: &'a MapOverview,
        view_mode: ViewMode,
        species: Option<&'a str>,
        generation: u64,
    ) -> FrameInput<'a> {
        FrameInput {
            camera,
            viewport: (640.0, 400.0),
            layout,
            map,
            view_mode,
            species,
            hovered: Some(14),
            selected: Some(27),
            generation,
            now: 300.0,
            label_zoom_threshold: 1.2,
            skip_terrain: false,
        }
    }

    #[test]
    fn strategies_draw_identical_on_screen_output() {
        let map = rich_map(24, 12);
        let layout = Layout::compute(&map.tiles, metrics());
        let cameras = [
            Camera { x: 0.0, y: 0.0, zoom: 1.0 },
            Camera { x: -500.0, y: -60.0, zoom: 1.5 },
            Camera { x: 2.0 * layout.world_width * 0.7 + 35.0, y: 10.0, zoom: 0.7 },
            Camera { x: -13.0 * layout.world_width, y: -120.0, zoom: 2.2 },
        ];
        let mut retained = RetainedRenderer::default();
        for camera in &cameras {
            for (mode, species) in [(ViewMode::TerrainType, None), (ViewMode::Suitability, Some("deer"))] {
                let input = frame(camera, &layout, &map, mode, species, 1);
                let mut a = RecordingSurface::default();
                let mut b = RecordingSurface::default();
                ImmediateRenderer.render(&mut a, &input);
                retained.render(&mut b, &input);
                let margin = metrics().hex_width * camera.zoom;
                assert_eq!(
                    a.visible(input.viewport, margin),
                    b.visible(input.viewport, margin),
                    "camera {camera:?} mode {mode:?}"
                );
                assert!(!a.visible(input.viewport, margin).is_empty());
            }
        }
    }

    #[test]
    fn pool_holds_three_copies_of_every_tile() {
        let map = rich_map(6, 4);
        let layout = Layout::compute(&map.tiles, metrics());
        let camera = Camera::default();
        let mut pool = SpritePool::default();
        pool.sync(&frame(&camera, &layout, &map, ViewMode::TerrainType, None, 1));
        assert_eq!(pool.len(), 24);
        assert_eq!(pool.terrain().count(), 72);
        let centers: Vec<f64> = pool.terrain().filter(|s| s.id == 1).map(|s| s.center.0).collect();
        assert_eq!(centers, vec![40.0 - layout.world_width, 40.0, 40.0 + layout.world_width]);
    }

    #[test]
    fn new_map_leaves_no_stale_sprites() {
        let big = rich_map(8, 8);
        let small = rich_map(3, 2);
        let camera = Camera::default();
        let mut pool = SpritePool::default();

        let layout = Layout::compute(&big.tiles, metrics());
        pool.sync(&frame(&camera, &layout, &big, ViewMode::TerrainType, None, 1));
        assert!(pool.contains(60));

        let layout = Layout::compute(&small.tiles, metrics());
        let outcome = pool.sync(&frame(&camera, &layout, &small, ViewMode::TerrainType, None, 2));
        assert_eq!(outcome, SyncOutcome::Rebuilt);
        assert_eq!(pool.len(), 6);
        assert!(!pool.contains(60));
        assert_eq!(pool.terrain().count(), 18);
        assert!(pool.terrain().all(|s| s.id <= 6));
    }

    #[test]
    fn view_mode_change_retints_without_rebuilding() {
        let map = rich_map(5, 5);
        let layout = Layout::compute(&map.tiles, metrics());
        let camera = Camera::default();
        let mut pool = SpritePool::default();

        let terrain = frame(&camera, &layout, &map, ViewMode::TerrainType, None, 1);
        assert_eq!(pool.sync(&terrain), SyncOutcome::Rebuilt);
        assert_eq!(pool.sync(&terrain), SyncOutcome::Unchanged);
        let before: Vec<(f64, f64)> = pool.terrain().map(|s| s.center).collect();

        let suit = frame(&camera, &layout, &map, ViewMode::Suitability, Some("deer"), 1);
        assert_eq!(pool.sync(&suit), SyncOutcome::Retinted);
        let after: Vec<(f64, f64)> = pool.terrain().map(|s| s.center).collect();
        assert_eq!(before, after);

        let tile = &map.tiles[7];
        let expected = Rgba::opaque(suitability_color(tile.suitability["deer"]));
        assert_eq!(pool.sprite(tile.id).map(|s| s.fill), Some(expected));

        let other = frame(&camera, &layout, &map, ViewMode::Suitability, Some("wolf"), 1);
        assert_eq!(pool.sync(&other), SyncOutcome::Retinted);
    }

    #[test]
    fn same_tiles_with_new_content_refresh_overlays() {
        let map = rich_map(5, 5);
        let layout = Layout::compute(&map.tiles, metrics());
        let camera = Camera::default();
        let mut pool = SpritePool::default();
        pool.sync(&frame(&camera, &layout, &map, ViewMode::TerrainType, None, 1));

        let mut next = map.clone();
        next.tiles[0].color = "#ff0000".to_string();
        next.vegetation = None;
        let outcome = pool.sync(&frame(&camera, &layout, &next, ViewMode::TerrainType, None, 2));
        assert_eq!(outcome, SyncOutcome::Refreshed);
        assert_eq!(pool.sprite(1).map(|s| s.fill), Some(Rgba::opaque((255, 0, 0))));
        assert!(pool.vegetation.iter().all(Vec::is_empty));
    }
}
