//! Tile rendering: scene primitives shared by both strategies and the
//! [`DrawSurface`] seam they draw through.
//!
//! Layer order, back to front: terrain fill, rivers, vegetation, terrain
//! labels, hover outline, selection outline. Every layer is replicated over
//! [`PERIODS`] so the horizontally wrapping world renders seamlessly.

pub mod canvas2d;
pub mod immediate;
#[cfg(test)]
pub mod recording;
pub mod retained;

use hexworld_shared::colors::NEUTRAL_DIM;
use hexworld_shared::{
    MapOverview, Tile, TileId, VegetationCover, parse_hex_color, suitability_color,
    terrain_fallback_color,
};
use serde::{Deserialize, Serialize};

use crate::animation::{HOVER_PULSE, SELECTION_PULSE};
use crate::colors::rgba_css;
use crate::config::RenderStrategy;
use crate::layout::{HexMetrics, Layout};
use crate::viewport::Camera;

pub use immediate::ImmediateRenderer;
pub use retained::{RetainedRenderer, SpritePool, SyncOutcome};

/// World copies drawn for wrap-around, in units of the world width.
pub const PERIODS: [f64; 3] = [-1.0, 0.0, 1.0];

pub const BACKGROUND: (u8, u8, u8) = (12, 14, 23);
const RIVER_RGB: (u8, u8, u8) = (64, 140, 220);
const LABEL_RGB: (u8, u8, u8) = (240, 238, 228);
const HOVER_RGB: (u8, u8, u8) = (255, 255, 255);
const SELECTION_RGB: (u8, u8, u8) = (255, 217, 102);
const MAX_BLOBS_PER_TILE: u32 = 6;
/// Outline width in screen pixels.
const OUTLINE_PX: f64 = 2.5;

pub fn period_offsets(world_width: f64) -> [f64; 3] {
    PERIODS.map(|k| k * world_width)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    TerrainType,
    Suitability,
}

impl ViewMode {
    pub fn label(self) -> &'static str {
        match self {
            ViewMode::TerrainType => "Terrain",
            ViewMode::Suitability => "Suitability",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub fn new((r, g, b): (u8, u8, u8), a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn opaque(rgb: (u8, u8, u8)) -> Self {
        Self::new(rgb, 1.0)
    }

    pub fn css(&self) -> String {
        rgba_css(self.r, self.g, self.b, self.a)
    }

    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32,
        ]
    }
}

/// Drawing backend. Geometry is given in world pixels and mapped to the
/// screen by the transform set through [`DrawSurface::set_camera`].
pub trait DrawSurface {
    /// Start a frame. `background: None` clears to transparent.
    fn begin_frame(&mut self, width: f64, height: f64, background: Option<(u8, u8, u8)>);
    /// screen = world * zoom + (tx, ty)
    fn set_camera(&mut self, zoom: f64, tx: f64, ty: f64);
    fn fill_hex(&mut self, center: (f64, f64), metrics: &HexMetrics, color: Rgba);
    fn stroke_hex(&mut self, center: (f64, f64), metrics: &HexMetrics, color: Rgba, width: f64);
    fn stroke_curve(
        &mut self,
        from: (f64, f64),
        ctrl: (f64, f64),
        to: (f64, f64),
        color: Rgba,
        width: f64,
    );
    fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: Rgba);
    fn fill_text(&mut self, text: &str, at: (f64, f64), size: f64, color: Rgba);
}

/// Everything a strategy needs to draw one frame.
pub struct FrameInput<'a> {
    pub camera: &'a Camera,
    pub viewport: (f64, f64),
    pub layout: &'a Layout,
    pub map: &'a MapOverview,
    pub view_mode: ViewMode,
    pub species: Option<&'a str>,
    pub hovered: Option<TileId>,
    pub selected: Option<TileId>,
    /// Bumped whenever the map is replaced, even with identical tiles.
    pub generation: u64,
    pub now: f64,
    pub label_zoom_threshold: f64,
    /// Terrain fills were already drawn elsewhere (GPU layer).
    pub skip_terrain: bool,
}

impl FrameInput<'_> {
    pub fn show_labels(&self) -> bool {
        self.view_mode == ViewMode::TerrainType && self.camera.zoom >= self.label_zoom_threshold
    }

    pub(crate) fn background(&self) -> Option<(u8, u8, u8)> {
        if self.skip_terrain {
            None
        } else {
            Some(BACKGROUND)
        }
    }
}

/// The configured drawing strategy.
pub enum Renderer {
    Immediate(ImmediateRenderer),
    Retained(RetainedRenderer),
}

impl Renderer {
    pub fn new(strategy: RenderStrategy) -> Self {
        match strategy {
            RenderStrategy::Immediate => Renderer::Immediate(ImmediateRenderer),
            RenderStrategy::Retained => Renderer::Retained(RetainedRenderer::default()),
        }
    }

    /// Bring retained state up to date with the frame's data.
    pub fn prepare(&mut self, frame: &FrameInput<'_>) -> SyncOutcome {
        match self {
            Renderer::Immediate(_) => SyncOutcome::Unchanged,
            Renderer::Retained(r) => r.sync(frame),
        }
    }

    /// Draw one frame. Returns true while something on screen is animating.
    pub fn render(&mut self, surface: &mut dyn DrawSurface, frame: &FrameInput<'_>) -> bool {
        match self {
            Renderer::Immediate(r) => r.render(surface, frame),
            Renderer::Retained(r) => r.render(surface, frame),
        }
    }

    pub fn sprite_pool(&self) -> Option<&SpritePool> {
        match self {
            Renderer::Immediate(_) => None,
            Renderer::Retained(r) => Some(r.pool()),
        }
    }
}

/// Fill color of a tile for the given view mode.
pub fn tile_fill(tile: &Tile, mode: ViewMode, species: Option<&str>) -> Rgba {
    match mode {
        ViewMode::TerrainType => Rgba::opaque(
            parse_hex_color(&tile.color)
                .unwrap_or_else(|| terrain_fallback_color(&tile.terrain_type)),
        ),
        ViewMode::Suitability => {
            let score = species
                .and_then(|id| tile.suitability.get(id))
                .copied()
                .filter(|s| s.is_finite());
            match score {
                Some(s) => Rgba::opaque(suitability_color(s)),
                None => Rgba::opaque(NEUTRAL_DIM),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverStroke {
    pub source: TileId,
    pub from: (f64, f64),
    pub ctrl: (f64, f64),
    pub to: (f64, f64),
    pub width: f64,
    pub color: Rgba,
}

impl RiverStroke {
    pub fn shifted(&self, dx: f64) -> Self {
        Self {
            from: (self.from.0 + dx, self.from.1),
            ctrl: (self.ctrl.0 + dx, self.ctrl.1),
            to: (self.to.0 + dx, self.to.1),
            ..*self
        }
    }
}

/// Curved river strokes in source-id order. Pairs whose endpoints sit on
/// opposite sides of the wrap seam, or are missing from the layout, are skipped.
pub fn river_strokes(map: &MapOverview, layout: &Layout) -> Vec<RiverStroke> {
    let Some(rivers) = map.rivers.as_ref() else {
        return Vec::new();
    };
    let max_flux = map.max_flux();
    let mut sources: Vec<TileId> = rivers.keys().copied().collect();
    sources.sort_unstable();

    sources
        .into_iter()
        .filter_map(|source| {
            let segment = rivers.get(&source)?;
            let from = layout.position(source)?;
            let to = layout.position(segment.target_id)?;
            let dx = to.0 - from.0;
            if dx.abs() > layout.world_width / 2.0 {
                return None;
            }
            let dy = to.1 - from.1;
            let len = dx.hypot(dy);
            let side = if crc32fast::hash(&source.to_le_bytes()) & 1 == 0 {
                1.0
            } else {
                -1.0
            };
            let (px, py) = if len > 0.0 {
                (-dy / len, dx / len)
            } else {
                (0.0, 0.0)
            };
            let bend = 0.2 * len * side;
            let ctrl = (
                (from.0 + to.0) / 2.0 + px * bend,
                (from.1 + to.1) / 2.0 + py * bend,
            );
            let t = if max_flux > 0.0 && segment.flux.is_finite() {
                (segment.flux / max_flux).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Some(RiverStroke {
                source,
                from,
                ctrl,
                to,
                width: 1.5 + 3.5 * t,
                color: Rgba::new(RIVER_RGB, 0.35 + 0.55 * t),
            })
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blob {
    pub center: (f64, f64),
    pub radius: f64,
    pub color: Rgba,
}

/// Placement of blob `index` on tile `tile_id`: (angle in radians,
/// distance as a fraction of hex width, radius scale). Pure in its inputs.
pub fn blob_placement(tile_id: TileId, index: u32) -> (f64, f64, f64) {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&tile_id.to_le_bytes());
    bytes[4..].copy_from_slice(&index.to_le_bytes());
    let hash = crc32fast::hash(&bytes);
    let angle = (hash & 0xffff) as f64 / 65536.0 * std::f64::consts::TAU;
    let distance = ((hash >> 16) & 0xff) as f64 / 255.0 * 0.3;
    let scale = 0.6 + ((hash >> 24) & 0xff) as f64 / 255.0 * 0.6;
    (angle, distance, scale)
}

pub fn vegetation_blobs(
    tile_id: TileId,
    center: (f64, f64),
    cover: &VegetationCover,
    metrics: &HexMetrics,
) -> Vec<Blob> {
    let density = if cover.density.is_finite() {
        cover.density.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let count = ((density * cover.kind.max_blobs() as f64).ceil() as u32).min(MAX_BLOBS_PER_TILE);
    let color = Rgba::new(cover.kind.color(), 0.45 + 0.45 * density);
    (0..count)
        .map(|index| {
            let (angle, distance, scale) = blob_placement(tile_id, index);
            let reach = distance * metrics.hex_width;
            Blob {
                center: (
                    center.0 + angle.cos() * reach,
                    center.1 + angle.sin() * reach,
                ),
                radius: metrics.hex_width * 0.09 * scale,
                color,
            }
        })
        .collect()
}

pub fn label_size(metrics: &HexMetrics) -> f64 {
    metrics.hex_height * 0.35
}

pub fn label_color() -> Rgba {
    Rgba::new(LABEL_RGB, 0.75)
}

/// Hover then selection outlines, replicated across periods.
/// Returns true while an outline is pulsing (needs another frame).
pub fn draw_highlights(surface: &mut dyn DrawSurface, frame: &FrameInput<'_>) -> bool {
    let layout = frame.layout;
    let metrics = &layout.metrics;
    let width = OUTLINE_PX / frame.camera.zoom.max(f64::EPSILON);
    let offsets = period_offsets(layout.world_width);
    let mut animating = false;

    let hovered = frame.hovered.filter(|id| Some(*id) != frame.selected);
    let passes = [
        (hovered, HOVER_RGB, HOVER_PULSE.alpha(frame.now)),
        (frame.selected, SELECTION_RGB, SELECTION_PULSE.alpha(frame.now)),
    ];
    for (id, rgb, alpha) in passes {
        let Some(center) = id.and_then(|id| layout.position(id)) else {
            continue;
        };
        animating = true;
        for dx in offsets {
            surface.stroke_hex((center.0 + dx, center.1), metrics, Rgba::new(rgb, alpha), width);
        }
    }
    animating
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::{grid, tile};
    use hexworld_shared::{RiverSegment, VegetationKind};
    use std::collections::HashMap;

    fn metrics() -> HexMetrics {
        HexMetrics::new(40.0, 34.0)
    }

    #[test]
    fn terrain_fill_uses_tile_color_with_fallback() {
        let mut t = tile(1, 0, 0);
        t.color = "#102030".to_string();
        assert_eq!(tile_fill(&t, ViewMode::TerrainType, None), Rgba::opaque((16, 32, 48)));
        t.color = "not a color".to_string();
        assert_eq!(
            tile_fill(&t, ViewMode::TerrainType, None),
            Rgba::opaque(terrain_fallback_color("grassland"))
        );
    }

    #[test]
    fn suitability_fill_falls_back_to_neutral() {
        let mut t = tile(1, 0, 0);
        t.suitability.insert("deer".to_string(), 1.0);
        assert_eq!(
            tile_fill(&t, ViewMode::Suitability, Some("deer")),
            Rgba::opaque(suitability_color(1.0))
        );
        assert_eq!(tile_fill(&t, ViewMode::Suitability, Some("wolf")), Rgba::opaque(NEUTRAL_DIM));
        assert_eq!(tile_fill(&t, ViewMode::Suitability, None), Rgba::opaque(NEUTRAL_DIM));
    }

    #[test]
    fn vegetation_blobs_are_stable_and_scaled_by_density() {
        let cover = VegetationCover {
            kind: VegetationKind::Forest,
            density: 0.5,
        };
        let a = vegetation_blobs(7, (100.0, 100.0), &cover, &metrics());
        let b = vegetation_blobs(7, (100.0, 100.0), &cover, &metrics());
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        for blob in &a {
            let d = (blob.center.0 - 100.0).hypot(blob.center.1 - 100.0);
            assert!(d <= 0.3 * 40.0 + 1e-9);
        }

        let dense = VegetationCover {
            kind: VegetationKind::Rainforest,
            density: 5.0,
        };
        assert_eq!(vegetation_blobs(7, (0.0, 0.0), &dense, &metrics()).len(), 6);
        let bare = VegetationCover {
            kind: VegetationKind::Forest,
            density: 0.0,
        };
        assert!(vegetation_blobs(7, (0.0, 0.0), &bare, &metrics()).is_empty());
    }

    #[test]
    fn blob_placement_varies_by_tile_and_index() {
        assert_eq!(blob_placement(3, 1), blob_placement(3, 1));
        assert_ne!(blob_placement(3, 1), blob_placement(3, 2));
        assert_ne!(blob_placement(3, 1), blob_placement(4, 1));
    }

    #[test]
    fn river_strokes_skip_seam_crossings_and_scale_by_flux() {
        let tiles = grid(10, 4);
        let layout = Layout::compute(&tiles, metrics());
        let mut rivers = HashMap::new();
        // (0,0) -> (1,0): ordinary neighbor.
        rivers.insert(1, RiverSegment { target_id: 2, flux: 10.0 });
        // (9,1) -> (0,1): crosses the wrap seam.
        rivers.insert(20, RiverSegment { target_id: 11, flux: 5.0 });
        // (2,2) -> missing tile.
        rivers.insert(23, RiverSegment { target_id: 999, flux: 1.0 });
        // (4,2) -> (4,3)
        rivers.insert(25, RiverSegment { target_id: 35, flux: 2.5 });
        let map = MapOverview {
            tiles,
            rivers: Some(rivers),
            ..MapOverview::default()
        };

        let strokes = river_strokes(&map, &layout);
        let sources: Vec<TileId> = strokes.iter().map(|s| s.source).collect();
        assert_eq!(sources, vec![1, 25]);
        assert!((strokes[0].width - 5.0).abs() < 1e-9);
        assert!((strokes[1].width - (1.5 + 3.5 * 0.25)).abs() < 1e-9);
        assert!(strokes[0].color.a > strokes[1].color.a);
    }

    #[test]
    fn highlights_replicate_over_periods() {
        use crate::renderer::recording::{DrawCommand, RecordingSurface};
        let tiles = grid(4, 4);
        let layout = Layout::compute(&tiles, metrics());
        let map = MapOverview {
            tiles,
            ..MapOverview::default()
        };
        let camera = Camera::default();
        let frame = FrameInput {
            camera: &camera,
            viewport: (400.0, 300.0),
            layout: &layout,
            map: &map,
            view_mode: ViewMode::TerrainType,
            species: None,
            hovered: Some(2),
            selected: Some(5),
            generation: 1,
            now: 0.0,
            label_zoom_threshold: 1.2,
            skip_terrain: false,
        };
        let mut surface = RecordingSurface::default();
        assert!(draw_highlights(&mut surface, &frame));
        let outlines = surface
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokeHex { .. }))
            .count();
        assert_eq!(outlines, 6);

        let frame = FrameInput {
            hovered: None,
            selected: None,
            ..frame
        };
        let mut surface = RecordingSurface::default();
        assert!(!draw_highlights(&mut surface, &frame));
        assert!(surface.commands.is_empty());
    }
}
