use super::{
    DrawSurface, FrameInput, draw_highlights, label_color, label_size, period_offsets,
    river_strokes, tile_fill, vegetation_blobs,
};

/// World-space rectangle of the viewport grown by one viewport on each side.
#[derive(Debug, Clone, Copy)]
struct CullRect {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

impl CullRect {
    fn around(frame: &FrameInput<'_>) -> Self {
        let zoom = frame.camera.zoom.max(f64::EPSILON);
        let (vw, vh) = frame.viewport;
        let ex = frame.camera.effective_x(frame.layout.world_width);
        let (bx, by) = (vw / zoom, vh / zoom);
        Self {
            x0: -ex / zoom - bx,
            x1: (vw - ex) / zoom + bx,
            y0: -frame.camera.y / zoom - by,
            y1: (vh - frame.camera.y) / zoom + by,
        }
    }

    fn contains(&self, (x, y): (f64, f64)) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// Redraws everything near the viewport from scratch on every frame.
#[derive(Debug, Default)]
pub struct ImmediateRenderer;

impl ImmediateRenderer {
    pub fn render(&mut self, surface: &mut dyn DrawSurface, frame: &FrameInput<'_>) -> bool {
        let (vw, vh) = frame.viewport;
        surface.begin_frame(vw, vh, frame.background());
        let layout = frame.layout;
        if layout.is_empty() {
            return false;
        }
        let camera = frame.camera;
        surface.set_camera(camera.zoom, camera.effective_x(layout.world_width), camera.y);

        let metrics = &layout.metrics;
        let cull = CullRect::around(frame);
        let offsets = period_offsets(layout.world_width);
        let tiles = &frame.map.tiles;
        let placed = || {
            tiles
                .iter()
                .filter_map(|tile| layout.position(tile.id).map(|pos| (tile, pos)))
        };

        if !frame.skip_terrain {
            for dx in offsets {
                for (tile, (cx, cy)) in placed() {
                    let center = (cx + dx, cy);
                    if cull.contains(center) {
                        surface.fill_hex(center, metrics, tile_fill(tile, frame.view_mode, frame.species));
                    }
                }
            }
        }

        let strokes = river_strokes(frame.map, layout);
        for dx in offsets {
            for stroke in &strokes {
                let s = stroke.shifted(dx);
                if cull.contains(s.from) || cull.contains(s.to) {
                    surface.stroke_curve(s.from, s.ctrl, s.to, s.color, s.width);
                }
            }
        }

        if let Some(vegetation) = frame.map.vegetation.as_ref() {
            for dx in offsets {
                for (tile, (cx, cy)) in placed() {
                    let center = (cx + dx, cy);
                    if !cull.contains(center) {
                        continue;
                    }
                    let Some(cover) = vegetation.get(&tile.id) else {
                        continue;
                    };
                    for blob in vegetation_blobs(tile.id, center, cover, metrics) {
                        surface.fill_circle(blob.center, blob.radius, blob.color);
                    }
                }
            }
        }

        if frame.show_labels() {
            let size = label_size(metrics);
            for dx in offsets {
                for (tile, (cx, cy)) in placed() {
                    let center = (cx + dx, cy);
                    if !cull.contains(center) {
                        continue;
                    }
                    let code = tile.terrain_code();
                    if !code.is_empty() {
                        surface.fill_text(&code, center, size, label_color());
                    }
                }
            }
        }

        draw_highlights(surface, frame)
    }
}
