use std::rc::Rc;
use std::sync::Arc;

use hexworld_shared::{MapOverview, TileId};

use crate::config::MapConfig;
use crate::inertia::{InertiaParams, PanController, PanPhase};
use crate::layout::{HexMetrics, Layout, LayoutCache};
use crate::renderer::{FrameInput, ViewMode};
use crate::spatial::HexPicker;
use crate::viewport::{Camera, ZoomBounds};

/// Outputs reported to the owning view.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    SelectTile { tile_id: TileId, screen: (f64, f64) },
    HoverChanged(Option<TileId>),
}

/// View inputs owned by the UI layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub view_mode: ViewMode,
    pub species: Option<String>,
    pub selected: Option<TileId>,
}

/// Owns the camera and every viewport-dependent cache for one map view.
///
/// Input before the first non-empty layout and non-zero viewport is
/// ignored. Methods that change what is on screen set a redraw flag that the
/// caller drains with [`MapController::take_redraw`].
pub struct MapController {
    config: MapConfig,
    camera: Camera,
    pending_camera: Option<Camera>,
    pan: PanController,
    layout_cache: LayoutCache,
    layout: Rc<Layout>,
    picker: HexPicker,
    map: Arc<MapOverview>,
    generation: u64,
    viewport: (f64, f64),
    bounds: ZoomBounds,
    initialized: bool,
    camera_touched: bool,
    caught_coast: bool,
    hovered: Option<TileId>,
    last_frame_ms: Option<f64>,
    redraw: bool,
}

impl MapController {
    pub fn new(config: MapConfig) -> Self {
        let config = config.sanitized();
        let metrics = HexMetrics::new(config.hex_width, config.hex_height);
        let layout_cache = LayoutCache::new(metrics);
        let layout = layout_cache.layout();
        let picker = HexPicker::build(&[], &layout);
        Self {
            camera: Camera {
                zoom: config.default_zoom,
                ..Camera::default()
            },
            pending_camera: None,
            pan: PanController::new(InertiaParams::from(&config)),
            layout_cache,
            layout,
            picker,
            map: Arc::new(MapOverview::default()),
            generation: 0,
            viewport: (0.0, 0.0),
            bounds: ZoomBounds::new(config.min_zoom, config.max_zoom),
            initialized: false,
            camera_touched: false,
            caught_coast: false,
            hovered: None,
            last_frame_ms: None,
            redraw: false,
            config,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn map(&self) -> &MapOverview {
        &self.map
    }

    /// Bumped on every map replacement.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn zoom_bounds(&self) -> ZoomBounds {
        self.bounds
    }

    pub fn hovered(&self) -> Option<TileId> {
        self.hovered
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// A drag or coast is in progress.
    pub fn is_panning(&self) -> bool {
        self.pan.phase() != PanPhase::Idle
    }

    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    pub fn frame_input<'a>(&'a self, view: &'a ViewState, now: f64) -> FrameInput<'a> {
        FrameInput {
            camera: &self.camera,
            viewport: self.viewport,
            layout: &self.layout,
            map: &self.map,
            view_mode: view.view_mode,
            species: view.species.as_deref(),
            hovered: self.hovered,
            selected: view.selected,
            generation: self.generation,
            now,
            label_zoom_threshold: self.config.label_zoom_threshold,
            skip_terrain: false,
        }
    }

    /// Replace the map. The camera is kept unless it was never moved.
    pub fn set_map(&mut self, map: Arc<MapOverview>) {
        self.generation = self.generation.wrapping_add(1);
        let relaid = self.layout_cache.refresh(&map.tiles);
        self.map = map;
        self.redraw = true;
        if !relaid {
            return;
        }

        self.layout = self.layout_cache.layout();
        self.picker = HexPicker::build(&self.map.tiles, &self.layout);
        if self.hovered.is_some_and(|id| !self.layout.contains(id)) {
            self.hovered = None;
        }
        if self.layout.is_empty() {
            self.initialized = false;
            self.pan.cancel();
            return;
        }
        self.resync();
    }

    /// Viewport size changed. Zero-area sizes are recorded but otherwise ignored.
    pub fn resize(&mut self, width: f64, height: f64) {
        if (width, height) == self.viewport {
            return;
        }
        self.viewport = (width, height);
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.redraw = true;
        self.resync();
    }

    fn resync(&mut self) {
        let base = ZoomBounds::new(self.config.min_zoom, self.config.max_zoom);
        self.bounds = base.fitted(
            self.viewport,
            (self.layout.world_width, self.layout.world_height),
            self.config.fit_margin,
        );
        let (vw, vh) = self.viewport;
        if vw <= 0.0 || vh <= 0.0 || self.layout.is_empty() {
            return;
        }

        if !self.initialized {
            self.initialized = true;
            match self.pending_camera.take() {
                Some(camera) => self.apply_camera(camera),
                None => self.place_default(),
            }
            tracing::debug!(
                zoom = self.camera.zoom,
                min_zoom = self.bounds.min,
                "map view initialized"
            );
        } else if !self.camera_touched {
            self.place_default();
        } else {
            if self.camera.zoom < self.bounds.min || self.camera.zoom > self.bounds.max {
                let zoom = self.camera.zoom;
                self.camera.zoom_at(zoom, self.center(), self.layout.world_width, self.bounds);
            }
            self.clamp_vertical();
        }
    }

    fn place_default(&mut self) {
        self.camera.zoom = self.bounds.clamp(self.config.default_zoom);
        self.camera.center_on_world(
            self.viewport,
            (self.layout.world_width, self.layout.world_height),
        );
        self.clamp_vertical();
        self.camera_touched = false;
    }

    fn center(&self) -> (f64, f64) {
        (self.viewport.0 / 2.0, self.viewport.1 / 2.0)
    }

    fn clamp_vertical(&mut self) -> bool {
        self.camera.clamp_vertical(
            self.viewport.1,
            self.layout.world_height,
            self.config.vertical_margin_fraction,
        )
    }

    fn touch(&mut self) {
        self.camera_touched = true;
        self.redraw = true;
    }

    pub fn pick(&self, sx: f64, sy: f64) -> Option<TileId> {
        self.picker.pick(&self.camera, sx, sy)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, now_ms: f64) {
        if !self.initialized {
            return;
        }
        let (vx, vy) = self.pan.velocity();
        self.caught_coast =
            self.pan.is_coasting() && vx.hypot(vy) > self.config.release_velocity;
        self.pan.pointer_down(x, y, now_ms);
    }

    /// Drag the camera, or update hover when no button is held.
    pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) -> Option<MapEvent> {
        if !self.initialized {
            return None;
        }
        if let Some((dx, dy)) = self.pan.pointer_move(x, y, now_ms) {
            self.camera.pan(dx, dy);
            self.clamp_vertical();
            self.touch();
            return None;
        }
        self.set_hover(self.pick(x, y))
    }

    /// End a drag. A tap (short travel, not catching a coasting map) over a
    /// tile selects it.
    pub fn pointer_up(&mut self, x: f64, y: f64, now_ms: f64) -> Option<MapEvent> {
        if !self.initialized {
            return None;
        }
        let tap = self.pan.pointer_up(now_ms);
        if self.pan.is_coasting() {
            self.last_frame_ms = None;
            self.redraw = true;
        }
        let caught = std::mem::take(&mut self.caught_coast);
        if !tap || caught {
            return None;
        }
        let tile_id = self.pick(x, y)?;
        tracing::debug!(tile_id, "tile selected");
        Some(MapEvent::SelectTile {
            tile_id,
            screen: (x, y),
        })
    }

    /// Pointer left the view: drop hover and end any drag without selecting.
    pub fn pointer_leave(&mut self, now_ms: f64) -> Option<MapEvent> {
        self.pan.pointer_up(now_ms);
        if self.pan.is_coasting() {
            self.last_frame_ms = None;
            self.redraw = true;
        }
        self.caught_coast = false;
        self.set_hover(None)
    }

    pub fn wheel(&mut self, delta_y: f64, x: f64, y: f64) {
        if !self.initialized || !delta_y.is_finite() {
            return;
        }
        self.pan.cancel();
        self.camera.wheel_zoom(
            delta_y,
            self.config.wheel_sensitivity,
            (x, y),
            self.layout.world_width,
            self.bounds,
        );
        self.clamp_vertical();
        self.touch();
    }

    /// Advance inertia to `now_ms`. Returns true while the camera is coasting.
    pub fn frame(&mut self, now_ms: f64) -> bool {
        if !self.pan.is_coasting() {
            self.last_frame_ms = None;
            return false;
        }
        let dt = self
            .last_frame_ms
            .map(|last| now_ms - last)
            .unwrap_or(crate::inertia::REFERENCE_FRAME_MS);
        self.last_frame_ms = Some(now_ms);
        if let Some((dx, dy)) = self.pan.step(dt) {
            self.camera.pan(dx, dy);
            if self.clamp_vertical() {
                self.pan.zero_vertical();
            }
            self.touch();
        }
        self.pan.is_coasting()
    }

    fn set_hover(&mut self, id: Option<TileId>) -> Option<MapEvent> {
        if id == self.hovered {
            return None;
        }
        self.hovered = id;
        self.redraw = true;
        Some(MapEvent::HoverChanged(id))
    }

    pub fn camera_state(&self) -> Camera {
        self.camera
    }

    /// Restore a camera. Before the view is initialized it is applied on
    /// initialization instead of the default placement.
    pub fn set_camera_state(&mut self, camera: Camera) {
        if !camera.x.is_finite() || !camera.y.is_finite() || !camera.zoom.is_finite() {
            tracing::warn!(?camera, "ignoring non-finite camera state");
            return;
        }
        if !self.initialized {
            self.pending_camera = Some(camera);
            return;
        }
        self.apply_camera(camera);
    }

    fn apply_camera(&mut self, camera: Camera) {
        self.pan.cancel();
        self.camera = Camera {
            zoom: self.bounds.clamp(camera.zoom),
            ..camera
        };
        self.clamp_vertical();
        self.touch();
    }

    /// Multiply zoom by `1 + delta` around the viewport center.
    pub fn zoom_by(&mut self, delta: f64) {
        if !self.initialized || !delta.is_finite() {
            return;
        }
        self.pan.cancel();
        let target = self.camera.zoom * (1.0 + delta);
        self.camera
            .zoom_at(target, self.center(), self.layout.world_width, self.bounds);
        self.clamp_vertical();
        self.touch();
    }

    /// Return to the configured default zoom around the viewport center.
    pub fn reset_zoom(&mut self) {
        if !self.initialized {
            return;
        }
        self.pan.cancel();
        let target = self.config.default_zoom;
        self.camera
            .zoom_at(target, self.center(), self.layout.world_width, self.bounds);
        self.clamp_vertical();
        self.touch();
    }
}
