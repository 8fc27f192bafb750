use serde::{Deserialize, Serialize};

/// Camera maps wrapped world coordinates to screen coordinates.
///
/// `x`/`y` are the screen-space translation of the world origin and `zoom`
/// is a uniform scale. The horizontal axis wraps: only `x` modulo one scaled
/// world period matters, see [`Camera::effective_x`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
}

impl ZoomBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }

    /// Raise the floor so the world covers the viewport on both axes.
    /// Returns the bounds unchanged for zero-area viewports or empty worlds.
    pub fn fitted(
        &self,
        viewport: (f64, f64),
        world: (f64, f64),
        margin: f64,
    ) -> ZoomBounds {
        let (vw, vh) = viewport;
        let (ww, wh) = world;
        if vw <= 0.0 || vh <= 0.0 || ww <= 0.0 || wh <= 0.0 {
            return *self;
        }
        let fit = (vw / ww).max(vh / wh) * margin;
        ZoomBounds {
            min: self.min.max(fit).min(self.max),
            max: self.max,
        }
    }
}

impl Camera {
    /// `x` reduced into `(-world_width * zoom, 0]` so the center copy of the
    /// world stays anchored near the viewport however far the user has panned.
    pub fn effective_x(&self, world_width: f64) -> f64 {
        let period = world_width * self.zoom;
        if !(period > 0.0) || !self.x.is_finite() {
            return self.x;
        }
        let r = self.x.rem_euclid(period);
        if r == 0.0 { 0.0 } else { r - period }
    }

    /// Convert world coordinates to screen coordinates (center period).
    pub fn world_to_screen(&self, wx: f64, wy: f64, world_width: f64) -> (f64, f64) {
        (
            wx * self.zoom + self.effective_x(world_width),
            wy * self.zoom + self.y,
        )
    }

    /// Convert screen coordinates to world coordinates (center period).
    pub fn screen_to_world(&self, sx: f64, sy: f64, world_width: f64) -> (f64, f64) {
        (
            (sx - self.effective_x(world_width)) / self.zoom,
            (sy - self.y) / self.zoom,
        )
    }

    /// Zoom to `target` keeping the world point under `anchor` fixed.
    pub fn zoom_at(&mut self, target: f64, anchor: (f64, f64), world_width: f64, bounds: ZoomBounds) {
        self.x = self.effective_x(world_width);
        let new_zoom = bounds.clamp(target);
        let ratio = new_zoom / self.zoom;

        // Adjust offset so the point under the cursor stays fixed
        self.x = anchor.0 - (anchor.0 - self.x) * ratio;
        self.y = anchor.1 - (anchor.1 - self.y) * ratio;
        self.zoom = new_zoom;
    }

    /// Wheel zoom toward the cursor: `exp(-delta * sensitivity)` per event.
    pub fn wheel_zoom(
        &mut self,
        delta: f64,
        sensitivity: f64,
        anchor: (f64, f64),
        world_width: f64,
        bounds: ZoomBounds,
    ) {
        let factor = (-delta * sensitivity).exp();
        self.zoom_at(self.zoom * factor, anchor, world_width, bounds);
    }

    /// Pan by screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Snap `y` so at most `margin_fraction` of the viewport height shows empty
    /// space above or below the world. Returns true when `y` was changed.
    pub fn clamp_vertical(&mut self, viewport_h: f64, world_height: f64, margin_fraction: f64) -> bool {
        if viewport_h <= 0.0 || world_height <= 0.0 {
            return false;
        }
        let margin = viewport_h * margin_fraction;
        let scaled = world_height * self.zoom;
        let clamped = if scaled + 2.0 * margin < viewport_h {
            (viewport_h - scaled) / 2.0
        } else {
            self.y.clamp(viewport_h - margin - scaled, margin)
        };
        if clamped == self.y {
            return false;
        }
        self.y = clamped;
        true
    }

    /// Center the world in the viewport at the current zoom.
    pub fn center_on_world(&mut self, viewport: (f64, f64), world: (f64, f64)) {
        self.x = viewport.0 / 2.0 - world.0 * self.zoom / 2.0;
        self.y = viewport.1 / 2.0 - world.1 * self.zoom / 2.0;
    }
}

/// Reduce a world X coordinate into `[0, world_width)`.
pub fn wrap_world_x(wx: f64, world_width: f64) -> f64 {
    if world_width > 0.0 {
        wx.rem_euclid(world_width)
    } else {
        wx
    }
}
