//! Host-side surface that records draw calls in screen space.

use super::{DrawSurface, Rgba};
use crate::layout::HexMetrics;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Begin {
        width: f64,
        height: f64,
        background: Option<(u8, u8, u8)>,
    },
    FillHex {
        center: (f64, f64),
        radius: f64,
        color: Rgba,
    },
    StrokeHex {
        center: (f64, f64),
        radius: f64,
        color: Rgba,
        width: f64,
    },
    Curve {
        from: (f64, f64),
        ctrl: (f64, f64),
        to: (f64, f64),
        color: Rgba,
        width: f64,
    },
    Circle {
        center: (f64, f64),
        radius: f64,
        color: Rgba,
    },
    Text {
        text: String,
        at: (f64, f64),
        size: f64,
        color: Rgba,
    },
}

impl DrawCommand {
    /// Whether any part of the command can land inside the viewport.
    fn touches(&self, (vw, vh): (f64, f64), margin: f64) -> bool {
        let inside = |(x, y): (f64, f64), r: f64| {
            x + r >= -margin && x - r <= vw + margin && y + r >= -margin && y - r <= vh + margin
        };
        match self {
            DrawCommand::Begin { .. } => true,
            DrawCommand::FillHex { center, radius, .. }
            | DrawCommand::StrokeHex { center, radius, .. }
            | DrawCommand::Circle { center, radius, .. } => inside(*center, *radius),
            DrawCommand::Curve { from, ctrl, to, .. } => {
                let xs = [from.0, ctrl.0, to.0];
                let ys = [from.1, ctrl.1, to.1];
                let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
                let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
                let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                max_x >= -margin && min_x <= vw + margin && max_y >= -margin && min_y <= vh + margin
            }
            DrawCommand::Text { at, size, .. } => inside(*at, *size),
        }
    }
}

#[derive(Debug)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
    zoom: f64,
    tx: f64,
    ty: f64,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            zoom: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }
}

impl RecordingSurface {
    fn screen(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x * self.zoom + self.tx, y * self.zoom + self.ty)
    }

    /// Commands that can affect pixels inside the viewport, in draw order.
    pub fn visible(&self, viewport: (f64, f64), margin: f64) -> Vec<DrawCommand> {
        self.commands
            .iter()
            .filter(|c| c.touches(viewport, margin))
            .cloned()
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_frame(&mut self, width: f64, height: f64, background: Option<(u8, u8, u8)>) {
        self.commands.push(DrawCommand::Begin {
            width,
            height,
            background,
        });
    }

    fn set_camera(&mut self, zoom: f64, tx: f64, ty: f64) {
        self.zoom = zoom;
        self.tx = tx;
        self.ty = ty;
    }

    fn fill_hex(&mut self, center: (f64, f64), metrics: &HexMetrics, color: Rgba) {
        self.commands.push(DrawCommand::FillHex {
            center: self.screen(center),
            radius: metrics.hex_width / 2.0 * self.zoom,
            color,
        });
    }

    fn stroke_hex(&mut self, center: (f64, f64), metrics: &HexMetrics, color: Rgba, width: f64) {
        self.commands.push(DrawCommand::StrokeHex {
            center: self.screen(center),
            radius: metrics.hex_width / 2.0 * self.zoom,
            color,
            width: width * self.zoom,
        });
    }

    fn stroke_curve(
        &mut self,
        from: (f64, f64),
        ctrl: (f64, f64),
        to: (f64, f64),
        color: Rgba,
        width: f64,
    ) {
        self.commands.push(DrawCommand::Curve {
            from: self.screen(from),
            ctrl: self.screen(ctrl),
            to: self.screen(to),
            color,
            width: width * self.zoom,
        });
    }

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: Rgba) {
        self.commands.push(DrawCommand::Circle {
            center: self.screen(center),
            radius: radius * self.zoom,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, at: (f64, f64), size: f64, color: Rgba) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            at: self.screen(at),
            size: size * self.zoom,
            color,
        });
    }
}
