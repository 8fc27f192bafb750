use web_sys::CanvasRenderingContext2d;

use super::{DrawSurface, Rgba};
use crate::colors::rgb_css;
use crate::layout::HexMetrics;

/// [`DrawSurface`] over a 2D canvas context. Geometry arrives in CSS pixels
/// and is scaled by the device pixel ratio.
pub struct CanvasSurface<'a> {
    ctx: &'a CanvasRenderingContext2d,
    dpr: f64,
}

impl<'a> CanvasSurface<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d, dpr: f64) -> Self {
        Self { ctx, dpr }
    }

    fn hex_path(&self, (cx, cy): (f64, f64), metrics: &HexMetrics) {
        let ctx = self.ctx;
        ctx.begin_path();
        for (i, (x, y)) in metrics.corners().into_iter().enumerate() {
            if i == 0 {
                ctx.move_to(cx + x, cy + y);
            } else {
                ctx.line_to(cx + x, cy + y);
            }
        }
        ctx.close_path();
    }
}

impl DrawSurface for CanvasSurface<'_> {
    fn begin_frame(&mut self, width: f64, height: f64, background: Option<(u8, u8, u8)>) {
        let ctx = self.ctx;
        ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0).ok();
        match background {
            Some(rgb) => {
                ctx.set_fill_style_str(&rgb_css(rgb));
                ctx.fill_rect(0.0, 0.0, width, height);
            }
            None => ctx.clear_rect(0.0, 0.0, width, height),
        }
    }

    fn set_camera(&mut self, zoom: f64, tx: f64, ty: f64) {
        let s = self.dpr;
        self.ctx
            .set_transform(s * zoom, 0.0, 0.0, s * zoom, s * tx, s * ty)
            .ok();
    }

    fn fill_hex(&mut self, center: (f64, f64), metrics: &HexMetrics, color: Rgba) {
        self.hex_path(center, metrics);
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill();
    }

    fn stroke_hex(&mut self, center: (f64, f64), metrics: &HexMetrics, color: Rgba, width: f64) {
        self.hex_path(center, metrics);
        self.ctx.set_stroke_style_str(&color.css());
        self.ctx.set_line_width(width);
        self.ctx.stroke();
    }

    fn stroke_curve(
        &mut self,
        from: (f64, f64),
        ctrl: (f64, f64),
        to: (f64, f64),
        color: Rgba,
        width: f64,
    ) {
        let ctx = self.ctx;
        ctx.begin_path();
        ctx.move_to(from.0, from.1);
        ctx.quadratic_curve_to(ctrl.0, ctrl.1, to.0, to.1);
        ctx.set_stroke_style_str(&color.css());
        ctx.set_line_width(width);
        ctx.set_line_cap("round");
        ctx.stroke();
    }

    fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: Rgba) {
        let ctx = self.ctx;
        ctx.begin_path();
        if ctx
            .arc(center.0, center.1, radius, 0.0, std::f64::consts::TAU)
            .is_err()
        {
            return;
        }
        ctx.set_fill_style_str(&color.css());
        ctx.fill();
    }

    fn fill_text(&mut self, text: &str, at: (f64, f64), size: f64, color: Rgba) {
        let ctx = self.ctx;
        ctx.set_font(&format!("600 {size:.2}px 'Inter', system-ui, sans-serif"));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_fill_style_str(&color.css());
        ctx.fill_text(text, at.0, at.1).ok();
    }
}
