/// Sinusoidal alpha pulse for hover/selection outlines.
#[derive(Debug, Clone, Copy)]
pub struct Pulse {
    pub period_ms: f64,
    pub min_alpha: f64,
    pub max_alpha: f64,
}

pub const SELECTION_PULSE: Pulse = Pulse {
    period_ms: 1200.0,
    min_alpha: 0.55,
    max_alpha: 1.0,
};

pub const HOVER_PULSE: Pulse = Pulse {
    period_ms: 1200.0,
    min_alpha: 0.3,
    max_alpha: 0.6,
};

impl Pulse {
    /// Alpha at `now` (milliseconds). Starts at `min_alpha` at t=0.
    pub fn alpha(&self, now: f64) -> f64 {
        if self.period_ms <= 0.0 || !now.is_finite() {
            return self.max_alpha;
        }
        let phase = (now / self.period_ms).fract() * std::f64::consts::TAU;
        let t = 0.5 - 0.5 * phase.cos();
        self.min_alpha + (self.max_alpha - self.min_alpha) * ease_in_out(t)
    }
}

/// Smoothstep easing on `[0, 1]`.
fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
