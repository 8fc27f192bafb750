use crate::config::{InertiaTiming, MapConfig};

/// Frame duration the friction constant is calibrated against.
pub(crate) const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;
/// Long frames (tab switch, debugger) are treated as this many ms at most.
const MAX_STEP_MS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanPhase {
    Idle,
    Dragging,
    Inertia,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertiaParams {
    pub friction: f64,
    pub stop_velocity: f64,
    pub release_velocity: f64,
    pub release_window_ms: f64,
    pub click_move_threshold: f64,
    pub timing: InertiaTiming,
}

impl From<&MapConfig> for InertiaParams {
    fn from(cfg: &MapConfig) -> Self {
        Self {
            friction: cfg.friction,
            stop_velocity: cfg.stop_velocity,
            release_velocity: cfg.release_velocity,
            release_window_ms: cfg.release_window_ms,
            click_move_threshold: cfg.click_move_threshold,
            timing: cfg.inertia_timing,
        }
    }
}

/// Drag tracking and post-release momentum.
///
/// Idle → Dragging on pointer-down, Dragging → Inertia (or Idle) on
/// pointer-up, Inertia → Idle once both velocity components fall under the
/// stop threshold. A new pointer-down or wheel cancels inertia at any time.
#[derive(Debug, Clone)]
pub struct PanController {
    params: InertiaParams,
    phase: PanPhase,
    last_pos: (f64, f64),
    last_move_ms: f64,
    velocity: (f64, f64),
    travel: f64,
}

impl PanController {
    pub fn new(params: InertiaParams) -> Self {
        Self {
            params,
            phase: PanPhase::Idle,
            last_pos: (0.0, 0.0),
            last_move_ms: 0.0,
            velocity: (0.0, 0.0),
            travel: 0.0,
        }
    }

    pub fn phase(&self) -> PanPhase {
        self.phase
    }

    pub fn velocity(&self) -> (f64, f64) {
        self.velocity
    }

    /// Cumulative pointer movement since the last pointer-down.
    pub fn travel(&self) -> f64 {
        self.travel
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, now_ms: f64) {
        self.cancel();
        self.phase = PanPhase::Dragging;
        self.last_pos = (x, y);
        self.last_move_ms = now_ms;
        self.travel = 0.0;
    }

    /// Returns the screen delta to apply to the camera while dragging.
    pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) -> Option<(f64, f64)> {
        if self.phase != PanPhase::Dragging {
            return None;
        }
        let dx = x - self.last_pos.0;
        let dy = y - self.last_pos.1;
        self.last_pos = (x, y);
        self.last_move_ms = now_ms;
        self.velocity = (dx, dy);
        self.travel += dx.hypot(dy);
        Some((dx, dy))
    }

    /// Ends a drag. Returns true when the release counts as a tap.
    pub fn pointer_up(&mut self, now_ms: f64) -> bool {
        if self.phase != PanPhase::Dragging {
            return false;
        }
        let tap = self.travel < self.params.click_move_threshold;
        let speed = self.velocity.0.hypot(self.velocity.1);
        let recent = now_ms - self.last_move_ms < self.params.release_window_ms;
        if !tap && speed > self.params.release_velocity && recent {
            tracing::debug!(vx = self.velocity.0, vy = self.velocity.1, "inertia started");
            self.phase = PanPhase::Inertia;
        } else {
            self.phase = PanPhase::Idle;
            self.velocity = (0.0, 0.0);
        }
        tap
    }

    /// Advance inertia by one animation step of `dt_ms`. Returns the camera
    /// delta for this step, or `None` when not coasting.
    pub fn step(&mut self, dt_ms: f64) -> Option<(f64, f64)> {
        if self.phase != PanPhase::Inertia {
            return None;
        }
        let frames = match self.params.timing {
            InertiaTiming::PerFrame => 1.0,
            InertiaTiming::FrameRateIndependent => {
                dt_ms.clamp(0.0, MAX_STEP_MS) / REFERENCE_FRAME_MS
            }
        };
        let decay = self.params.friction.powf(frames);
        self.velocity.0 *= decay;
        self.velocity.1 *= decay;
        let delta = (self.velocity.0 * frames, self.velocity.1 * frames);

        if self.velocity.0.abs() < self.params.stop_velocity
            && self.velocity.1.abs() < self.params.stop_velocity
        {
            tracing::debug!("inertia settled");
            self.phase = PanPhase::Idle;
            self.velocity = (0.0, 0.0);
        }
        Some(delta)
    }

    /// Drop vertical momentum after the camera hit the vertical clamp.
    pub fn zero_vertical(&mut self) {
        self.velocity.1 = 0.0;
    }

    /// Stop any coasting immediately.
    pub fn cancel(&mut self) {
        if self.phase == PanPhase::Inertia {
            tracing::debug!("inertia cancelled");
        }
        if self.phase != PanPhase::Dragging {
            self.phase = PanPhase::Idle;
        }
        self.velocity = (0.0, 0.0);
    }

    pub fn is_coasting(&self) -> bool {
        self.phase == PanPhase::Inertia
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(timing: InertiaTiming) -> InertiaParams {
        InertiaParams {
            timing,
            ..InertiaParams::from(&MapConfig::default())
        }
    }

    fn flick(ctrl: &mut PanController, vx: f64, vy: f64) {
        ctrl.pointer_down(100.0, 100.0, 0.0);
        ctrl.pointer_move(100.0 + vx * 4.0, 100.0 + vy * 4.0, 16.0);
        ctrl.pointer_move(100.0 + vx * 5.0, 100.0 + vy * 5.0, 32.0);
        ctrl.pointer_up(40.0);
    }

    #[test]
    fn drag_applies_deltas_one_to_one() {
        let mut ctrl = PanController::new(params(InertiaTiming::PerFrame));
        assert_eq!(ctrl.pointer_move(5.0, 5.0, 0.0), None);
        ctrl.pointer_down(10.0, 20.0, 0.0);
        assert_eq!(ctrl.phase(), PanPhase::Dragging);
        assert_eq!(ctrl.pointer_move(13.0, 16.0, 10.0), Some((3.0, -4.0)));
        assert_eq!(ctrl.travel(), 5.0);
    }

    #[test]
    fn fast_release_enters_inertia() {
        let mut ctrl = PanController::new(params(InertiaTiming::PerFrame));
        flick(&mut ctrl, 12.0, 0.0);
        assert_eq!(ctrl.phase(), PanPhase::Inertia);
    }

    #[test]
    fn stale_release_does_not_coast() {
        let mut ctrl = PanController::new(params(InertiaTiming::PerFrame));
        ctrl.pointer_down(0.0, 0.0, 0.0);
        ctrl.pointer_move(40.0, 0.0, 10.0);
        assert!(!ctrl.pointer_up(400.0));
        assert_eq!(ctrl.phase(), PanPhase::Idle);
    }

    #[test]
    fn slow_release_does_not_coast() {
        let mut ctrl = PanController::new(params(InertiaTiming::PerFrame));
        ctrl.pointer_down(0.0, 0.0, 0.0);
        for i in 1..=10 {
            ctrl.pointer_move(i as f64 * 0.5, 0.0, i as f64 * 16.0);
        }
        ctrl.pointer_up(170.0);
        assert_eq!(ctrl.phase(), PanPhase::Idle);
    }

    #[test]
    fn inertia_decays_monotonically_and_matches_geometric_sum() {
        let mut ctrl = PanController::new(params(InertiaTiming::PerFrame));
        flick(&mut ctrl, 10.0, -6.0);
        let v0 = ctrl.velocity();
        let f = 0.92f64;

        let mut total = (0.0, 0.0);
        let mut steps = 0u32;
        let mut last_speed = v0.0.hypot(v0.1);
        while let Some((dx, dy)) = ctrl.step(16.0) {
            total.0 += dx;
            total.1 += dy;
            steps += 1;
            let speed = dx.hypot(dy);
            assert!(speed < last_speed, "speed must strictly decrease");
            last_speed = speed;
            assert!(steps < 10_000, "inertia never settled");
        }
        assert_eq!(ctrl.phase(), PanPhase::Idle);

        let n = steps as i32;
        let closed = f * (1.0 - f.powi(n)) / (1.0 - f);
        assert!((total.0 - v0.0 * closed).abs() < 1e-9);
        assert!((total.1 - v0.1 * closed).abs() < 1e-9);
    }

    #[test]
    fn frame_rate_independent_matches_per_frame_at_sixty_hz() {
        let mut per_frame = PanController::new(params(InertiaTiming::PerFrame));
        let mut timed = PanController::new(params(InertiaTiming::FrameRateIndependent));
        flick(&mut per_frame, 9.0, 3.0);
        flick(&mut timed, 9.0, 3.0);
        for _ in 0..20 {
            let a = per_frame.step(REFERENCE_FRAME_MS).expect("coasting");
            let b = timed.step(REFERENCE_FRAME_MS).expect("coasting");
            assert!((a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9);
        }
    }

    #[test]
    fn frame_rate_independent_travel_is_similar_at_thirty_hz() {
        let mut fast = PanController::new(params(InertiaTiming::FrameRateIndependent));
        let mut slow = PanController::new(params(InertiaTiming::FrameRateIndependent));
        flick(&mut fast, 20.0, 0.0);
        flick(&mut slow, 20.0, 0.0);
        let mut fast_total = 0.0;
        while let Some((dx, _)) = fast.step(REFERENCE_FRAME_MS) {
            fast_total += dx;
        }
        let mut slow_total = 0.0;
        while let Some((dx, _)) = slow.step(2.0 * REFERENCE_FRAME_MS) {
            slow_total += dx;
        }
        let ratio = slow_total / fast_total;
        assert!((0.85..1.15).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn pointer_down_cancels_inertia() {
        let mut ctrl = PanController::new(params(InertiaTiming::PerFrame));
        flick(&mut ctrl, 12.0, 0.0);
        assert!(ctrl.is_coasting());
        ctrl.pointer_down(0.0, 0.0, 100.0);
        assert_eq!(ctrl.phase(), PanPhase::Dragging);
        assert_eq!(ctrl.step(16.0), None);
    }

    #[test]
    fn small_movement_is_a_tap() {
        let mut ctrl = PanController::new(params(InertiaTiming::PerFrame));
        ctrl.pointer_down(50.0, 50.0, 0.0);
        ctrl.pointer_move(51.0, 51.0, 10.0);
        assert!(ctrl.pointer_up(20.0));
        assert_eq!(ctrl.phase(), PanPhase::Idle);

        ctrl.pointer_down(50.0, 50.0, 100.0);
        ctrl.pointer_move(60.0, 50.0, 110.0);
        assert!(!ctrl.pointer_up(120.0));
    }
}
