use serde::{Deserialize, Serialize};

pub const CONFIG_STORAGE_KEY: &str = "hexworld_config";

/// How the tile layers reach the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Clear and redraw visible tiles on every camera change.
    Immediate,
    /// Persistent sprite pool; per frame only the camera transform changes.
    Retained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InertiaTiming {
    /// Decay and displacement scale with elapsed time (reference 60 Hz).
    FrameRateIndependent,
    /// One friction step per animation frame regardless of its duration.
    PerFrame,
}

/// Tunables for the map viewport. Loaded from local storage overrides,
/// falling back to these defaults field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub hex_width: f64,
    pub hex_height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    /// Multiplier on the fit-to-viewport zoom floor.
    pub fit_margin: f64,
    /// Empty space allowed above/below the world, as a fraction of viewport height.
    pub vertical_margin_fraction: f64,
    pub friction: f64,
    /// Inertia stops once both velocity components fall below this (px/step).
    pub stop_velocity: f64,
    /// Minimum release velocity (px/step) that starts inertia.
    pub release_velocity: f64,
    /// Release must follow the last move within this window to start inertia.
    pub release_window_ms: f64,
    pub click_move_threshold: f64,
    pub wheel_sensitivity: f64,
    pub label_zoom_threshold: f64,
    pub render_strategy: RenderStrategy,
    pub inertia_timing: InertiaTiming,
    pub data_url: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            hex_width: 40.0,
            hex_height: 34.64,
            min_zoom: 0.3,
            max_zoom: 2.5,
            default_zoom: 1.0,
            fit_margin: 1.02,
            vertical_margin_fraction: 0.2,
            friction: 0.92,
            stop_velocity: 0.1,
            release_velocity: 1.0,
            release_window_ms: 100.0,
            click_move_threshold: 4.0,
            wheel_sensitivity: 0.001,
            label_zoom_threshold: 1.2,
            render_strategy: RenderStrategy::Retained,
            inertia_timing: InertiaTiming::FrameRateIndependent,
            data_url: "/map_overview.json".to_string(),
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

impl MapConfig {
    /// Replace unusable values with defaults and order the zoom bounds.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.hex_width = positive_or(self.hex_width, defaults.hex_width);
        self.hex_height = positive_or(self.hex_height, defaults.hex_height);
        self.min_zoom = positive_or(self.min_zoom, defaults.min_zoom);
        self.max_zoom = positive_or(self.max_zoom, defaults.max_zoom);
        if self.min_zoom > self.max_zoom {
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        self.default_zoom = positive_or(self.default_zoom, defaults.default_zoom)
            .clamp(self.min_zoom, self.max_zoom);
        self.fit_margin = positive_or(self.fit_margin, defaults.fit_margin);
        if !(0.0..0.5).contains(&self.vertical_margin_fraction) {
            self.vertical_margin_fraction = defaults.vertical_margin_fraction;
        }
        if !(self.friction > 0.0 && self.friction < 1.0) {
            self.friction = defaults.friction;
        }
        self.stop_velocity = positive_or(self.stop_velocity, defaults.stop_velocity);
        self.release_velocity = positive_or(self.release_velocity, defaults.release_velocity);
        self.release_window_ms = positive_or(self.release_window_ms, defaults.release_window_ms);
        self.click_move_threshold =
            positive_or(self.click_move_threshold, defaults.click_move_threshold);
        self.wheel_sensitivity = positive_or(self.wheel_sensitivity, defaults.wheel_sensitivity);
        self.label_zoom_threshold =
            positive_or(self.label_zoom_threshold, defaults.label_zoom_threshold);
        if self.data_url.trim().is_empty() {
            self.data_url = defaults.data_url;
        }
        self
    }

    /// Read overrides from local storage, if any.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        use gloo_storage::Storage;
        gloo_storage::LocalStorage::get::<MapConfig>(CONFIG_STORAGE_KEY)
            .unwrap_or_default()
            .sanitized()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let cfg: MapConfig =
            serde_json::from_str(r#"{"friction": 0.85, "render_strategy": "immediate"}"#)
                .expect("partial config should parse");
        assert_eq!(cfg.friction, 0.85);
        assert_eq!(cfg.render_strategy, RenderStrategy::Immediate);
        assert_eq!(cfg.hex_width, 40.0);
        assert_eq!(cfg.inertia_timing, InertiaTiming::FrameRateIndependent);
    }

    #[test]
    fn sanitized_repairs_bad_values() {
        let cfg = MapConfig {
            hex_width: -4.0,
            min_zoom: 3.0,
            max_zoom: 0.5,
            default_zoom: 9.0,
            friction: 1.5,
            vertical_margin_fraction: f64::NAN,
            data_url: "  ".to_string(),
            ..MapConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.hex_width, 40.0);
        assert_eq!((cfg.min_zoom, cfg.max_zoom), (0.5, 3.0));
        assert_eq!(cfg.default_zoom, 3.0);
        assert_eq!(cfg.friction, 0.92);
        assert_eq!(cfg.vertical_margin_fraction, 0.2);
        assert_eq!(cfg.data_url, "/map_overview.json");
    }

    #[test]
    fn defaults_survive_sanitizing() {
        assert_eq!(MapConfig::default().sanitized(), MapConfig::default());
    }
}
