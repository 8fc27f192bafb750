/// Neutral fill for tiles without suitability data.
pub const NEUTRAL_DIM: (u8, u8, u8) = (58, 62, 72);

const SUITABILITY_LOW_HSL: (f64, f64, f64) = (0.0, 0.7, 0.45);
const SUITABILITY_HIGH_HSL: (f64, f64, f64) = (120.0, 0.7, 0.45);

/// Parse a `#rrggbb` (or `#rgb`) color string.
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let r = channel(&hex[0..1])?;
            let g = channel(&hex[1..2])?;
            let b = channel(&hex[2..3])?;
            Some((r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

/// Deterministic fallback color for a terrain type via CRC32 hash.
/// Lightness is pinned so unknown terrains never render black or white.
pub fn terrain_fallback_color(terrain_type: &str) -> (u8, u8, u8) {
    let hash = crc32fast::hash(terrain_type.as_bytes());
    let hue = (hash % 360) as f64;
    hsl_to_rgb(hue, 0.35, 0.42)
}

/// Red→green gradient for a suitability score in `[0, 1]`.
pub fn suitability_color(score: f64) -> (u8, u8, u8) {
    let t = if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (h, s, l) = interpolate_hsl(SUITABILITY_LOW_HSL, SUITABILITY_HIGH_HSL, t);
    hsl_to_rgb(h, s, l)
}

/// Convert RGB to HSL. Returns (h: 0..360, s: 0..1, l: 0..1).
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        let mut h = (g - b) / d;
        if g < b {
            h += 6.0;
        }
        h
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Interpolate between two HSL colors using shortest hue path.
pub fn interpolate_hsl(from: (f64, f64, f64), to: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    let mut dh = to.0 - from.0;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    let h = (from.0 + dh * t).rem_euclid(360.0);
    let s = from.1 + (to.1 - from.1) * t;
    let l = from.2 + (to.2 - from.2) * t;

    (h, s, l)
}

#[cfg(test)]
mod tests {
    use super::{
        hsl_to_rgb, interpolate_hsl, parse_hex_color, rgb_to_hsl, suitability_color,
        terrain_fallback_color,
    };

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn parse_hex_color_accepts_long_and_short_forms() {
        assert_eq!(parse_hex_color("#4a7a3c"), Some((0x4a, 0x7a, 0x3c)));
        assert_eq!(parse_hex_color(" #FFF "), Some((255, 255, 255)));
        assert_eq!(parse_hex_color("#0f0"), Some((0, 255, 0)));
    }

    #[test]
    fn parse_hex_color_rejects_garbage() {
        assert_eq!(parse_hex_color("4a7a3c"), None);
        assert_eq!(parse_hex_color("#4a7a3"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color(""), None);
    }

    #[test]
    fn rgb_to_hsl_gray_has_zero_saturation() {
        let (h, s, l) = rgb_to_hsl(128, 128, 128);
        assert_close(h, 0.0);
        assert_close(s, 0.0);
        assert_close(l, 128.0 / 255.0);
    }

    #[test]
    fn hsl_roundtrip_for_primaries() {
        for (r, g, b) in [(255, 0, 0), (0, 255, 0), (0, 0, 255), (37, 91, 201)] {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            assert_eq!(hsl_to_rgb(h, s, l), (r, g, b));
        }
    }

    #[test]
    fn interpolate_hsl_wraps_shortest_path() {
        let from = (350.0, 0.6, 0.4);
        let to = (10.0, 0.8, 0.5);

        let mid = interpolate_hsl(from, to, 0.5);
        assert_close(mid.0, 0.0);
        assert_close(mid.1, 0.7);
        assert_close(mid.2, 0.45);
    }

    #[test]
    fn suitability_gradient_runs_red_to_green() {
        let (lr, lg, _) = suitability_color(0.0);
        let (hr, hg, _) = suitability_color(1.0);
        assert!(lr > lg, "low score should be red");
        assert!(hg > hr, "high score should be green");
        assert_eq!(suitability_color(-3.0), suitability_color(0.0));
        assert_eq!(suitability_color(f64::NAN), suitability_color(0.0));
        assert_eq!(suitability_color(7.0), suitability_color(1.0));
    }

    #[test]
    fn terrain_fallback_color_is_deterministic() {
        assert_eq!(
            terrain_fallback_color("volcanic"),
            terrain_fallback_color("volcanic")
        );
        let (r, g, b) = terrain_fallback_color("glacier");
        let (_, _, l) = rgb_to_hsl(r, g, b);
        assert!((l - 0.42).abs() < 0.01, "lightness pinned, got {l}");
    }
}
