/// Format RGBA as a CSS color string. Alpha is clamped to `[0, 1]`.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    let a = if a.is_finite() { a.clamp(0.0, 1.0) } else { 1.0 };
    format!("rgba({r},{g},{b},{a:.3})")
}

pub fn rgb_css((r, g, b): (u8, u8, u8)) -> String {
    format!("rgb({r},{g},{b})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_strings() {
        assert_eq!(rgba_css(1, 2, 3, 0.5), "rgba(1,2,3,0.500)");
        assert_eq!(rgba_css(1, 2, 3, 7.0), "rgba(1,2,3,1.000)");
        assert_eq!(rgba_css(1, 2, 3, f64::NAN), "rgba(1,2,3,1.000)");
        assert_eq!(rgb_css((12, 14, 23)), "rgb(12,14,23)");
    }
}
