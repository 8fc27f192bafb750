pub mod colors;
pub mod map;

pub use colors::{parse_hex_color, suitability_color, terrain_fallback_color};
pub use map::*;
