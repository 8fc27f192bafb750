use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

pub type TileId = u32;

/// One hex tile of a world snapshot. Identity is `id`; `(x, y)` is the
/// offset-coordinate column/row inside a single world period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub x: i32,
    pub y: i32,
    pub terrain_type: String,
    #[serde(default)]
    pub climate_zone: String,
    #[serde(default)]
    pub elevation: f64,
    /// Display color as `#rrggbb`.
    #[serde(default)]
    pub color: String,
    /// Species id → habitat suitability score in `[0, 1]`.
    #[serde(default)]
    pub suitability: HashMap<String, f64>,
}

impl Tile {
    /// Short upper-case code for map labels (e.g. "grassland" → "GR").
    pub fn terrain_code(&self) -> String {
        self.terrain_type
            .chars()
            .filter(|c| c.is_alphanumeric())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// Downstream flow from a source tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiverSegment {
    pub target_id: TileId,
    pub flux: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VegetationKind {
    Grassland,
    Shrubland,
    Forest,
    Rainforest,
    Tundra,
    Wetland,
    #[serde(other)]
    Unknown,
}

impl VegetationKind {
    /// Upper bound of blobs drawn per tile at full density.
    pub fn max_blobs(self) -> u32 {
        match self {
            VegetationKind::Grassland => 3,
            VegetationKind::Shrubland => 4,
            VegetationKind::Forest => 5,
            VegetationKind::Rainforest => 6,
            VegetationKind::Tundra => 2,
            VegetationKind::Wetland => 3,
            VegetationKind::Unknown => 2,
        }
    }

    pub fn color(self) -> (u8, u8, u8) {
        match self {
            VegetationKind::Grassland => (148, 186, 84),
            VegetationKind::Shrubland => (122, 140, 70),
            VegetationKind::Forest => (46, 110, 52),
            VegetationKind::Rainforest => (22, 88, 44),
            VegetationKind::Tundra => (160, 168, 140),
            VegetationKind::Wetland => (70, 128, 110),
            VegetationKind::Unknown => (110, 130, 100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VegetationCover {
    #[serde(rename = "type")]
    pub kind: VegetationKind,
    pub density: f64,
}

/// Full tile set for one world snapshot. Replaced wholesale on every turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapOverview {
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub rivers: Option<HashMap<TileId, RiverSegment>>,
    #[serde(default)]
    pub vegetation: Option<HashMap<TileId, VegetationCover>>,
    #[serde(default)]
    pub sea_level: f64,
    #[serde(default)]
    pub global_avg_temperature: f64,
}

impl MapOverview {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid map overview: {e}"))
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Every species with at least one suitability score, sorted.
    pub fn species_ids(&self) -> Vec<String> {
        self.tiles
            .iter()
            .flat_map(|tile| tile.suitability.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Largest river flux, or 0.0 when the map has no rivers.
    pub fn max_flux(&self) -> f64 {
        self.rivers
            .as_ref()
            .map(|rivers| {
                rivers
                    .values()
                    .map(|segment| segment.flux)
                    .filter(|flux| flux.is_finite())
                    .fold(0.0f64, f64::max)
            })
            .unwrap_or(0.0)
    }
}
