use include_dir::{include_dir, Dir};
use serde::Deserialize;

use crate::error::{ReticleError, Result};

static PROFILES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/profiles");
const CATALOG_FILE: &str = "games.json";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DpiRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TestWeights {
    pub accuracy: f64,
    pub reaction: f64,
    pub consistency: f64,
}

/// Static per-game tuning, read-only
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProfile {
    pub id: String,
    pub name: String,
    /// cm/360
    pub optimal_range: Range,
    pub test_weights: TestWeights,
    pub dpi_recommendation: DpiRange,
}

/// Every bundled profile, in catalog order
pub fn catalog() -> Result<Vec<GameProfile>> {
    let file = PROFILES_DIR.get_file(CATALOG_FILE).ok_or_else(|| {
        ReticleError::ConfigurationMissing(format!("bundled {CATALOG_FILE}"))
    })?;
    let text = file.contents_utf8().unwrap_or_default();
    Ok(serde_json::from_str(text)?)
}

pub fn lookup(game_id: &str) -> Result<GameProfile> {
    catalog()?
        .into_iter()
        .find(|p| p.id.eq_ignore_ascii_case(game_id))
        .ok_or_else(|| ReticleError::UnknownGameProfile(game_id.to_string()))
}
