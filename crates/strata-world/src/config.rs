use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use strata_noise::NoiseConfig;

use crate::curve::HeightCurve;
use crate::texture::TerrainType;

/// Samples per chunk edge for smooth-shaded terrain.
pub const MAP_CHUNK_SIZE: usize = 239;
/// Flat shading duplicates vertices per triangle, so chunks are kept smaller.
pub const FLAT_SHADED_CHUNK_SIZE: usize = 95;

const MIN_UNIFORM_SCALE: f32 = 0.0001;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default = "default_uniform_scale")]
    pub uniform_scale: f32,
    #[serde(default)]
    pub flat_shading: bool,
    #[serde(default)]
    pub falloff: bool,
    #[serde(default = "default_height_multiplier")]
    pub height_multiplier: f32,
    #[serde(default)]
    pub height_curve: HeightCurve,
    /// Overrides the shading-derived chunk size.
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub regions: Vec<TerrainType>,
    /// Publish change events when this config is reloaded.
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
}
fn default_uniform_scale() -> f32 {
    2.5
}
fn default_height_multiplier() -> f32 {
    10.0
}
fn default_auto_update() -> bool {
    true
}
impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            uniform_scale: default_uniform_scale(),
            flat_shading: false,
            falloff: false,
            height_multiplier: default_height_multiplier(),
            height_curve: HeightCurve::default(),
            chunk_size: None,
            regions: Vec::new(),
            auto_update: default_auto_update(),
        }
    }
}

impl TerrainConfig {
    /// Interior samples per chunk edge (the height map adds a border of 2).
    pub fn map_chunk_size(&self) -> usize {
        match self.chunk_size {
            Some(n) => n,
            None if self.flat_shading => FLAT_SHADED_CHUNK_SIZE,
            None => MAP_CHUNK_SIZE,
        }
    }

    /// Lowest world-space height a mesh can reach, for height-based shading.
    pub fn min_height(&self) -> f32 {
        self.uniform_scale * self.height_multiplier * self.height_curve.evaluate(0.0)
    }

    pub fn max_height(&self) -> f32 {
        self.uniform_scale * self.height_multiplier * self.height_curve.evaluate(1.0)
    }

    pub(crate) fn sanitized(&self) -> Self {
        let mut out = self.clone();
        if !(out.uniform_scale.is_finite() && out.uniform_scale > MIN_UNIFORM_SCALE) {
            out.uniform_scale = MIN_UNIFORM_SCALE;
        }
        if !out.height_multiplier.is_finite() {
            out.height_multiplier = default_height_multiplier();
        }
        out.regions
            .sort_by(|a, b| a.height.total_cmp(&b.height));
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LodInfo {
    pub lod: u32,
    pub visible_dist_threshold: f32,
    #[serde(default)]
    pub use_for_collider: bool,
}

impl LodInfo {
    #[inline]
    pub const fn new(lod: u32, visible_dist_threshold: f32, use_for_collider: bool) -> Self {
        Self {
            lod,
            visible_dist_threshold,
            use_for_collider,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_lods")]
    pub lods: Vec<LodInfo>,
    #[serde(default = "default_viewer_move_threshold")]
    pub viewer_move_threshold: f32,
    /// Worker threads for generation; 0 picks from available parallelism.
    #[serde(default)]
    pub workers: usize,
}
fn default_lods() -> Vec<LodInfo> {
    vec![
        LodInfo::new(0, 200.0, true),
        LodInfo::new(2, 400.0, false),
        LodInfo::new(4, 600.0, false),
    ]
}
fn default_viewer_move_threshold() -> f32 {
    25.0
}
impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            lods: default_lods(),
            viewer_move_threshold: default_viewer_move_threshold(),
            workers: 0,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {}", e),
            ConfigError::Parse(e) => write!(f, "config parse failed: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

pub fn parse_config(s: &str) -> Result<StrataConfig, ConfigError> {
    Ok(toml::from_str(s)?)
}

pub fn load_config_from_path(path: &Path) -> Result<StrataConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_noise::NormalizeMode;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.terrain.map_chunk_size(), MAP_CHUNK_SIZE);
        assert_eq!(cfg.noise.scale, 28.0);
        assert_eq!(cfg.noise.normalize_mode, NormalizeMode::Global);
        assert_eq!(cfg.streaming.lods.len(), 3);
        assert_eq!(cfg.streaming.viewer_move_threshold, 25.0);
    }

    #[test]
    fn parses_full_document() {
        let cfg = parse_config(
            r#"
            [terrain]
            flat_shading = true
            falloff = true
            height_multiplier = 30.0
            height_curve = { keys = [{ time = 0.0, value = 0.0 }, { time = 0.3, value = 0.0 }, { time = 1.0, value = 1.0 }] }

            [[terrain.regions]]
            name = "water"
            height = 0.3
            color = [40, 80, 200]

            [noise]
            seed = 42
            octaves = 5
            normalize_mode = "local"
            offset = { x = 3.0, y = -2.0 }

            [streaming]
            viewer_move_threshold = 10.0
            workers = 2

            [[streaming.lods]]
            lod = 0
            visible_dist_threshold = 150.0
            use_for_collider = true

            [[streaming.lods]]
            lod = 3
            visible_dist_threshold = 300.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.terrain.map_chunk_size(), FLAT_SHADED_CHUNK_SIZE);
        assert!(cfg.terrain.falloff);
        assert_eq!(cfg.terrain.height_curve.evaluate(0.2), 0.0);
        assert_eq!(cfg.terrain.regions[0].name, "water");
        assert_eq!(cfg.noise.seed, 42);
        assert_eq!(cfg.noise.normalize_mode, NormalizeMode::Local);
        assert_eq!(cfg.noise.offset.y, -2.0);
        assert_eq!(cfg.streaming.workers, 2);
        assert_eq!(cfg.streaming.lods[1], LodInfo::new(3, 300.0, false));
    }

    #[test]
    fn rejects_malformed_document() {
        let err = parse_config("[noise]\nseed = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn height_range_follows_curve_and_scale() {
        let t = TerrainConfig::default();
        assert_eq!(t.min_height(), 0.0);
        assert_eq!(t.max_height(), 25.0);
    }

    #[test]
    fn chunk_size_override_wins() {
        let t = TerrainConfig {
            chunk_size: Some(31),
            flat_shading: true,
            ..TerrainConfig::default()
        };
        assert_eq!(t.map_chunk_size(), 31);
    }
}
