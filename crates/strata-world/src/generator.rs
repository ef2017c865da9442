use std::sync::{Arc, Mutex, RwLock};
use strata_geom::Vec2;
use strata_noise::{FalloffMap, NoiseConfig, NoiseField};

use crate::config::{StrataConfig, TerrainConfig};
use crate::height_map::{HeightMap, MAP_BORDER, MapData};
use crate::texture::color_map_from_height_map;

/// Immutable generation snapshot shared by every worker.
pub struct GenSettings {
    pub terrain: TerrainConfig,
    pub noise: NoiseConfig,
    field: NoiseField,
}

impl GenSettings {
    pub fn new(terrain: &TerrainConfig, noise: &NoiseConfig) -> Self {
        let noise = noise.sanitized();
        let field = NoiseField::new(&noise);
        Self {
            terrain: terrain.sanitized(),
            noise,
            field,
        }
    }

    pub fn from_config(cfg: &StrataConfig) -> Self {
        Self::new(&cfg.terrain, &cfg.noise)
    }

    #[inline]
    pub fn noise_field(&self) -> &NoiseField {
        &self.field
    }

    #[inline]
    pub fn map_chunk_size(&self) -> usize {
        self.terrain.map_chunk_size()
    }
}

impl Default for GenSettings {
    fn default() -> Self {
        Self::new(&TerrainConfig::default(), &NoiseConfig::default())
    }
}

/// Bordered `(chunk_size + 2)^2` height map centred on `center`.
///
/// A falloff map whose size does not match the bordered size is ignored.
pub fn generate_height_map(
    noise: &NoiseField,
    chunk_size: usize,
    center: Vec2,
    falloff: Option<&FalloffMap>,
) -> HeightMap {
    let size = chunk_size + MAP_BORDER;
    let grid = noise.generate(size, size, center);
    let mut map = HeightMap::from(grid);
    if let Some(f) = falloff.filter(|f| f.size() == size) {
        for y in 0..size {
            for x in 0..size {
                let v = (map.get(x, y) - f.get(x, y)).clamp(0.0, 1.0);
                map.set(x, y, v);
            }
        }
    }
    map
}

/// Shared height sampler; hands out settings snapshots and caches the falloff map.
pub struct TerrainGenerator {
    settings: RwLock<Arc<GenSettings>>,
    falloff: Mutex<Option<Arc<FalloffMap>>>,
}

impl TerrainGenerator {
    pub fn new(settings: GenSettings) -> Self {
        Self {
            settings: RwLock::new(Arc::new(settings)),
            falloff: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &StrataConfig) -> Self {
        Self::new(GenSettings::from_config(cfg))
    }

    pub fn snapshot(&self) -> Arc<GenSettings> {
        let guard = match self.settings.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&*guard)
    }

    /// Swaps in a new snapshot. Requests already running keep the old one.
    pub fn update_settings(&self, settings: GenSettings) {
        log::info!(
            "terrain settings updated: seed={} octaves={} chunk={} falloff={}",
            settings.noise.seed,
            settings.noise.octaves,
            settings.map_chunk_size(),
            settings.terrain.falloff
        );
        match self.settings.write() {
            Ok(mut g) => *g = Arc::new(settings),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(settings),
        }
    }

    #[inline]
    pub fn map_chunk_size(&self) -> usize {
        self.snapshot().map_chunk_size()
    }

    /// Falloff map for a bordered `size`, rebuilt only when the size changes.
    pub fn falloff_map(&self, size: usize) -> Arc<FalloffMap> {
        let mut cache = match self.falloff.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        match cache.as_ref() {
            Some(map) if map.size() == size => Arc::clone(map),
            _ => {
                log::debug!("falloff map rebuilt for size {}", size);
                let map = Arc::new(FalloffMap::generate(size));
                *cache = Some(Arc::clone(&map));
                map
            }
        }
    }

    pub fn generate_map_data(&self, center: Vec2) -> MapData {
        let settings = self.snapshot();
        self.generate_map_data_with(&settings, center)
    }

    /// Same as [`generate_map_data`](Self::generate_map_data) against a
    /// caller-held snapshot.
    pub fn generate_map_data_with(&self, settings: &GenSettings, center: Vec2) -> MapData {
        let chunk_size = settings.map_chunk_size();
        let falloff = settings
            .terrain
            .falloff
            .then(|| self.falloff_map(chunk_size + MAP_BORDER));
        let height_map =
            generate_height_map(settings.noise_field(), chunk_size, center, falloff.as_deref());
        let color_map = color_map_from_height_map(&height_map, &settings.terrain.regions);
        MapData {
            height_map,
            color_map,
        }
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new(GenSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(falloff: bool) -> GenSettings {
        let terrain = TerrainConfig {
            chunk_size: Some(15),
            falloff,
            ..TerrainConfig::default()
        };
        GenSettings::new(&terrain, &NoiseConfig::default())
    }

    #[test]
    fn falloff_cache_follows_size() {
        let g = TerrainGenerator::default();
        let a = g.falloff_map(17);
        let b = g.falloff_map(17);
        assert!(Arc::ptr_eq(&a, &b));
        let c = g.falloff_map(33);
        assert_eq!(c.size(), 33);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn update_replaces_snapshot_but_not_held_ones() {
        let g = TerrainGenerator::new(small(false));
        let held = g.snapshot();
        g.update_settings(small(true));
        assert!(!held.terrain.falloff);
        assert!(g.snapshot().terrain.falloff);
    }

    #[test]
    fn map_data_has_bordered_heights_and_interior_colors() {
        let g = TerrainGenerator::new(small(true));
        let data = g.generate_map_data(Vec2::ZERO);
        assert_eq!(data.height_map.width(), 17);
        assert_eq!(data.height_map.height(), 17);
        assert_eq!(data.color_map.width, 15);
        assert_eq!(data.color_map.colors.len(), 15 * 15);
    }

    #[test]
    fn falloff_of_wrong_size_is_ignored() {
        let settings = small(false);
        let wrong = FalloffMap::generate(8);
        let plain = generate_height_map(settings.noise_field(), 15, Vec2::ZERO, None);
        let with = generate_height_map(settings.noise_field(), 15, Vec2::ZERO, Some(&wrong));
        assert_eq!(plain, with);
    }
}
