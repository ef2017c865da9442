use std::sync::Arc;
use strata_geom::Vec2;
use strata_mesh::{MeshData, MeshError, generate_terrain_mesh};
use strata_world::{GenSettings, MapData, TerrainGenerator};

use crate::queue::{PendingResult, ResultQueue};

pub type MeshResult = Result<MeshData, MeshError>;

/// Where map and mesh requests go, and where their results come back from.
///
/// Requests never block. Every request yields exactly one result carrying the
/// same key, delivered through the matching `drain_*` call.
pub trait Dispatch<K> {
    fn request_map(&self, key: K, center: Vec2);
    fn request_mesh(&self, key: K, map: Arc<MapData>, lod: u32);
    fn drain_maps(&self) -> Vec<PendingResult<K, Arc<MapData>>>;
    fn drain_meshes(&self) -> Vec<PendingResult<K, MeshResult>>;
}

pub(crate) fn run_map_job(
    generator: &TerrainGenerator,
    settings: &GenSettings,
    center: Vec2,
) -> Arc<MapData> {
    Arc::new(generator.generate_map_data_with(settings, center))
}

pub(crate) fn run_mesh_job(settings: &GenSettings, map: &MapData, lod: u32) -> MeshResult {
    let terrain = &settings.terrain;
    generate_terrain_mesh(
        &map.height_map,
        terrain.height_multiplier,
        &terrain.height_curve,
        lod,
        terrain.flat_shading,
    )
}

/// Computes every request on the calling thread before returning.
pub struct InlineDispatch<K> {
    generator: Arc<TerrainGenerator>,
    maps: ResultQueue<K, Arc<MapData>>,
    meshes: ResultQueue<K, MeshResult>,
}

impl<K> InlineDispatch<K> {
    pub fn new(generator: Arc<TerrainGenerator>) -> Self {
        Self {
            generator,
            maps: ResultQueue::new(),
            meshes: ResultQueue::new(),
        }
    }

    #[inline]
    pub fn generator(&self) -> &Arc<TerrainGenerator> {
        &self.generator
    }
}

impl<K> Dispatch<K> for InlineDispatch<K> {
    fn request_map(&self, key: K, center: Vec2) {
        let settings = self.generator.snapshot();
        let map = run_map_job(&self.generator, &settings, center);
        self.maps.push(key, map);
    }

    fn request_mesh(&self, key: K, map: Arc<MapData>, lod: u32) {
        let settings = self.generator.snapshot();
        self.meshes.push(key, run_mesh_job(&settings, &map, lod));
    }

    fn drain_maps(&self) -> Vec<PendingResult<K, Arc<MapData>>> {
        self.maps.drain()
    }

    fn drain_meshes(&self) -> Vec<PendingResult<K, MeshResult>> {
        self.meshes.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::{StrataConfig, TerrainConfig};

    fn small_generator() -> Arc<TerrainGenerator> {
        let cfg = StrataConfig {
            terrain: TerrainConfig {
                chunk_size: Some(15),
                ..TerrainConfig::default()
            },
            ..StrataConfig::default()
        };
        Arc::new(TerrainGenerator::from_config(&cfg))
    }

    #[test]
    fn inline_results_are_ready_immediately() {
        let d = InlineDispatch::new(small_generator());
        d.request_map("a", Vec2::ZERO);
        let maps = d.drain_maps();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].key, "a");
        d.request_mesh("a", Arc::clone(&maps[0].payload), 2);
        let meshes = d.drain_meshes();
        assert_eq!(meshes.len(), 1);
        assert!(meshes[0].payload.is_ok());
    }

    #[test]
    fn degenerate_lod_comes_back_as_error() {
        let d = InlineDispatch::new(small_generator());
        d.request_map(0u8, Vec2::ZERO);
        let map = d.drain_maps().remove(0).payload;
        d.request_mesh(0u8, map, 40);
        let out = d.drain_meshes().remove(0);
        assert!(matches!(out.payload, Err(MeshError::DegenerateLod { lod: 40, .. })));
    }
}
