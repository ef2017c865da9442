use std::sync::Arc;
use strata_geom::Vec3;
use strata_mesh::MeshData;
use strata_world::{ChunkCoord, MapData};

/// Display side of the streaming manager. Every hook defaults to a no-op.
pub trait ChunkSink {
    /// A chunk was created; `origin` is its world-space center, `scale` the uniform scale.
    fn place_chunk(&mut self, _coord: ChunkCoord, _origin: Vec3, _scale: f32) {}
    /// World-space height span of every mesh under the current settings, for
    /// height-based material shading. Sent on construction and after each reset.
    fn set_height_range(&mut self, _min: f32, _max: f32) {}
    fn set_visible(&mut self, _coord: ChunkCoord, _visible: bool) {}
    fn install_mesh(&mut self, _coord: ChunkCoord, _lod_index: usize, _mesh: &Arc<MeshData>) {}
    fn install_collider(&mut self, _coord: ChunkCoord, _mesh: &Arc<MeshData>) {}
    fn install_texture(&mut self, _coord: ChunkCoord, _map: &Arc<MapData>) {}
    /// The chunk was discarded by a reset.
    fn remove_chunk(&mut self, _coord: ChunkCoord) {}
}

/// Sink that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ChunkSink for NullSink {}
