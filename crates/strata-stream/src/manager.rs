use hashbrown::{HashMap, HashSet};
use std::sync::Arc;
use strata_geom::{Vec2, Vec3};
use strata_mesh::MeshData;
use strata_runtime::Dispatch;
use strata_world::{ChunkCoord, GenSettings, StreamingConfig, TerrainGenerator};

use crate::chunk::{ChunkTicket, MeshState, TerrainChunk};
use crate::lod::{LodTable, StreamError};
use crate::sink::ChunkSink;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: usize,
    pub visible: usize,
    pub maps_requested: u64,
    pub meshes_requested: u64,
    pub stale_dropped: u64,
    pub mesh_failures: u64,
    pub epoch: u64,
}

struct Geometry {
    lods: LodTable,
    // Distance between neighbouring chunk centers, in samples.
    chunk_size: usize,
    uniform_scale: f32,
    view_radius: i32,
    max_view_sq: f32,
    height_range: (f32, f32),
}

impl Geometry {
    fn resolve(settings: &GenSettings, streaming: &StreamingConfig) -> Result<Self, StreamError> {
        let interior = settings.map_chunk_size();
        let lods = LodTable::for_settings(settings, streaming)?;
        let max_view = lods.max_view_distance();
        let view_radius = lods.view_radius(interior);
        let terrain = &settings.terrain;
        Ok(Self {
            lods,
            chunk_size: interior - 1,
            uniform_scale: terrain.uniform_scale,
            view_radius,
            max_view_sq: max_view * max_view,
            height_range: (terrain.min_height(), terrain.max_height()),
        })
    }
}

/// Keeps the chunks around a viewer generated, meshed at the right detail, and shown.
///
/// Owns every chunk. All mutation happens on the thread calling [`tick`](Self::tick);
/// background work only comes back through the dispatcher's drains.
pub struct ChunkStreamingManager<D: Dispatch<ChunkTicket>, S: ChunkSink> {
    generator: Arc<TerrainGenerator>,
    dispatch: D,
    sink: S,
    geometry: Geometry,
    move_threshold_sq: f32,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible_last_update: HashSet<ChunkCoord>,
    viewer: Vec2,
    viewer_old: Option<Vec2>,
    epoch: u64,
    stats: StreamStats,
}

impl<D: Dispatch<ChunkTicket>, S: ChunkSink> ChunkStreamingManager<D, S> {
    pub fn new(
        generator: Arc<TerrainGenerator>,
        streaming: &StreamingConfig,
        dispatch: D,
        mut sink: S,
    ) -> Result<Self, StreamError> {
        let geometry = Geometry::resolve(&generator.snapshot(), streaming)?;
        let (min, max) = geometry.height_range;
        sink.set_height_range(min, max);
        let threshold = streaming.viewer_move_threshold.max(0.0);
        log::info!(
            "streaming {} lod level(s), chunk size {}, window radius {}",
            geometry.lods.len(),
            geometry.chunk_size,
            geometry.view_radius
        );
        Ok(Self {
            generator,
            dispatch,
            sink,
            geometry,
            move_threshold_sq: threshold * threshold,
            chunks: HashMap::new(),
            visible_last_update: HashSet::new(),
            viewer: Vec2::ZERO,
            viewer_old: None,
            epoch: 0,
            stats: StreamStats::default(),
        })
    }

    /// One update: apply finished work, then move the window if the viewer moved.
    pub fn tick(&mut self, viewer_world: Vec3) {
        self.apply_map_results();
        self.apply_mesh_results();

        self.viewer = viewer_world.xz() / self.geometry.uniform_scale;
        let moved = match self.viewer_old {
            None => true,
            Some(old) => (old - self.viewer).length_sq() > self.move_threshold_sq,
        };
        if moved {
            self.viewer_old = Some(self.viewer);
            self.update_visible_chunks();
        }
    }

    /// Drops every chunk and starts a new epoch; results still in flight are
    /// discarded when they arrive. The next tick rebuilds the window.
    pub fn reset(&mut self) -> Result<(), StreamError> {
        let streaming = StreamingConfig {
            lods: self.geometry.lods.levels().to_vec(),
            viewer_move_threshold: self.move_threshold_sq.sqrt(),
            workers: 0,
        };
        self.reconfigure(&streaming)
    }

    /// Like [`reset`](Self::reset) with a new streaming configuration. On error
    /// nothing changes.
    pub fn reconfigure(&mut self, streaming: &StreamingConfig) -> Result<(), StreamError> {
        let geometry = Geometry::resolve(&self.generator.snapshot(), streaming)?;
        self.commit(geometry, streaming);
        Ok(())
    }

    /// Installs new generation settings in the shared generator and restarts the
    /// stream. `settings` and `streaming` are checked together first; on error
    /// neither the generator nor the stream changes.
    pub fn apply_settings(
        &mut self,
        settings: GenSettings,
        streaming: &StreamingConfig,
    ) -> Result<(), StreamError> {
        let geometry = Geometry::resolve(&settings, streaming)?;
        self.generator.update_settings(settings);
        self.commit(geometry, streaming);
        Ok(())
    }

    fn commit(&mut self, geometry: Geometry, streaming: &StreamingConfig) {
        for coord in self.chunks.keys() {
            self.sink.remove_chunk(*coord);
        }
        self.chunks.clear();
        self.visible_last_update.clear();
        self.viewer_old = None;
        self.geometry = geometry;
        let threshold = streaming.viewer_move_threshold.max(0.0);
        self.move_threshold_sq = threshold * threshold;
        self.epoch += 1;
        let (min, max) = self.geometry.height_range;
        self.sink.set_height_range(min, max);
        log::info!("terrain streaming reset, epoch {}", self.epoch);
    }

    fn ticket(&self, coord: ChunkCoord, lod: Option<usize>) -> ChunkTicket {
        ChunkTicket {
            coord,
            epoch: self.epoch,
            lod,
        }
    }

    fn is_stale(&mut self, ticket: &ChunkTicket) -> bool {
        if ticket.epoch != self.epoch || !self.chunks.contains_key(&ticket.coord) {
            log::debug!(
                "dropped stale result for {:?} (epoch {} vs {})",
                ticket.coord,
                ticket.epoch,
                self.epoch
            );
            self.stats.stale_dropped += 1;
            return true;
        }
        false
    }

    fn apply_map_results(&mut self) {
        for res in self.dispatch.drain_maps() {
            if self.is_stale(&res.key) {
                continue;
            }
            let coord = res.key.coord;
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                self.sink.install_texture(coord, &res.payload);
                chunk.map_data = Some(res.payload);
            }
            self.update_chunk(coord);
        }
    }

    fn apply_mesh_results(&mut self) {
        for res in self.dispatch.drain_meshes() {
            if self.is_stale(&res.key) {
                continue;
            }
            let ChunkTicket { coord, lod, .. } = res.key;
            let Some(index) = lod else {
                continue;
            };
            match res.payload {
                Ok(mesh) => {
                    if let Some(slot) = self
                        .chunks
                        .get_mut(&coord)
                        .and_then(|c| c.lod_meshes.get_mut(index))
                    {
                        *slot = MeshState::Ready(Arc::new(mesh));
                    }
                    self.update_chunk(coord);
                }
                Err(e) => {
                    self.stats.mesh_failures += 1;
                    log::error!("mesh for chunk {:?} lod index {} failed: {}", coord, index, e);
                }
            }
        }
    }

    fn update_visible_chunks(&mut self) {
        for coord in self.visible_last_update.drain() {
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                if chunk.visible {
                    chunk.visible = false;
                    self.sink.set_visible(coord, false);
                }
            }
        }

        let chunk_size = self.geometry.chunk_size as f32;
        let current = ChunkCoord::containing(self.viewer, chunk_size);
        let r = self.geometry.view_radius;
        for dz in -r..=r {
            for dx in -r..=r {
                let coord = current.offset(dx, dz);
                if self.chunks.contains_key(&coord) {
                    self.update_chunk(coord);
                } else {
                    self.create_chunk(coord);
                }
            }
        }
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let chunk_size = self.geometry.chunk_size as f32;
        let chunk = TerrainChunk::new(coord, chunk_size, self.geometry.lods.len());
        let position = chunk.position;
        let scale = self.geometry.uniform_scale;
        self.chunks.insert(coord, chunk);
        self.sink.place_chunk(
            coord,
            Vec3::new(position.x * scale, 0.0, position.y * scale),
            scale,
        );
        let ticket = self.ticket(coord, None);
        self.dispatch.request_map(ticket, position);
        self.stats.maps_requested += 1;
        log::debug!("chunk {:?} created at {:?}", coord, position);
    }

    // Visibility, LOD choice, and mesh/collider requests for one chunk.
    fn update_chunk(&mut self, coord: ChunkCoord) {
        let epoch = self.epoch;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let Some(map) = chunk.map_data.clone() else {
            return;
        };
        let lods = &self.geometry.lods;
        let sqr = chunk.bounds.sqr_distance(self.viewer);
        let visible = sqr <= self.geometry.max_view_sq;

        if visible {
            let lod_index = lods.select(sqr);
            if chunk.displayed_lod != Some(lod_index) {
                let ticket = ChunkTicket {
                    coord,
                    epoch,
                    lod: Some(lod_index),
                };
                let level = lods.levels()[lod_index].lod;
                let ready = ensure_mesh(&mut chunk.lod_meshes[lod_index], || {
                    self.dispatch.request_mesh(ticket, Arc::clone(&map), level);
                    self.stats.meshes_requested += 1;
                });
                if let Some(mesh) = ready {
                    log::debug!(
                        "chunk {:?} lod {:?} -> {}",
                        coord,
                        chunk.displayed_lod,
                        lod_index
                    );
                    chunk.displayed_lod = Some(lod_index);
                    self.sink.install_mesh(coord, lod_index, &mesh);
                }
            }

            if let Some(ci) = lods.collider_index().filter(|_| lod_index == 0) {
                let ticket = ChunkTicket {
                    coord,
                    epoch,
                    lod: Some(ci),
                };
                let level = lods.levels()[ci].lod;
                let ready = ensure_mesh(&mut chunk.lod_meshes[ci], || {
                    self.dispatch.request_mesh(ticket, Arc::clone(&map), level);
                    self.stats.meshes_requested += 1;
                });
                if let Some(mesh) = ready {
                    if chunk.collider != Some(ci) {
                        chunk.collider = Some(ci);
                        self.sink.install_collider(coord, &mesh);
                    }
                }
            }
            self.visible_last_update.insert(coord);
        } else {
            self.visible_last_update.remove(&coord);
        }

        if chunk.visible != visible {
            chunk.visible = visible;
            self.sink.set_visible(coord, visible);
        }
    }

    #[inline]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunks shown after the latest update, in no particular order.
    pub fn visible_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.visible_last_update.iter().copied()
    }

    /// Viewer position in chunk space as of the last tick.
    #[inline]
    pub fn viewer_position(&self) -> Vec2 {
        self.viewer
    }

    #[inline]
    pub fn lods(&self) -> &LodTable {
        &self.geometry.lods
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.geometry.chunk_size
    }

    #[inline]
    pub fn view_radius(&self) -> i32 {
        self.geometry.view_radius
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            chunks: self.chunks.len(),
            visible: self.visible_last_update.len(),
            epoch: self.epoch,
            ..self.stats
        }
    }

    #[inline]
    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Ready mesh for a slot, or issues the one request the slot will ever make.
fn ensure_mesh(slot: &mut MeshState, request: impl FnOnce()) -> Option<Arc<MeshData>> {
    match slot {
        MeshState::Ready(mesh) => Some(Arc::clone(mesh)),
        MeshState::NotRequested => {
            *slot = MeshState::Requested;
            request();
            None
        }
        MeshState::Requested => None,
    }
}
