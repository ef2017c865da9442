use std::sync::Arc;
use strata_geom::{Bounds2, Vec2};
use strata_mesh::MeshData;
use strata_world::{ChunkCoord, MapData};

/// Completion key for every request the manager dispatches.
///
/// `lod` is `None` for the chunk's map and the LOD table index for a mesh.
/// Results whose `epoch` is behind the manager's are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkTicket {
    pub coord: ChunkCoord,
    pub epoch: u64,
    pub lod: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub enum MeshState {
    #[default]
    NotRequested,
    Requested,
    Ready(Arc<MeshData>),
}

impl MeshState {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, MeshState::Ready(_))
    }

    #[inline]
    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        match self {
            MeshState::Ready(m) => Some(m),
            _ => None,
        }
    }
}

/// One streamed tile. Cached and hidden when out of range, never rebuilt.
#[derive(Debug)]
pub struct TerrainChunk {
    pub(crate) coord: ChunkCoord,
    pub(crate) position: Vec2,
    pub(crate) bounds: Bounds2,
    pub(crate) lod_meshes: Vec<MeshState>,
    pub(crate) map_data: Option<Arc<MapData>>,
    pub(crate) displayed_lod: Option<usize>,
    pub(crate) collider: Option<usize>,
    pub(crate) visible: bool,
}

impl TerrainChunk {
    pub(crate) fn new(coord: ChunkCoord, chunk_size: f32, lod_count: usize) -> Self {
        let position = coord.position(chunk_size);
        Self {
            coord,
            position,
            bounds: Bounds2::from_center_size(position, Vec2::new(chunk_size, chunk_size)),
            lod_meshes: vec![MeshState::NotRequested; lod_count],
            map_data: None,
            displayed_lod: None,
            collider: None,
            visible: false,
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Center in chunk space (before uniform scale).
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2 {
        self.bounds
    }

    #[inline]
    pub fn map_data(&self) -> Option<&Arc<MapData>> {
        self.map_data.as_ref()
    }

    #[inline]
    pub fn has_map(&self) -> bool {
        self.map_data.is_some()
    }

    #[inline]
    pub fn mesh_state(&self, lod_index: usize) -> Option<&MeshState> {
        self.lod_meshes.get(lod_index)
    }

    /// `None` until a mesh has been shown.
    #[inline]
    pub fn displayed_lod(&self) -> Option<usize> {
        self.displayed_lod
    }

    #[inline]
    pub fn collider_lod(&self) -> Option<usize> {
        self.collider
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
