//! Chunk streaming around a moving viewer: window, LOD selection, and result application.
#![forbid(unsafe_code)]

mod chunk;
mod lod;
mod manager;
mod sink;

pub use chunk::{ChunkTicket, MeshState, TerrainChunk};
pub use lod::{LodTable, MAX_VIEW_RADIUS, StreamError};
pub use manager::{ChunkStreamingManager, StreamStats};
pub use sink::{ChunkSink, NullSink};
