//! CPU terrain meshing: height map to LOD triangle mesh with seam-free normals.
#![forbid(unsafe_code)]

mod builder;
mod index;
mod mesh_build;
mod terrain;

pub use builder::{MeshBuilder, MeshData};
pub use index::VertexIndex;
pub use mesh_build::RenderBuffers;
pub use terrain::{MeshError, generate_terrain_mesh, lod_skip, sample_positions, validate_lod};
