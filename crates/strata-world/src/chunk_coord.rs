use serde::{Deserialize, Serialize};
use strata_geom::Vec2;

/// Integer chunk address on the terrain plane (`cz` runs along world z).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// Chunk containing `p` when chunks are `chunk_size` apart and centred on
    /// multiples of it.
    #[inline]
    pub fn containing(p: Vec2, chunk_size: f32) -> Self {
        Self {
            cx: (p.x / chunk_size).round() as i32,
            cz: (p.y / chunk_size).round() as i32,
        }
    }

    /// Center of this chunk in chunk space.
    #[inline]
    pub fn position(self, chunk_size: f32) -> Vec2 {
        Vec2::new(self.cx as f32 * chunk_size, self.cz as f32 * chunk_size)
    }
}
