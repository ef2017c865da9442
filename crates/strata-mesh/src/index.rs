/// Vertex reference inside a [`MeshBuilder`](crate::MeshBuilder).
///
/// Border vertices sit one sample outside the chunk and are never rendered;
/// they only contribute to the normals of the outermost rendered vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexIndex {
    Interior(u32),
    Border(u32),
}

impl VertexIndex {
    #[inline]
    pub fn is_border(self) -> bool {
        matches!(self, VertexIndex::Border(_))
    }

    /// Signed key: interior indices are themselves, border `p` is `-(p + 1)`.
    #[inline]
    pub fn encode(self) -> i64 {
        match self {
            VertexIndex::Interior(i) => i64::from(i),
            VertexIndex::Border(p) => -(i64::from(p) + 1),
        }
    }

    /// `None` when the key does not fit a `u32` slot.
    #[inline]
    pub fn decode(key: i64) -> Option<Self> {
        if key < 0 {
            u32::try_from(-key - 1).ok().map(VertexIndex::Border)
        } else {
            u32::try_from(key).ok().map(VertexIndex::Interior)
        }
    }
}
