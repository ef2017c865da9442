use strata_geom::{Vec2, Vec3};

/// Interleaved-by-component vertex arrays for a display backend.
///
/// Indices are `u32`: a full-detail chunk has more than `u16::MAX` vertices.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct RenderBuffers {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
}

impl RenderBuffers {
    #[inline]
    pub fn reserve_vertices(&mut self, vertices: usize, indices: usize) {
        self.pos.reserve(vertices * 3);
        self.norm.reserve(vertices * 3);
        self.uv.reserve(vertices * 2);
        self.idx.reserve(indices);
    }

    #[inline]
    pub fn push_vertex(&mut self, p: Vec3, n: Vec3, uv: Vec2) {
        self.pos.extend_from_slice(&[p.x, p.y, p.z]);
        self.norm.extend_from_slice(&[n.x, n.y, n.z]);
        self.uv.extend_from_slice(&[uv.x, uv.y]);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    /// Wavefront OBJ text: positions, uvs, normals, and 1-based `v/vt/vn` faces.
    pub fn to_obj(&self) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(self.pos.len() * 12 + self.idx.len() * 8);
        for p in self.pos.chunks_exact(3) {
            let _ = writeln!(out, "v {} {} {}", p[0], p[1], p[2]);
        }
        for t in self.uv.chunks_exact(2) {
            let _ = writeln!(out, "vt {} {}", t[0], t[1]);
        }
        for n in self.norm.chunks_exact(3) {
            let _ = writeln!(out, "vn {} {} {}", n[0], n[1], n[2]);
        }
        for tri in self.idx.chunks_exact(3) {
            let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
            let _ = writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
        }
        out
    }
}
