use strata_geom::{Vec2, Vec3};

use crate::index::VertexIndex;
use crate::mesh_build::RenderBuffers;

#[inline]
fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalized()
}

/// Accumulates one chunk's vertices and triangles; [`finish`](Self::finish)
/// computes normals and hands back an immutable [`MeshData`].
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    border_vertices: Vec<Vec3>,
    border_triangles: Vec<[VertexIndex; 3]>,
    flat_shading: bool,
}

impl MeshBuilder {
    /// Sized for an `n x n` rendered grid with its `4n + 4` border ring.
    pub fn new(vertices_per_line: usize, flat_shading: bool) -> Self {
        let n = vertices_per_line;
        let quads = n.saturating_sub(1) * n.saturating_sub(1);
        Self {
            vertices: vec![Vec3::ZERO; n * n],
            uvs: vec![Vec2::ZERO; n * n],
            triangles: Vec::with_capacity(quads * 6),
            border_vertices: vec![Vec3::ZERO; 4 * n + 4],
            border_triangles: Vec::with_capacity(8 * n),
            flat_shading,
        }
    }

    /// Writes a vertex slot. Border vertices keep no uv. Out-of-range slots are ignored.
    pub fn add_vertex(&mut self, index: VertexIndex, position: Vec3, uv: Vec2) {
        match index {
            VertexIndex::Interior(i) => {
                let i = i as usize;
                if let (Some(v), Some(t)) = (self.vertices.get_mut(i), self.uvs.get_mut(i)) {
                    *v = position;
                    *t = uv;
                }
            }
            VertexIndex::Border(p) => {
                if let Some(v) = self.border_vertices.get_mut(p as usize) {
                    *v = position;
                }
            }
        }
    }

    /// Routes the triangle to the border list when any corner is a border vertex.
    pub fn add_triangle(&mut self, a: VertexIndex, b: VertexIndex, c: VertexIndex) {
        match (a, b, c) {
            (VertexIndex::Interior(a), VertexIndex::Interior(b), VertexIndex::Interior(c)) => {
                self.triangles.extend_from_slice(&[a, b, c]);
            }
            _ => self.border_triangles.push([a, b, c]),
        }
    }

    #[inline]
    fn position(&self, index: VertexIndex) -> Vec3 {
        match index {
            VertexIndex::Interior(i) => self.vertices.get(i as usize).copied(),
            VertexIndex::Border(p) => self.border_vertices.get(p as usize).copied(),
        }
        .unwrap_or(Vec3::ZERO)
    }

    fn smooth_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.triangles.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| self.vertices[i as usize]);
            let n = face_normal(a, b, c);
            for &i in tri {
                normals[i as usize] += n;
            }
        }
        for tri in &self.border_triangles {
            let n = face_normal(
                self.position(tri[0]),
                self.position(tri[1]),
                self.position(tri[2]),
            );
            for idx in tri {
                if let VertexIndex::Interior(i) = *idx {
                    if let Some(slot) = normals.get_mut(i as usize) {
                        *slot += n;
                    }
                }
            }
        }
        for n in &mut normals {
            *n = n.normalized();
        }
        normals
    }

    pub fn finish(self) -> MeshData {
        if self.flat_shading {
            return self.finish_flat();
        }
        let normals = self.smooth_normals();
        MeshData {
            vertices: self.vertices,
            normals,
            uvs: self.uvs,
            triangles: self.triangles,
            border_vertices: self.border_vertices,
            border_triangles: self.border_triangles,
            flat_shading: false,
        }
    }

    // One unique vertex per triangle corner so every face keeps its own normal.
    fn finish_flat(self) -> MeshData {
        let count = self.triangles.len();
        let mut vertices = Vec::with_capacity(count);
        let mut uvs = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        for tri in self.triangles.chunks_exact(3) {
            let corners = [tri[0], tri[1], tri[2]].map(|i| i as usize);
            let [a, b, c] = corners.map(|i| self.vertices[i]);
            let n = face_normal(a, b, c);
            for (pos, i) in [a, b, c].into_iter().zip(corners) {
                vertices.push(pos);
                uvs.push(self.uvs[i]);
                normals.push(n);
            }
        }
        MeshData {
            vertices,
            normals,
            uvs,
            triangles: (0..count as u32).collect(),
            border_vertices: Vec::new(),
            border_triangles: Vec::new(),
            flat_shading: true,
        }
    }
}

/// Finished chunk geometry. Rendered triangles index interior vertices only.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<u32>,
    border_vertices: Vec<Vec3>,
    border_triangles: Vec<[VertexIndex; 3]>,
    flat_shading: bool,
}

impl MeshData {
    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    #[inline]
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    #[inline]
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    #[inline]
    pub fn border_vertices(&self) -> &[Vec3] {
        &self.border_vertices
    }

    #[inline]
    pub fn border_triangles(&self) -> &[[VertexIndex; 3]] {
        &self.border_triangles
    }

    #[inline]
    pub fn is_flat_shaded(&self) -> bool {
        self.flat_shading
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Flattened buffers ready for upload.
    pub fn to_render_buffers(&self) -> RenderBuffers {
        let mut out = RenderBuffers::default();
        out.reserve_vertices(self.vertices.len(), self.triangles.len());
        for ((p, n), uv) in self.vertices.iter().zip(&self.normals).zip(&self.uvs) {
            out.push_vertex(*p, *n, *uv);
        }
        out.idx.extend_from_slice(&self.triangles);
        out
    }
}
