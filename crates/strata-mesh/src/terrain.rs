use std::fmt;
use strata_geom::{Vec2, Vec3};
use strata_world::{HeightCurve, HeightMap};

use crate::builder::{MeshBuilder, MeshData};
use crate::index::VertexIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshError {
    /// Map is not square or has fewer than 2 interior samples per axis.
    InvalidMap { width: usize, height: usize },
    /// The LOD step is wider than the chunk itself.
    DegenerateLod { lod: u32, interior: usize },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::InvalidMap { width, height } => {
                write!(f, "height map {}x{} is not a meshable square", width, height)
            }
            MeshError::DegenerateLod { lod, interior } => write!(
                f,
                "lod {} (skip {}) is too coarse for {} interior samples",
                lod,
                lod_skip(*lod),
                interior
            ),
        }
    }
}

impl std::error::Error for MeshError {}

/// Sample stride for a detail level: 1 at LOD 0, otherwise `2 * lod`.
#[inline]
pub fn lod_skip(lod: u32) -> usize {
    if lod == 0 { 1 } else { lod as usize * 2 }
}

/// Checks that `lod` leaves a real grid over `interior` samples per axis.
pub fn validate_lod(interior: usize, lod: u32) -> Result<(), MeshError> {
    if interior < 2 {
        return Err(MeshError::InvalidMap {
            width: interior + 2,
            height: interior + 2,
        });
    }
    if lod_skip(lod) > interior - 1 {
        return Err(MeshError::DegenerateLod { lod, interior });
    }
    Ok(())
}

/// Bordered-map positions sampled along one axis: the margin `0`, every
/// `skip`-th interior position from `1`, always the last interior position
/// `interior`, then the far margin `interior + 1`.
pub fn sample_positions(interior: usize, skip: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(interior / skip.max(1) + 3);
    out.push(0);
    out.extend((1..interior).step_by(skip.max(1)));
    out.push(interior);
    out.push(interior + 1);
    out
}

/// Builds the chunk mesh for `lod` from a bordered height map.
///
/// The outermost interior rows and columns are sampled at every LOD, so chunk
/// edges line up regardless of the detail level on either side.
pub fn generate_terrain_mesh(
    map: &HeightMap,
    height_multiplier: f32,
    curve: &HeightCurve,
    lod: u32,
    flat_shading: bool,
) -> Result<MeshData, MeshError> {
    let (width, height) = (map.width(), map.height());
    if width != height || width < 4 {
        return Err(MeshError::InvalidMap { width, height });
    }
    let interior = map.interior_size();
    validate_lod(interior, lod)?;

    let positions = sample_positions(interior, lod_skip(lod));
    let last = positions.len() - 1;
    let per_line = positions.len() - 2;
    let half = (interior - 1) as f32 / 2.0;
    let uv_span = (interior - 1) as f32;

    // Slot for every sampled (x, y), assigned in row-major order
    let mut slots = Vec::with_capacity(positions.len() * positions.len());
    let mut next_interior = 0u32;
    let mut next_border = 0u32;
    for j in 0..=last {
        for i in 0..=last {
            let on_border = i == 0 || j == 0 || i == last || j == last;
            let slot = if on_border {
                next_border += 1;
                VertexIndex::Border(next_border - 1)
            } else {
                next_interior += 1;
                VertexIndex::Interior(next_interior - 1)
            };
            slots.push(slot);
        }
    }

    let mut builder = MeshBuilder::new(per_line, flat_shading);
    let stride = last + 1;
    for (j, &gy) in positions.iter().enumerate() {
        for (i, &gx) in positions.iter().enumerate() {
            let h = curve.evaluate(map.get(gx, gy)) * height_multiplier;
            let fx = gx as f32 - 1.0;
            let fy = gy as f32 - 1.0;
            let pos = Vec3::new(fx - half, h, half - fy);
            let uv = Vec2::new(fx / uv_span, fy / uv_span);
            builder.add_vertex(slots[j * stride + i], pos, uv);

            if i < last && j < last {
                let a = slots[j * stride + i];
                let b = slots[j * stride + i + 1];
                let c = slots[(j + 1) * stride + i];
                let d = slots[(j + 1) * stride + i + 1];
                builder.add_triangle(a, d, c);
                builder.add_triangle(d, a, b);
            }
        }
    }
    log::trace!(
        "mesh built: lod={} vertices/line={} flat={}",
        lod,
        per_line,
        flat_shading
    );
    Ok(builder.finish())
}
