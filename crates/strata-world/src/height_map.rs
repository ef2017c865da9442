use strata_noise::NoiseGrid;

use crate::texture::ColorMap;

/// Extra samples per axis around a chunk (one on each side) that exist only so
/// mesh normals along the edge see their neighbours.
pub const MAP_BORDER: usize = 2;

/// Row-major grid of heights in `[0, 1]`, `index = y * width + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl HeightMap {
    /// Builds a map, resizing `values` to `width * height` if it is off.
    pub fn new(width: usize, height: usize, mut values: Vec<f32>) -> Self {
        values.resize(width * height, 0.0);
        Self {
            width,
            height,
            values,
        }
    }

    pub fn flat(width: usize, height: usize, value: f32) -> Self {
        Self::new(width, height, vec![value; width * height])
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.values[i] = v;
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Interior samples per axis, i.e. the chunk size the map was built for.
    #[inline]
    pub fn interior_size(&self) -> usize {
        self.width.saturating_sub(MAP_BORDER)
    }
}

impl From<NoiseGrid> for HeightMap {
    fn from(grid: NoiseGrid) -> Self {
        Self::new(grid.width, grid.height, grid.values)
    }
}

/// Everything a chunk needs from one map-generation request.
#[derive(Clone, Debug, PartialEq)]
pub struct MapData {
    pub height_map: HeightMap,
    pub color_map: ColorMap,
}
