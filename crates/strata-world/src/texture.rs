use serde::Deserialize;

use crate::height_map::HeightMap;

/// Colour band: samples at or below `height` take `color`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TerrainType {
    #[serde(default)]
    pub name: String,
    pub height: f32,
    pub color: [u8; 3],
}

/// RGB colours for a chunk's interior samples (border ring excluded).
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    pub width: usize,
    pub height: usize,
    pub colors: Vec<[u8; 3]>,
}

impl ColorMap {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        self.colors[y * self.width + x]
    }
}

#[inline]
fn gray(h: f32) -> [u8; 3] {
    let v = (h.clamp(0.0, 1.0) * 255.0).round() as u8;
    [v, v, v]
}

/// Colour for one normalized height. `regions` must be sorted by height.
pub fn region_color(regions: &[TerrainType], h: f32) -> [u8; 3] {
    if regions.is_empty() {
        return gray(h);
    }
    regions
        .iter()
        .find(|r| h <= r.height)
        .or(regions.last())
        .map(|r| r.color)
        .unwrap_or_else(|| gray(h))
}

pub fn color_map_from_height_map(map: &HeightMap, regions: &[TerrainType]) -> ColorMap {
    let size = map.interior_size();
    let mut colors = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            colors.push(region_color(regions, map.get(x + 1, y + 1)));
        }
    }
    ColorMap {
        width: size,
        height: size,
        colors,
    }
}

/// Packed RGB8 image for headless previews.
#[derive(Clone, Debug)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl PreviewImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let idx = (y * self.width + x) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Grayscale image of any row-major `[0, 1]` grid.
    pub fn from_values(width: usize, height: usize, values: &[f32]) -> Self {
        let mut image = Self::new(width, height);
        for (i, &v) in values.iter().take(width * height).enumerate() {
            image.put_pixel(i % width, i / width, gray(v));
        }
        image
    }

    pub fn from_color_map(map: &ColorMap) -> Self {
        let mut image = Self::new(map.width, map.height);
        for (i, &c) in map.colors.iter().enumerate() {
            image.put_pixel(i % map.width, i / map.width, c);
        }
        image
    }

    /// Binary PPM (P6) encoding.
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.data);
        out
    }
}
