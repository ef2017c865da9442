use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use strata_geom::Vec2;

/// Smallest accepted noise scale; anything at or below zero is raised to this.
pub const MIN_SCALE: f32 = 0.0001;

const OCTAVE_OFFSET_RANGE: i32 = 100_000;
// Raw fBm rarely gets near its theoretical peak; global mode stretches by this.
const GLOBAL_AMPLITUDE_FACTOR: f32 = 1.75;
// The base primitive keeps one permutation; the seed only moves octave offsets.
const PRIMITIVE_SEED: i32 = 1337;

/// How accumulated octave sums are mapped into `[0, 1]`.
///
/// `Local` rescales every grid from its own extremes, so two neighbouring chunks
/// disagree along their shared edge. Only `Global` is safe for streaming.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    Local,
    #[default]
    Global,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NoiseConfig {
    #[serde(default)]
    pub seed: i32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_octaves")]
    pub octaves: i32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default)]
    pub offset: Vec2,
    #[serde(default)]
    pub normalize_mode: NormalizeMode,
}

fn default_scale() -> f32 {
    28.0
}
fn default_octaves() -> i32 {
    4
}
fn default_persistence() -> f32 {
    0.5
}
fn default_lacunarity() -> f32 {
    2.0
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: default_scale(),
            octaves: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Global,
        }
    }
}

impl NoiseConfig {
    /// Copy with every tuning value clamped into its valid range.
    pub fn sanitized(&self) -> Self {
        let scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale.max(MIN_SCALE)
        } else {
            MIN_SCALE
        };
        let persistence = if self.persistence.is_finite() {
            self.persistence.clamp(0.0, 1.0)
        } else {
            default_persistence()
        };
        let lacunarity = if self.lacunarity.is_finite() {
            self.lacunarity.max(1.0)
        } else {
            1.0
        };
        Self {
            seed: self.seed,
            scale,
            octaves: self.octaves.max(0),
            persistence,
            lacunarity,
            offset: self.offset,
            normalize_mode: self.normalize_mode,
        }
    }
}

/// Per-octave sample offsets. Same seed, same table.
#[derive(Clone, Debug, PartialEq)]
pub struct OctaveOffsets {
    offsets: Vec<(f64, f64)>,
}

impl OctaveOffsets {
    pub fn new(seed: i32, octaves: usize, offset: Vec2) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed as u32));
        let offsets = (0..octaves)
            .map(|_| {
                let ox = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
                let oy = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE);
                (
                    f64::from(ox) + f64::from(offset.x),
                    f64::from(oy) - f64::from(offset.y),
                )
            })
            .collect();
        Self { offsets }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.offsets
    }
}

/// Row-major grid of noise values, `index = y * width + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseGrid {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl NoiseGrid {
    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[self.idx(x, y)]
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut it = self.values.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Deterministic layered noise for one configuration snapshot.
pub struct NoiseField {
    config: NoiseConfig,
    primitive: FastNoiseLite,
    offsets: OctaveOffsets,
    max_possible: f32,
}

impl NoiseField {
    pub fn new(config: &NoiseConfig) -> Self {
        let config = config.sanitized();
        let mut primitive = FastNoiseLite::with_seed(PRIMITIVE_SEED);
        primitive.set_noise_type(Some(NoiseType::Perlin));
        primitive.set_frequency(Some(1.0));
        let octaves = config.octaves as usize;
        let offsets = OctaveOffsets::new(config.seed, octaves, config.offset);
        let mut max_possible = 0.0f32;
        let mut amplitude = 1.0f32;
        for _ in 0..octaves {
            max_possible += amplitude;
            amplitude *= config.persistence;
        }
        Self {
            config,
            primitive,
            offsets,
            max_possible,
        }
    }

    #[inline]
    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }

    #[inline]
    pub fn offsets(&self) -> &OctaveOffsets {
        &self.offsets
    }

    /// Sum of per-octave amplitudes, the bound on `|sample_raw|`.
    #[inline]
    pub fn max_possible_amplitude(&self) -> f32 {
        self.max_possible
    }

    /// Unnormalized octave sum at noise-space coordinate `(wx, wy)`.
    ///
    /// Octave `i` reads the primitive at `w * lacunarity^i / scale + offset_i`,
    /// so the octave offset is not stretched by scale or frequency.
    pub fn sample_raw(&self, wx: f64, wy: f64) -> f32 {
        let scale = f64::from(self.config.scale);
        let lacunarity = f64::from(self.config.lacunarity);
        let mut amplitude = 1.0f32;
        let mut frequency = 1.0f64;
        let mut total = 0.0f32;
        for &(ox, oy) in self.offsets.as_slice() {
            let sx = wx * frequency / scale + ox;
            let sy = wy * frequency / scale + oy;
            total += self.primitive.get_noise_2d(sx as f32, sy as f32) * amplitude;
            amplitude *= self.config.persistence;
            frequency *= lacunarity;
        }
        total
    }

    /// Per-coordinate mapping into `[0, 1]`, independent of neighbouring samples.
    #[inline]
    pub fn normalize_global(&self, raw: f32) -> f32 {
        if self.max_possible <= 0.0 {
            return 0.5;
        }
        let estimate = raw / (self.max_possible / GLOBAL_AMPLITUDE_FACTOR);
        ((estimate + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Raw sums over a `width x height` grid centred on `center`.
    ///
    /// Grid position `(gx, gy)` maps to noise space as
    /// `((gx - width/2) + center.x, (gy - height/2) - center.y)`; that part is
    /// exact in f64, so chunks sharing a world point sample identical inputs.
    pub fn raw_grid(&self, width: usize, height: usize, center: Vec2) -> NoiseGrid {
        let half_w = width as f64 / 2.0;
        let half_h = height as f64 / 2.0;
        let cx = f64::from(center.x);
        let cy = f64::from(center.y);
        let mut values = Vec::with_capacity(width * height);
        for gy in 0..height {
            let wy = (gy as f64 - half_h) - cy;
            for gx in 0..width {
                let wx = (gx as f64 - half_w) + cx;
                values.push(self.sample_raw(wx, wy));
            }
        }
        NoiseGrid {
            width,
            height,
            values,
        }
    }

    pub fn normalize_grid(&self, raw: &NoiseGrid, mode: NormalizeMode) -> NoiseGrid {
        let values = if self.max_possible <= 0.0 {
            vec![0.5; raw.values.len()]
        } else {
            match mode {
                NormalizeMode::Global => raw
                    .values
                    .iter()
                    .map(|&v| self.normalize_global(v))
                    .collect(),
                NormalizeMode::Local => {
                    let (lo, hi) = raw.min_max().unwrap_or((0.0, 0.0));
                    let span = hi - lo;
                    if span <= f32::EPSILON {
                        vec![0.5; raw.values.len()]
                    } else {
                        raw.values
                            .iter()
                            .map(|&v| ((v - lo) / span).clamp(0.0, 1.0))
                            .collect()
                    }
                }
            }
        };
        NoiseGrid {
            width: raw.width,
            height: raw.height,
            values,
        }
    }

    /// Raw grid normalized with the configured mode.
    pub fn generate(&self, width: usize, height: usize, center: Vec2) -> NoiseGrid {
        let raw = self.raw_grid(width, height, center);
        self.normalize_grid(&raw, self.config.normalize_mode)
    }
}

pub fn generate_noise_map(
    width: usize,
    height: usize,
    config: &NoiseConfig,
    center: Vec2,
) -> NoiseGrid {
    NoiseField::new(config).generate(width, height, center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_tuning_values() {
        let cfg = NoiseConfig {
            scale: -3.0,
            octaves: -2,
            persistence: 1.5,
            lacunarity: 0.25,
            ..NoiseConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.scale, MIN_SCALE);
        assert_eq!(cfg.octaves, 0);
        assert_eq!(cfg.persistence, 1.0);
        assert_eq!(cfg.lacunarity, 1.0);
    }

    #[test]
    fn nan_scale_is_floored() {
        let cfg = NoiseConfig {
            scale: f32::NAN,
            ..NoiseConfig::default()
        };
        assert_eq!(cfg.sanitized().scale, MIN_SCALE);
    }

    #[test]
    fn max_amplitude_is_persistence_series() {
        let field = NoiseField::new(&NoiseConfig::default());
        assert!((field.max_possible_amplitude() - 1.875).abs() < 1e-6);
    }

    #[test]
    fn offsets_follow_seed() {
        let a = OctaveOffsets::new(7, 4, Vec2::ZERO);
        let b = OctaveOffsets::new(7, 4, Vec2::ZERO);
        let c = OctaveOffsets::new(8, 4, Vec2::ZERO);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn octaves_offset_after_scaling() {
        let cfg = NoiseConfig {
            seed: 11,
            scale: 20.0,
            octaves: 2,
            persistence: 0.5,
            lacunarity: 2.0,
            ..NoiseConfig::default()
        };
        let field = NoiseField::new(&cfg);
        let o = field.offsets().as_slice();
        for &(wx, wy) in &[(0.0f64, 0.0f64), (37.0, -12.0), (-401.5, 260.25)] {
            let first = field.primitive.get_noise_2d((wx / 20.0 + o[0].0) as f32, (wy / 20.0 + o[0].1) as f32);
            let second = field
                .primitive
                .get_noise_2d((wx * 2.0 / 20.0 + o[1].0) as f32, (wy * 2.0 / 20.0 + o[1].1) as f32);
            assert_eq!(field.sample_raw(wx, wy), first + second * 0.5);
        }
    }

    #[test]
    fn config_offset_shifts_x_forward_and_y_backward() {
        let base = OctaveOffsets::new(3, 2, Vec2::ZERO);
        let moved = OctaveOffsets::new(3, 2, Vec2::new(10.0, 4.0));
        for (b, m) in base.as_slice().iter().zip(moved.as_slice()) {
            assert_eq!(m.0 - b.0, 10.0);
            assert_eq!(m.1 - b.1, -4.0);
        }
    }
}
