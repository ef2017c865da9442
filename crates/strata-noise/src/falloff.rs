/// Curve steepness.
const FALLOFF_A: f32 = 3.0;
/// Shifts where the curve crosses one half; larger pushes the coast outward.
const FALLOFF_B: f32 = 2.2;

/// Square attenuation field, ~0 at the center and ~1 at the edges.
///
/// Subtracting it from a height map pulls the margins under water and leaves a
/// squarish island, since the radial term is `max(|x|, |y|)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FalloffMap {
    size: usize,
    values: Vec<f32>,
}

impl FalloffMap {
    pub fn generate(size: usize) -> Self {
        let mut values = Vec::with_capacity(size * size);
        let denom = size.max(1) as f32;
        for j in 0..size {
            let y = j as f32 / denom * 2.0 - 1.0;
            for i in 0..size {
                let x = i as f32 / denom * 2.0 - 1.0;
                values.push(Self::evaluate(x.abs().max(y.abs())));
            }
        }
        Self { size, values }
    }

    /// Falloff for a Chebyshev radius `r` in `[0, 1]`.
    #[inline]
    pub fn evaluate(r: f32) -> f32 {
        let r = r.clamp(0.0, 1.0);
        let ra = r.powf(FALLOFF_A);
        let rb = (FALLOFF_B - FALLOFF_B * r).powf(FALLOFF_A);
        (ra / (ra + rb)).clamp(0.0, 1.0)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.size + x]
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
