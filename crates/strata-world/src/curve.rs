use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    #[inline]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveInterpolation {
    #[default]
    Linear,
    /// Smoothstep between neighbouring keys (flat tangents at every key).
    Smooth,
}

#[derive(Clone, Debug, Deserialize)]
struct HeightCurveDef {
    #[serde(default = "default_keys")]
    keys: Vec<Keyframe>,
    #[serde(default)]
    interpolation: CurveInterpolation,
}

fn default_keys() -> Vec<Keyframe> {
    vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 1.0)]
}

/// Remaps normalized height before it is scaled by the height multiplier.
///
/// Keys are kept sorted by time; evaluation clamps outside the key range.
/// The curve is plain data, so workers share it without copying.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "HeightCurveDef")]
pub struct HeightCurve {
    keys: Vec<Keyframe>,
    interpolation: CurveInterpolation,
}

impl From<HeightCurveDef> for HeightCurve {
    fn from(def: HeightCurveDef) -> Self {
        Self::new(def.keys, def.interpolation)
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl HeightCurve {
    pub fn new(mut keys: Vec<Keyframe>, interpolation: CurveInterpolation) -> Self {
        keys.retain(|k| k.time.is_finite() && k.value.is_finite());
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            keys,
            interpolation,
        }
    }

    /// Identity on `[0, 1]`.
    pub fn linear() -> Self {
        Self::new(default_keys(), CurveInterpolation::Linear)
    }

    #[inline]
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return t,
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }
        // First key strictly after t; t > first.time so the index is >= 1
        let hi = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[hi - 1];
        let b = self.keys[hi];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        let mut s = (t - a.time) / span;
        if self.interpolation == CurveInterpolation::Smooth {
            s = s * s * (3.0 - 2.0 * s);
        }
        a.value + (b.value - a.value) * s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity_on_unit_range() {
        let c = HeightCurve::linear();
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((c.evaluate(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn clamps_outside_key_range() {
        let c = HeightCurve::new(
            vec![Keyframe::new(0.2, 0.1), Keyframe::new(0.8, 0.9)],
            CurveInterpolation::Linear,
        );
        assert_eq!(c.evaluate(0.0), 0.1);
        assert_eq!(c.evaluate(1.0), 0.9);
        assert!((c.evaluate(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn unsorted_keys_are_sorted() {
        let c = HeightCurve::new(
            vec![Keyframe::new(1.0, 1.0), Keyframe::new(0.0, 0.0), Keyframe::new(0.4, 0.0)],
            CurveInterpolation::Linear,
        );
        assert_eq!(c.keys()[0].time, 0.0);
        // Flat up to 0.4 (water plateau), then rising
        assert_eq!(c.evaluate(0.3), 0.0);
        assert!((c.evaluate(0.7) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn smooth_matches_keys_and_midpoint() {
        let c = HeightCurve::new(default_keys(), CurveInterpolation::Smooth);
        assert_eq!(c.evaluate(0.0), 0.0);
        assert_eq!(c.evaluate(1.0), 1.0);
        assert!((c.evaluate(0.5) - 0.5).abs() < 1e-6);
        assert!(c.evaluate(0.25) < 0.25);
    }

    #[test]
    fn empty_curve_passes_through() {
        let c = HeightCurve::new(Vec::new(), CurveInterpolation::Linear);
        assert_eq!(c.evaluate(0.37), 0.37);
    }
}
