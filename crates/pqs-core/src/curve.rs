//! Keyframed cubic Hermite curves.
//!
//! Used where a mod reshapes a scalar through an artist-authored profile
//! (crater cross-sections, jitter envelopes, height weighting). Distinct from
//! the `Curve` noise operator, which interpolates control points without
//! tangents.

use serde::{Deserialize, Serialize};

/// Cubic Hermite interpolation between `start` and `end` with explicit tangents.
#[inline]
pub fn cubic_hermite(start: f64, end: f64, start_tangent: f64, end_tangent: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    start * (2.0 * t3 - 3.0 * t2 + 1.0)
        + start_tangent * (t3 - 2.0 * t2 + t)
        + end * (-2.0 * t3 + 3.0 * t2)
        + end_tangent * (t3 - t2)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub position: f64,
    pub value: f64,
    #[serde(default)]
    pub tangent_in: f64,
    #[serde(default)]
    pub tangent_out: f64,
}

impl CurveKey {
    pub const fn new(position: f64, value: f64, tangent_in: f64, tangent_out: f64) -> Self {
        Self { position, value, tangent_in, tangent_out }
    }
}

/// A curve through sorted keys. Tangents are slopes (value per unit position)
/// and are scaled by the key spacing when interpolating. The curve is constant
/// before the first and after the last key; an empty curve evaluates to 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CurveKey>", into = "Vec<CurveKey>")]
pub struct HermiteCurve {
    keys: Vec<CurveKey>,
}

impl From<Vec<CurveKey>> for HermiteCurve {
    fn from(keys: Vec<CurveKey>) -> Self {
        HermiteCurve::new(keys)
    }
}

impl From<HermiteCurve> for Vec<CurveKey> {
    fn from(curve: HermiteCurve) -> Self {
        curve.keys
    }
}

impl HermiteCurve {
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.sort_by(|a, b| a.position.total_cmp(&b.position));
        Self { keys }
    }

    /// Straight line from (0, 0) to (1, 1).
    pub fn linear() -> Self {
        Self::new(vec![CurveKey::new(0.0, 0.0, 1.0, 1.0), CurveKey::new(1.0, 1.0, 1.0, 1.0)])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn evaluate(&self, position: f64) -> f64 {
        let keys = &self.keys;
        let (first, last) = match (keys.first(), keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if position <= first.position {
            return first.value;
        }
        if position >= last.position {
            return last.value;
        }
        let hi = keys.partition_point(|k| k.position <= position);
        let (k0, k1) = (&keys[hi - 1], &keys[hi]);
        let span = k1.position - k0.position;
        if span <= 0.0 {
            return k1.value;
        }
        let t = (position - k0.position) / span;
        cubic_hermite(k0.value, k1.value, k0.tangent_out * span, k1.tangent_in * span, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hermite_hits_endpoints() {
        assert_relative_eq!(cubic_hermite(2.0, 5.0, 9.0, -3.0, 0.0), 2.0);
        assert_relative_eq!(cubic_hermite(2.0, 5.0, 9.0, -3.0, 1.0), 5.0);
    }

    #[test]
    fn linear_curve_is_identity_inside_range() {
        let c = HermiteCurve::linear();
        for i in 0..=10 {
            let x = i as f64 / 10.0;
            assert_relative_eq!(c.evaluate(x), x, epsilon = 1e-12);
        }
    }

    #[test]
    fn curve_is_constant_outside_keys() {
        let c = HermiteCurve::new(vec![CurveKey::new(-1.0, 3.0, 0.0, 0.0), CurveKey::new(1.0, 7.0, 0.0, 0.0)]);
        assert_eq!(c.evaluate(-4.0), 3.0);
        assert_eq!(c.evaluate(4.0), 7.0);
    }

    #[test]
    fn keys_are_sorted_on_construction() {
        let c = HermiteCurve::new(vec![CurveKey::new(1.0, 1.0, 0.0, 0.0), CurveKey::new(0.0, 0.0, 0.0, 0.0)]);
        assert_eq!(c.keys()[0].position, 0.0);
    }

    #[test]
    fn empty_curve_is_zero() {
        assert_eq!(HermiteCurve::default().evaluate(0.3), 0.0);
    }
}
