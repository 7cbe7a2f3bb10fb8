//! Operators that transform the input point or output value of child nodes.
//!
//! All configuration is validated at construction; evaluation never
//! re-checks or repairs it. Derived constants (the rotation matrix) are
//! computed when the configuration changes, never per call.

use noise::NoiseFn;

use super::coherent::s_curve3;
use super::NoiseNode;
use crate::error::{PqsError, Result};

/// Always returns the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f64);

impl NoiseFn<f64, 3> for Constant {
    fn get(&self, _point: [f64; 3]) -> f64 {
        self.0
    }
}

/// Clamps the child's output to `[min, max]`.
pub struct Clamp {
    min: f64,
    max: f64,
    source: NoiseNode,
}

impl Clamp {
    pub fn new(min: f64, max: f64, source: NoiseNode) -> Result<Self> {
        if !(min <= max) {
            return Err(PqsError::InvalidRange { what: "clamp bounds", min, max });
        }
        Ok(Self { min, max, source })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl NoiseFn<f64, 3> for Clamp {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.source.get(point).clamp(self.min, self.max)
    }
}

/// Remaps the child's output through a cubic spline of control points.
///
/// Needs at least four points with distinct inputs. Queries outside the
/// control range return the end point's output.
pub struct Curve {
    points: Vec<(f64, f64)>,
    source: NoiseNode,
}

impl Curve {
    pub fn new(source: NoiseNode, mut points: Vec<(f64, f64)>) -> Result<Self> {
        if points.len() < 4 {
            return Err(PqsError::TooFewControlPoints { found: points.len() });
        }
        if let Some(&(bad, _)) = points.iter().find(|(i, o)| !i.is_finite() || !o.is_finite()) {
            return Err(PqsError::InvalidParameter { what: "curve control point", value: bad });
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(w) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(PqsError::InvalidParameter { what: "duplicate curve input", value: w[0].0 });
        }
        Ok(Self { points, source })
    }

    pub fn control_points(&self) -> &[(f64, f64)] {
        &self.points
    }

    fn map(&self, value: f64) -> f64 {
        let last = self.points.len() - 1;
        let pos = self.points.iter().position(|&(input, _)| value < input).unwrap_or(self.points.len());

        let index = |offset: isize| (pos as isize + offset).clamp(0, last as isize) as usize;
        let (i0, i1, i2, i3) = (index(-2), index(-1), index(0), index(1));
        if i1 == i2 {
            return self.points[i1].1;
        }

        let (in1, in2) = (self.points[i1].0, self.points[i2].0);
        let alpha = (value - in1) / (in2 - in1);
        catmull_rom(self.points[i0].1, self.points[i1].1, self.points[i2].1, self.points[i3].1, alpha)
    }
}

/// Catmull-Rom segment from `p1` (a = 0) to `p2` (a = 1). Reproduces
/// collinear samples exactly.
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, a: f64) -> f64 {
    let a2 = a * a;
    let a3 = a2 * a;
    0.5 * (2.0 * p1
        + (p2 - p0) * a
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * a2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * a3)
}

impl NoiseFn<f64, 3> for Curve {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.map(self.source.get(point))
    }
}

/// Negates the child's output.
pub struct Invert {
    source: NoiseNode,
}

impl Invert {
    pub fn new(source: NoiseNode) -> Self {
        Self { source }
    }
}

impl NoiseFn<f64, 3> for Invert {
    fn get(&self, point: [f64; 3]) -> f64 {
        -self.source.get(point)
    }
}

/// Rotates the input point by Euler angles (degrees) before delegating.
pub struct Rotate {
    angles: [f64; 3],
    matrix: [[f64; 3]; 3],
    source: NoiseNode,
}

impl Rotate {
    pub fn new(x_deg: f64, y_deg: f64, z_deg: f64, source: NoiseNode) -> Self {
        Self { angles: [x_deg, y_deg, z_deg], matrix: rotation_matrix(x_deg, y_deg, z_deg), source }
    }

    /// Same child, new angles; rebuilds the matrix.
    pub fn with_angles(self, x_deg: f64, y_deg: f64, z_deg: f64) -> Self {
        Self::new(x_deg, y_deg, z_deg, self.source)
    }

    pub fn angles(&self) -> [f64; 3] {
        self.angles
    }
}

fn rotation_matrix(x_deg: f64, y_deg: f64, z_deg: f64) -> [[f64; 3]; 3] {
    let (xs, xc) = x_deg.to_radians().sin_cos();
    let (ys, yc) = y_deg.to_radians().sin_cos();
    let (zs, zc) = z_deg.to_radians().sin_cos();
    [
        [ys * xs * zs + yc * zc, xc * zs, ys * zc - yc * xs * zs],
        [ys * xs * zc - yc * zs, xc * zc, -yc * xs * zc - ys * zs],
        [-ys * xc, xs, yc * xc],
    ]
}

impl NoiseFn<f64, 3> for Rotate {
    fn get(&self, point: [f64; 3]) -> f64 {
        let m = &self.matrix;
        let [x, y, z] = point;
        self.source.get([
            m[0][0] * x + m[0][1] * y + m[0][2] * z,
            m[1][0] * x + m[1][1] * y + m[1][2] * z,
            m[2][0] * x + m[2][1] * y + m[2][2] * z,
        ])
    }
}

/// Shifts the input point before delegating.
pub struct Translate {
    offset: [f64; 3],
    source: NoiseNode,
}

impl Translate {
    pub fn new(dx: f64, dy: f64, dz: f64, source: NoiseNode) -> Self {
        Self { offset: [dx, dy, dz], source }
    }
}

impl NoiseFn<f64, 3> for Translate {
    fn get(&self, point: [f64; 3]) -> f64 {
        let [dx, dy, dz] = self.offset;
        self.source.get([point[0] + dx, point[1] + dy, point[2] + dz])
    }
}

/// `child · scale + bias`
pub struct ScaleBias {
    scale: f64,
    bias: f64,
    source: NoiseNode,
}

impl ScaleBias {
    pub fn new(scale: f64, bias: f64, source: NoiseNode) -> Self {
        Self { scale, bias, source }
    }
}

impl NoiseFn<f64, 3> for ScaleBias {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.source.get(point) * self.scale + self.bias
    }
}

/// Chooses between two children by comparing a controller's output against
/// `[min, max]`: inside selects `b`, outside selects `a`. A positive
/// `fall_off` blends across each edge with a cubic s-curve; it is limited to
/// half the selection range.
pub struct Select {
    a: NoiseNode,
    b: NoiseNode,
    controller: NoiseNode,
    min: f64,
    max: f64,
    fall_off: f64,
}

impl Select {
    pub fn new(a: NoiseNode, b: NoiseNode, controller: NoiseNode, min: f64, max: f64, fall_off: f64) -> Result<Self> {
        if !(min <= max) {
            return Err(PqsError::InvalidRange { what: "select bounds", min, max });
        }
        if !(fall_off >= 0.0) {
            return Err(PqsError::InvalidParameter { what: "select fall-off", value: fall_off });
        }
        let fall_off = fall_off.min((max - min) * 0.5);
        Ok(Self { a, b, controller, min, max, fall_off })
    }

    /// Hard switch at `threshold`: controller values at or above it select `b`.
    pub fn threshold(a: NoiseNode, b: NoiseNode, controller: NoiseNode, threshold: f64) -> Result<Self> {
        Self::new(a, b, controller, threshold, f64::MAX, 0.0)
    }

    pub fn fall_off(&self) -> f64 {
        self.fall_off
    }
}

impl NoiseFn<f64, 3> for Select {
    fn get(&self, point: [f64; 3]) -> f64 {
        let cv = self.controller.get(point);
        let (min, max, fall) = (self.min, self.max, self.fall_off);
        if fall > 0.0 {
            let blend = |from: &NoiseNode, to: &NoiseNode, lower: f64, upper: f64| {
                let t = s_curve3((cv - lower) / (upper - lower));
                let (v0, v1) = (from.get(point), to.get(point));
                v0 + t * (v1 - v0)
            };
            if cv < min - fall {
                self.a.get(point)
            } else if cv < min + fall {
                blend(&self.a, &self.b, min - fall, min + fall)
            } else if cv < max - fall {
                self.b.get(point)
            } else if cv < max + fall {
                blend(&self.b, &self.a, max - fall, max + fall)
            } else {
                self.a.get(point)
            }
        } else if cv < min || cv > max {
            self.a.get(point)
        } else {
            self.b.get(point)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn constant(v: f64) -> NoiseNode {
        Box::new(Constant(v))
    }

    /// Returns the x coordinate, so tests can drive children directly.
    struct AxisX;
    impl NoiseFn<f64, 3> for AxisX {
        fn get(&self, point: [f64; 3]) -> f64 {
            point[0]
        }
    }

    #[test]
    fn clamp_constant_above_range() {
        let c = Clamp::new(-1.0, 1.0, constant(5.0)).unwrap();
        for p in [[0.0, 0.0, 0.0], [3.0, -2.0, 9.0], [-1e6, 1e6, 0.5]] {
            assert_eq!(c.get(p), 1.0);
        }
    }

    #[test]
    fn clamp_rejects_inverted_bounds() {
        let err = Clamp::new(1.0, -1.0, constant(0.0)).err().unwrap();
        assert!(matches!(err, PqsError::InvalidRange { .. }));
    }

    #[test]
    fn curve_needs_four_points() {
        let err = Curve::new(constant(0.0), vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).err().unwrap();
        assert!(matches!(err, PqsError::TooFewControlPoints { found: 3 }));
    }

    #[test]
    fn curve_rejects_duplicate_inputs() {
        let points = vec![(0.0, 0.0), (1.0, 1.0), (1.0, 2.0), (2.0, 2.0)];
        assert!(Curve::new(constant(0.0), points).is_err());
    }

    #[test]
    fn collinear_curve_is_identity_between_brackets() {
        let points = vec![(-1.0, -1.0), (0.0, 0.0), (1.0, 1.0), (2.0, 2.0)];
        let curve = Curve::new(Box::new(AxisX), points).unwrap();
        for v in [0.1, 0.25, 0.5, 0.9] {
            assert_relative_eq!(curve.get([v, 0.0, 0.0]), v, epsilon = 1e-12);
        }
    }

    #[test]
    fn curve_sorts_points_and_clamps_ends() {
        let points = vec![(1.0, 10.0), (-1.0, -10.0), (0.0, 0.0), (0.5, 5.0)];
        let curve = Curve::new(Box::new(AxisX), points).unwrap();
        assert_eq!(curve.control_points()[0].0, -1.0);
        assert_eq!(curve.get([5.0, 0.0, 0.0]), 10.0);
        assert_eq!(curve.get([-5.0, 0.0, 0.0]), -10.0);
    }

    #[test]
    fn curve_passes_through_control_points() {
        let points = vec![(-1.0, 3.0), (0.0, -2.0), (0.5, 4.0), (1.0, 1.0), (2.0, 0.0)];
        let curve = Curve::new(Box::new(AxisX), points.clone()).unwrap();
        for (input, output) in points {
            assert_relative_eq!(curve.get([input, 0.0, 0.0]), output, epsilon = 1e-12);
        }
    }

    #[test]
    fn invert_negates() {
        assert_eq!(Invert::new(constant(0.25)).get([1.0, 2.0, 3.0]), -0.25);
    }

    #[test]
    fn translate_shifts_input() {
        let t = Translate::new(2.0, 0.0, 0.0, Box::new(AxisX));
        assert_eq!(t.get([1.0, 5.0, 5.0]), 3.0);
    }

    #[test]
    fn rotate_quarter_turn_about_y() {
        // Rotating +z by 90° about the y axis lands on ±x.
        let r = Rotate::new(0.0, 90.0, 0.0, Box::new(AxisX));
        assert_relative_eq!(r.get([0.0, 0.0, 1.0]).abs(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.get([0.0, 1.0, 0.0]), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rotate_rebuilds_matrix_on_angle_change() {
        let r = Rotate::new(0.0, 0.0, 0.0, Box::new(AxisX));
        assert_relative_eq!(r.get([0.7, 0.0, 0.0]), 0.7, epsilon = 1e-12);
        let r = r.with_angles(0.0, 180.0, 0.0);
        assert_eq!(r.angles(), [0.0, 180.0, 0.0]);
        assert_relative_eq!(r.get([0.7, 0.0, 0.0]), -0.7, epsilon = 1e-12);
    }

    #[test]
    fn scale_bias_is_affine() {
        assert_eq!(ScaleBias::new(2.0, 0.5, constant(3.0)).get([0.0; 3]), 6.5);
    }

    #[test]
    fn select_hard_threshold() {
        let s = Select::threshold(constant(1.0), constant(2.0), Box::new(AxisX), 0.0).unwrap();
        assert_eq!(s.get([-0.5, 0.0, 0.0]), 1.0);
        assert_eq!(s.get([0.0, 0.0, 0.0]), 2.0);
        assert_eq!(s.get([10.0, 0.0, 0.0]), 2.0);
    }

    #[test]
    fn select_blends_across_fall_off() {
        let s = Select::new(constant(0.0), constant(1.0), Box::new(AxisX), 0.0, 1.0, 0.2).unwrap();
        assert_eq!(s.get([-0.5, 0.0, 0.0]), 0.0);
        assert_relative_eq!(s.get([0.0, 0.0, 0.0]), 0.5, epsilon = 1e-12);
        assert_eq!(s.get([0.5, 0.0, 0.0]), 1.0);
        assert_relative_eq!(s.get([1.0, 0.0, 0.0]), 0.5, epsilon = 1e-12);
        assert_eq!(s.get([1.5, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn select_limits_fall_off_to_half_range() {
        let s = Select::new(constant(0.0), constant(1.0), constant(0.0), 0.0, 1.0, 5.0).unwrap();
        assert_eq!(s.fall_off(), 0.5);
        assert!(Select::new(constant(0.0), constant(1.0), constant(0.0), 1.0, 0.0, 0.0).is_err());
    }
}
