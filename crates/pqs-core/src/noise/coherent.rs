//! Lattice noise primitives shared by the fractal generators and Voronoi.
//!
//! Integer hashing follows the classic libnoise constants so value noise is
//! stable for a given seed. Gradient noise picks one of the twelve cube-edge
//! directions per lattice point.

use serde::{Deserialize, Serialize};

const X_NOISE_GEN: i32 = 1619;
const Y_NOISE_GEN: i32 = 31337;
const Z_NOISE_GEN: i32 = 6971;
const SEED_NOISE_GEN: i32 = 1013;
const SHIFT_NOISE_GEN: i32 = 8;

/// Highest octave count the fractal generators accept.
pub const OCTAVES_MAXIMUM: u32 = 30;

pub const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Cube-edge gradient directions, shared with simplex noise.
pub(crate) const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [1.0, 0.0, -1.0], [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0], [0.0, -1.0, 1.0], [0.0, 1.0, -1.0], [0.0, -1.0, -1.0],
];

/// Smoothing applied to the lattice-cell fraction before interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoiseQuality {
    /// Linear.
    Low,
    /// Cubic s-curve.
    #[default]
    Medium,
    /// Quintic s-curve.
    High,
}

impl NoiseQuality {
    #[inline]
    fn smooth(self, a: f64) -> f64 {
        match self {
            NoiseQuality::Low => a,
            NoiseQuality::Medium => s_curve3(a),
            NoiseQuality::High => s_curve5(a),
        }
    }
}

#[inline]
pub fn s_curve3(a: f64) -> f64 {
    a * a * (3.0 - 2.0 * a)
}

#[inline]
pub fn s_curve5(a: f64) -> f64 {
    let a3 = a * a * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    6.0 * a5 - 15.0 * a4 + 10.0 * a3
}

#[inline]
fn lerp(n0: f64, n1: f64, a: f64) -> f64 {
    (1.0 - a) * n0 + a * n1
}

/// Cubic interpolation through four evenly spaced samples; `a` in [0, 1]
/// moves from `n1` to `n2`.
#[inline]
pub fn interpolate_cubic(n0: f64, n1: f64, n2: f64, n3: f64, a: f64) -> f64 {
    let p = (n3 - n2) - (n0 - n1);
    let q = (n0 - n1) - p;
    let r = n2 - n0;
    let s = n1;
    p * a * a * a + q * a * a + r * a + s
}

/// Wrap a coordinate into the range an `i32` lattice index can represent.
#[inline]
pub fn make_int32_range(n: f64) -> f64 {
    const LIMIT: f64 = 1_073_741_824.0;
    if n >= LIMIT {
        2.0 * (n % LIMIT) - LIMIT
    } else if n <= -LIMIT {
        2.0 * (n % LIMIT) + LIMIT
    } else {
        n
    }
}

/// Floor toward negative infinity for lattice lookups.
#[inline]
pub(crate) fn lattice_floor(v: f64) -> i32 {
    if v > 0.0 {
        v as i32
    } else {
        v as i32 - 1
    }
}

#[inline]
fn lattice_hash(x: i32, y: i32, z: i32, seed: i32) -> i32 {
    X_NOISE_GEN
        .wrapping_mul(x)
        .wrapping_add(Y_NOISE_GEN.wrapping_mul(y))
        .wrapping_add(Z_NOISE_GEN.wrapping_mul(z))
        .wrapping_add(SEED_NOISE_GEN.wrapping_mul(seed))
}

/// Hashed integer in [0, 2³¹).
pub fn int_value_noise_3d(x: i32, y: i32, z: i32, seed: i32) -> i32 {
    let mut n = lattice_hash(x, y, z, seed) & 0x7fff_ffff;
    n ^= n >> 13;
    n.wrapping_mul(n.wrapping_mul(n).wrapping_mul(60493).wrapping_add(19_990_303))
        .wrapping_add(1_376_312_589)
        & 0x7fff_ffff
}

/// Hashed value in [-1, 1].
pub fn value_noise_3d(x: i32, y: i32, z: i32, seed: i32) -> f64 {
    1.0 - int_value_noise_3d(x, y, z, seed) as f64 / 1_073_741_824.0
}

/// Gradient contribution of lattice point `(ix, iy, iz)` at `(fx, fy, fz)`.
///
/// The gradient is one of the twelve cube-edge directions in [`GRAD3`], picked
/// by the lattice hash, rather than an entry of libnoise's 256-entry table of
/// random unit vectors. The `FRAC_1_SQRT_2 * 2.12` factor normalises the
/// edge vectors and applies libnoise's output scale, so the range matches
/// libnoise but individual values are not bit-identical to it.
fn gradient_noise_3d(fx: f64, fy: f64, fz: f64, ix: i32, iy: i32, iz: i32, seed: i32) -> f64 {
    let mut index = lattice_hash(ix, iy, iz, seed);
    index ^= index >> SHIFT_NOISE_GEN;
    let g = GRAD3[((index & 0xff) % 12) as usize];
    let dx = fx - ix as f64;
    let dy = fy - iy as f64;
    let dz = fz - iz as f64;
    (g[0] * dx + g[1] * dy + g[2] * dz) * std::f64::consts::FRAC_1_SQRT_2 * 2.12
}

/// Trilinearly blended gradient noise, roughly in [-1, 1].
pub fn gradient_coherent_noise_3d(x: f64, y: f64, z: f64, seed: i32, quality: NoiseQuality) -> f64 {
    let x0 = lattice_floor(x);
    let y0 = lattice_floor(y);
    let z0 = lattice_floor(z);
    let (x1, y1, z1) = (x0.wrapping_add(1), y0.wrapping_add(1), z0.wrapping_add(1));

    let xs = quality.smooth(x - x0 as f64);
    let ys = quality.smooth(y - y0 as f64);
    let zs = quality.smooth(z - z0 as f64);

    let g = |ix, iy, iz| gradient_noise_3d(x, y, z, ix, iy, iz, seed);

    let ix0 = lerp(g(x0, y0, z0), g(x1, y0, z0), xs);
    let ix1 = lerp(g(x0, y1, z0), g(x1, y1, z0), xs);
    let iy0 = lerp(ix0, ix1, ys);
    let ix0 = lerp(g(x0, y0, z1), g(x1, y0, z1), xs);
    let ix1 = lerp(g(x0, y1, z1), g(x1, y1, z1), xs);
    let iy1 = lerp(ix0, ix1, ys);
    lerp(iy0, iy1, zs)
}
