//! Seedable 3D simplex noise with a fractional-octave fractal sum.
//!
//! Each instance owns its permutation table, so differently seeded
//! generators never share state. All per-call intermediates live on the
//! stack; `get` takes `&self`.

use noise::NoiseFn;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::coherent::GRAD3;
use crate::error::{PqsError, Result};

const F3: f64 = 1.0 / 3.0;
const G3: f64 = 1.0 / 6.0;

/// Ken Perlin's reference permutation.
const CANONICAL: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

/// 256-entry permutation doubled to 512 so corner lookups never wrap.
#[derive(Clone)]
pub struct PermutationTable {
    perm: [u8; 512],
}

impl std::fmt::Debug for PermutationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermutationTable").field("head", &&self.perm[..8]).finish()
    }
}

impl Default for PermutationTable {
    fn default() -> Self {
        Self::from_base(&CANONICAL)
    }
}

impl PermutationTable {
    /// A Fisher-Yates shuffle of 0..=255 driven by `seed`.
    ///
    /// Indices are drawn straight from ChaCha8's `u32` stream with a
    /// multiply-shift reduction, so the table depends only on the ChaCha8
    /// keystream and never on `rand`'s sampling algorithms.
    pub fn seeded(seed: i32) -> Self {
        let mut base: [u8; 256] = std::array::from_fn(|i| i as u8);
        let mut rng = ChaCha8Rng::seed_from_u64(seed as u32 as u64);
        for i in (1..base.len()).rev() {
            let j = ((rng.next_u32() as u64 * (i as u64 + 1)) >> 32) as usize;
            base.swap(i, j);
        }
        Self::from_base(&base)
    }

    fn from_base(base: &[u8; 256]) -> Self {
        Self { perm: std::array::from_fn(|i| base[i & 255]) }
    }

    #[inline]
    fn at(&self, i: usize) -> usize {
        self.perm[i] as usize
    }
}

/// Serializable simplex settings, shared by every simplex-driven mod.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexConfig {
    pub seed: i32,
    pub octaves: f64,
    pub persistence: f64,
    pub frequency: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self { seed: 0, octaves: 1.0, persistence: 0.5, frequency: 1.0 }
    }
}

impl SimplexConfig {
    pub fn build(&self) -> Result<Simplex> {
        Simplex::new(self.seed, self.octaves, self.persistence, self.frequency)
    }
}

/// Fractal simplex noise in [-1, 1].
///
/// Octaves are summed while an octave counter stays below `octaves`, so a
/// fractional count such as 2.5 runs three octaves.
#[derive(Debug, Clone)]
pub struct Simplex {
    perm: PermutationTable,
    octaves: f64,
    persistence: f64,
    frequency: f64,
}

impl Simplex {
    pub fn new(seed: i32, octaves: f64, persistence: f64, frequency: f64) -> Result<Self> {
        Self::with_table(PermutationTable::seeded(seed), octaves, persistence, frequency)
    }

    /// Generator over the canonical permutation, independent of any seed.
    pub fn canonical(octaves: f64, persistence: f64, frequency: f64) -> Result<Self> {
        Self::with_table(PermutationTable::default(), octaves, persistence, frequency)
    }

    fn with_table(perm: PermutationTable, octaves: f64, persistence: f64, frequency: f64) -> Result<Self> {
        if !(octaves > 0.0 && octaves.is_finite()) {
            return Err(PqsError::InvalidParameter { what: "simplex octaves", value: octaves });
        }
        if !persistence.is_finite() {
            return Err(PqsError::InvalidParameter { what: "simplex persistence", value: persistence });
        }
        if !frequency.is_finite() {
            return Err(PqsError::InvalidParameter { what: "simplex frequency", value: frequency });
        }
        Ok(Self { perm, octaves, persistence, frequency })
    }

    pub fn persistence(&self) -> f64 {
        self.persistence
    }

    /// Fractal sum normalised by the total amplitude.
    pub fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        self.noise_with_persistence(x, y, z, self.persistence)
    }

    /// `noise_normalized` with a per-call persistence in place of the configured one.
    pub fn noise_normalized_with_persistence(&self, x: f64, y: f64, z: f64, persistence: f64) -> f64 {
        (self.noise_with_persistence(x, y, z, persistence) + 1.0) * 0.5
    }

    /// Fractal sum with a per-call persistence; the generator itself is untouched.
    pub fn noise_with_persistence(&self, x: f64, y: f64, z: f64, persistence: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut max_amplitude = 0.0;
        let mut f = self.frequency;
        let mut octave = 0.0;
        while octave < self.octaves {
            total += self.value(x * f, y * f, z * f) * amplitude;
            max_amplitude += amplitude;
            f *= 2.0;
            amplitude *= persistence;
            octave += 1.0;
        }
        total / max_amplitude
    }

    /// `noise` remapped to [0, 1].
    pub fn noise_normalized(&self, x: f64, y: f64, z: f64) -> f64 {
        (self.noise(x, y, z) + 1.0) * 0.5
    }

    /// Single-octave simplex noise.
    fn value(&self, xin: f64, yin: f64, zin: f64) -> f64 {
        let s = (xin + yin + zin) * F3;
        let i = fast_floor(xin + s);
        let j = fast_floor(yin + s);
        let k = fast_floor(zin + s);
        let t = (i + j + k) * G3;
        let x0 = xin - (i - t);
        let y0 = yin - (j - t);
        let z0 = zin - (k - t);

        // Second and third corners of the containing simplex.
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f64 + G3;
        let y1 = y0 - j1 as f64 + G3;
        let z1 = z0 - k1 as f64 + G3;
        let x2 = x0 - i2 as f64 + 2.0 * G3;
        let y2 = y0 - j2 as f64 + 2.0 * G3;
        let z2 = z0 - k2 as f64 + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let kk = (k as i64 & 255) as usize;
        let p = &self.perm;
        let gi0 = p.at(ii + p.at(jj + p.at(kk))) % 12;
        let gi1 = p.at(ii + i1 + p.at(jj + j1 + p.at(kk + k1))) % 12;
        let gi2 = p.at(ii + i2 + p.at(jj + j2 + p.at(kk + k2))) % 12;
        let gi3 = p.at(ii + 1 + p.at(jj + 1 + p.at(kk + 1))) % 12;

        let n0 = corner(gi0, x0, y0, z0);
        let n1 = corner(gi1, x1, y1, z1);
        let n2 = corner(gi2, x2, y2, z2);
        let n3 = corner(gi3, x3, y3, z3);
        32.0 * (n0 + n1 + n2 + n3)
    }
}

/// Cell index rule of the reference generator: truncate, then step down for
/// every `x <= 0`. Zero and negative integers land one cell below `floor`.
#[inline]
fn fast_floor(x: f64) -> f64 {
    if x <= 0.0 {
        x.trunc() - 1.0
    } else {
        x.trunc()
    }
}

/// `max(0, 0.6 − |d|²)⁴ · (g · d)`
#[inline]
fn corner(gi: usize, x: f64, y: f64, z: f64) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t < 0.0 {
        return 0.0;
    }
    let g = GRAD3[gi];
    let t2 = t * t;
    t2 * t2 * (g[0] * x + g[1] * y + g[2] * z)
}

impl NoiseFn<f64, 3> for Simplex {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.noise(point[0], point[1], point[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_points(n: usize) -> Vec<[f64; 3]> {
        let mut state: u64 = 99;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 * 200.0 - 100.0
        };
        (0..n).map(|_| [next(), next(), next()]).collect()
    }

    #[test]
    fn output_is_bounded() {
        for seed in [0, 1, 42, 123_123, -7] {
            let s = Simplex::new(seed, 4.0, 0.6, 1.3).unwrap();
            for p in sample_points(2000) {
                let v = s.get(p);
                assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&v), "seed {seed}: {v} out of [-1, 1]");
            }
        }
    }

    #[test]
    fn normalized_is_affine_remap() {
        let s = Simplex::new(5, 3.0, 0.5, 2.0).unwrap();
        for [x, y, z] in sample_points(200) {
            assert_eq!(s.noise_normalized(x, y, z), (s.noise(x, y, z) + 1.0) * 0.5);
        }
    }

    #[test]
    fn origin_is_zero() {
        let s = Simplex::canonical(1.0, 0.5, 1.0).unwrap();
        assert_eq!(s.noise(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn seeded_tables_are_pinned() {
        let cases: [(i32, [u8; 8]); 3] = [
            (0, [93, 234, 74, 207, 18, 96, 55, 129]),
            (42, [46, 31, 232, 89, 153, 42, 1, 208]),
            (-7, [108, 247, 62, 214, 183, 3, 224, 112]),
        ];
        for (seed, head) in cases {
            let table = PermutationTable::seeded(seed);
            assert_eq!(table.perm[..8], head, "seed {seed}");
            let mut sorted = table.perm[..256].to_vec();
            sorted.sort_unstable();
            assert!(sorted.iter().enumerate().all(|(i, &v)| v as usize == i), "seed {seed} is not a permutation");
            assert_eq!(table.perm[..256], table.perm[256..]);
        }
    }

    #[test]
    fn fast_floor_steps_down_at_non_positive_integers() {
        assert_eq!(fast_floor(2.7), 2.0);
        assert_eq!(fast_floor(3.0), 3.0);
        assert_eq!(fast_floor(-1.5), -2.0);
        assert_eq!(fast_floor(0.0), -1.0);
        assert_eq!(fast_floor(-2.0), -3.0);
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let a = Simplex::new(824, 3.0, 0.5, 22.0).unwrap();
        let b = Simplex::new(824, 3.0, 0.5, 22.0).unwrap();
        for p in sample_points(500) {
            assert_eq!(a.get(p).to_bits(), b.get(p).to_bits());
        }
    }

    #[test]
    fn seeds_do_not_interfere() {
        let a = Simplex::new(1, 2.0, 0.5, 1.0).unwrap();
        let before: Vec<f64> = sample_points(50).into_iter().map(|p| a.get(p)).collect();
        let _other = Simplex::new(2, 2.0, 0.5, 1.0).unwrap();
        let after: Vec<f64> = sample_points(50).into_iter().map(|p| a.get(p)).collect();
        assert_eq!(before, after, "constructing another seed must not disturb an existing generator");
        let c = Simplex::new(2, 2.0, 0.5, 1.0).unwrap();
        let differs = sample_points(50).into_iter().any(|p| a.get(p) != c.get(p));
        assert!(differs, "different seeds should give different noise");
    }

    #[test]
    fn single_octave_equals_base_noise() {
        let one = Simplex::new(9, 1.0, 0.25, 1.7).unwrap();
        let other_persistence = Simplex::new(9, 1.0, 0.9, 1.7).unwrap();
        for [x, y, z] in sample_points(200) {
            let base = one.value(x * 1.7, y * 1.7, z * 1.7);
            assert_relative_eq!(one.noise(x, y, z), base, epsilon = 1e-15);
            assert_eq!(one.noise(x, y, z), other_persistence.noise(x, y, z));
        }
    }

    #[test]
    fn fractional_octaves_run_an_extra_octave() {
        let two = Simplex::new(3, 2.0, 0.5, 1.0).unwrap();
        let two_and_half = Simplex::new(3, 2.5, 0.5, 1.0).unwrap();
        let three = Simplex::new(3, 3.0, 0.5, 1.0).unwrap();
        let p = [0.37, -1.21, 2.9];
        assert_eq!(two_and_half.get(p), three.get(p));
        assert_ne!(two_and_half.get(p), two.get(p));
    }

    #[test]
    fn persistence_override_leaves_the_generator_unchanged() {
        let s = Simplex::new(5, 4.0, 0.5, 2.0).unwrap();
        let p = [0.3, -0.8, 1.7];
        assert_eq!(s.noise_with_persistence(p[0], p[1], p[2], 0.5), s.noise(p[0], p[1], p[2]));
        assert_ne!(s.noise_with_persistence(p[0], p[1], p[2], 0.9), s.noise(p[0], p[1], p[2]));
        assert_eq!(s.persistence(), 0.5);
        let n = s.noise_normalized_with_persistence(p[0], p[1], p[2], 0.9);
        assert_eq!(n, (s.noise_with_persistence(p[0], p[1], p[2], 0.9) + 1.0) * 0.5);
    }

    #[test]
    fn rejects_non_positive_octaves() {
        assert!(Simplex::new(0, 0.0, 0.5, 1.0).is_err());
        assert!(Simplex::new(0, f64::NAN, 0.5, 1.0).is_err());
    }

    #[test]
    fn parallel_evaluation_matches_sequential() {
        let s = std::sync::Arc::new(Simplex::new(77, 4.0, 0.5, 3.0).unwrap());
        let points = sample_points(256);
        let expected: Vec<u64> = points.iter().map(|&p| s.get(p).to_bits()).collect();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = s.clone();
                let points = points.clone();
                std::thread::spawn(move || points.iter().map(|&p| s.get(p).to_bits()).collect::<Vec<u64>>())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }
}
