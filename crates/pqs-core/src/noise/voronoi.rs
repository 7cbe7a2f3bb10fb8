//! Voronoi cell noise over a precomputed grid of jittered lattice points.
//!
//! The grid is built once at construction and sized from `frequency`, which
//! is why frequency (and every other setting) is fixed for the lifetime of
//! the node. Evaluation scans the 5×5×5 neighbourhood of the query's cell.

use noise::NoiseFn;
use serde::{Deserialize, Serialize};

use super::coherent::{lattice_floor, value_noise_3d, SQRT_3};
use crate::error::{PqsError, Result};

/// Largest accepted frequency; the grid grows with its cube.
pub const MAX_VORONOI_FREQUENCY: f64 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoronoiConfig {
    pub frequency: f64,
    pub displacement: f64,
    pub seed: i32,
    pub use_distance: bool,
}

impl Default for VoronoiConfig {
    fn default() -> Self {
        Self { frequency: 1.0, displacement: 1.0, seed: 0, use_distance: false }
    }
}

impl VoronoiConfig {
    pub fn build(&self) -> Result<Voronoi> {
        Voronoi::new(self.frequency, self.displacement, self.seed, self.use_distance)
    }
}

#[derive(Debug, Clone)]
pub struct Voronoi {
    frequency: f64,
    displacement: f64,
    seed: i32,
    use_distance: bool,
    /// Cells per axis.
    side: usize,
    /// Lattice coordinate stored at index 0 along each axis is `-offset`.
    offset: i32,
    cells: Vec<[f64; 3]>,
}

impl Voronoi {
    pub fn new(frequency: f64, displacement: f64, seed: i32, use_distance: bool) -> Result<Self> {
        if !(frequency > 0.0 && frequency <= MAX_VORONOI_FREQUENCY) {
            return Err(PqsError::InvalidParameter { what: "voronoi frequency", value: frequency });
        }
        if !displacement.is_finite() {
            return Err(PqsError::InvalidParameter { what: "voronoi displacement", value: displacement });
        }

        let offset = (frequency + 3.0).ceil() as i32;
        let side = 2 * offset as usize;
        let mut cells = Vec::with_capacity(side * side * side);
        for z in 0..side as i32 {
            for y in 0..side as i32 {
                for x in 0..side as i32 {
                    let (lx, ly, lz) = (x - offset, y - offset, z - offset);
                    cells.push([
                        lx as f64 + value_noise_3d(lx, ly, lz, seed),
                        ly as f64 + value_noise_3d(lx, ly, lz, seed.wrapping_add(1)),
                        lz as f64 + value_noise_3d(lx, ly, lz, seed.wrapping_add(2)),
                    ]);
                }
            }
        }
        log::debug!("voronoi grid: {side}³ cells for frequency {frequency}");

        Ok(Self { frequency, displacement, seed, use_distance, side, offset, cells })
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn use_distance(&self) -> bool {
        self.use_distance
    }

    /// Whether `point` lies inside the region the cached grid supports.
    pub fn covers(&self, point: [f64; 3]) -> bool {
        point.iter().all(|&c| {
            let i = lattice_floor(c * self.frequency);
            i - 2 >= -self.offset && i + 2 < self.offset
        })
    }

    #[inline]
    fn cell(&self, x: i32, y: i32, z: i32) -> [f64; 3] {
        let (ix, iy, iz) = ((x + self.offset) as usize, (y + self.offset) as usize, (z + self.offset) as usize);
        self.cells[ix + self.side * (iy + self.side * iz)]
    }

    /// Nearest cached cell point to the already-scaled coordinate.
    fn nearest(&self, x: f64, y: f64, z: f64) -> [f64; 3] {
        let (xi, yi, zi) = (lattice_floor(x), lattice_floor(y), lattice_floor(z));
        let mut best = f64::MAX;
        let mut nearest = [0.0; 3];
        for cz in zi - 2..=zi + 2 {
            for cy in yi - 2..=yi + 2 {
                for cx in xi - 2..=xi + 2 {
                    let c = self.cell(cx, cy, cz);
                    let (dx, dy, dz) = (c[0] - x, c[1] - y, c[2] - z);
                    let d = dx * dx + dy * dy + dz * dz;
                    if d < best {
                        best = d;
                        nearest = c;
                    }
                }
            }
        }
        nearest
    }
}

impl NoiseFn<f64, 3> for Voronoi {
    /// # Panics
    /// When `point` lies outside the cached grid (see [`Voronoi::covers`]);
    /// unit-sphere directions are always covered.
    fn get(&self, point: [f64; 3]) -> f64 {
        let x = point[0] * self.frequency;
        let y = point[1] * self.frequency;
        let z = point[2] * self.frequency;
        let c = self.nearest(x, y, z);

        let distance_term = if self.use_distance {
            let (dx, dy, dz) = (c[0] - x, c[1] - y, c[2] - z);
            (dx * dx + dy * dy + dz * dz).sqrt() * SQRT_3 - 1.0
        } else {
            0.0
        };
        let cell_value = value_noise_3d(c[0].floor() as i32, c[1].floor() as i32, c[2].floor() as i32, 0);
        distance_term + self.displacement * cell_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::Vec3;

    fn directions() -> Vec<[f64; 3]> {
        let mut out = Vec::new();
        for lat in (-85..=85).step_by(17) {
            for lon in (-180..180).step_by(23) {
                out.push(Vec3::from_latlon(lat as f64, lon as f64).to_array());
            }
        }
        out
    }

    #[test]
    fn rejects_degenerate_frequency() {
        assert!(Voronoi::new(0.0, 1.0, 0, false).is_err());
        assert!(Voronoi::new(-3.0, 1.0, 0, false).is_err());
        assert!(Voronoi::new(f64::NAN, 1.0, 0, false).is_err());
        assert!(Voronoi::new(MAX_VORONOI_FREQUENCY * 2.0, 1.0, 0, false).is_err());
    }

    #[test]
    fn grid_size_follows_frequency() {
        let v = Voronoi::new(22.0, 0.0, 824, true).unwrap();
        assert_eq!(v.side, 50);
        assert_eq!(v.cells.len(), 50 * 50 * 50);
    }

    #[test]
    fn unit_directions_are_covered() {
        let v = Voronoi::new(5.0, 1.0, 3, false).unwrap();
        for d in directions() {
            assert!(v.covers(d), "{d:?} should be covered");
        }
        assert!(!v.covers([40.0, 0.0, 0.0]));
    }

    #[test]
    fn neighbourhood_scan_finds_global_nearest() {
        let v = Voronoi::new(3.0, 1.0, 17, false).unwrap();
        for d in directions() {
            let [x, y, z] = d.map(|c| c * v.frequency);
            let brute = v
                .cells
                .iter()
                .min_by(|a, b| {
                    let da = (a[0] - x).powi(2) + (a[1] - y).powi(2) + (a[2] - z).powi(2);
                    let db = (b[0] - x).powi(2) + (b[1] - y).powi(2) + (b[2] - z).powi(2);
                    da.total_cmp(&db)
                })
                .copied()
                .unwrap();
            assert_eq!(v.nearest(x, y, z), brute);
        }
    }

    #[test]
    fn value_without_distance_depends_only_on_nearest_cell() {
        let v = Voronoi::new(4.0, 0.8, 9, false).unwrap();
        for d in directions() {
            let [x, y, z] = d.map(|c| c * v.frequency);
            let c = v.nearest(x, y, z);
            let expected = 0.8 * value_noise_3d(c[0].floor() as i32, c[1].floor() as i32, c[2].floor() as i32, 0);
            assert_eq!(v.get(d), expected);

            // Moving toward the owning cell point keeps the same cell.
            let toward = [
                (x + (c[0] - x) * 0.5) / v.frequency,
                (y + (c[1] - y) * 0.5) / v.frequency,
                (z + (c[2] - z) * 0.5) / v.frequency,
            ];
            assert_eq!(v.get(toward), expected);
        }
    }

    #[test]
    fn distance_term_adds_to_cell_value() {
        let plain = Voronoi::new(2.0, 1.0, 5, false).unwrap();
        let with_distance = Voronoi::new(2.0, 1.0, 5, true).unwrap();
        for d in directions() {
            let [x, y, z] = d.map(|c| c * 2.0);
            let c = plain.nearest(x, y, z);
            let dist = ((c[0] - x).powi(2) + (c[1] - y).powi(2) + (c[2] - z).powi(2)).sqrt();
            let expected = plain.get(d) + dist * SQRT_3 - 1.0;
            assert!((with_distance.get(d) - expected).abs() < 1e-12);
        }
    }
}
