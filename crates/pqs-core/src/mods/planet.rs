//! Whole-planet terrain from layered continental noise, with land-class
//! colouring driven by the same relief.

use noise::NoiseFn;
use serde::{Deserialize, Serialize};

use super::{non_zero, PqsMod, SphereInfo};
use crate::color::Color;
use crate::curve::cubic_hermite;
use crate::error::{PqsError, Result};
use crate::noise::{NoiseQuality, RidgedMultifractal, Simplex};
use crate::vertex::VertexBuildData;

/// One simplex layer of the planet. The seed comes from [`VertexPlanet::seed`]
/// plus a fixed per-layer offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetSimplex {
    pub deformity: f64,
    pub octaves: f64,
    pub persistence: f64,
    pub frequency: f64,
}

impl Default for PlanetSimplex {
    fn default() -> Self {
        Self { deformity: 1.0, octaves: 4.0, persistence: 0.5, frequency: 1.0 }
    }
}

impl PlanetSimplex {
    fn build(&self, seed: i32) -> Result<Simplex> {
        Simplex::new(seed, self.octaves, self.persistence, self.frequency)
    }
}

/// Ridged layer that sharpens continents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetRidged {
    pub deformity: f64,
    pub octaves: u32,
    /// Handed to the ridged generator as its lacunarity.
    pub persistence: f64,
    pub frequency: f64,
}

impl Default for PlanetRidged {
    fn default() -> Self {
        Self { deformity: 1.0, octaves: 4, persistence: 2.0, frequency: 1.0 }
    }
}

/// A colour band over the planet's terrain fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetLandClass {
    pub name: String,
    pub fractal_start: f64,
    pub fractal_end: f64,
    pub base_color: Color,
    /// Colour the base is pulled toward where the class noise is high.
    pub color_noise: Color,
    pub color_noise_amount: f64,
    pub color_noise_map: PlanetSimplex,
    pub lerp_to_next: bool,
}

impl Default for PlanetLandClass {
    fn default() -> Self {
        Self {
            name: String::new(),
            fractal_start: 0.0,
            fractal_end: 1.0,
            base_color: Color::WHITE,
            color_noise: Color::WHITE,
            color_noise_amount: 0.0,
            color_noise_map: PlanetSimplex::default(),
            lerp_to_next: false,
        }
    }
}

impl PlanetLandClass {
    pub fn new(name: impl Into<String>, fractal_start: f64, fractal_end: f64, base_color: Color) -> Self {
        Self { name: name.into(), fractal_start, fractal_end, base_color, color_noise: base_color, ..Default::default() }
    }
}

/// Continents, ridges and ocean floors from a single seed.
///
/// Height: a continental simplex (its persistence modulated by a smoothed
/// copy of itself) plus ridged sharpening, normalised, then split at
/// `ocean_level`. Land is roughened and shaped by a Hermite profile; ocean is
/// a linear depth or a snapped floor. The result is rounded to five decimals
/// and scaled by `deformity`.
///
/// Colour: either a grey ramp of altitude (`build_height_colors`) or a land
/// class picked from the pre-shaping relief, terrain-type noise and altitude.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct VertexPlanet {
    pub seed: i32,
    pub deformity: f64,
    pub color_deformity: f64,
    pub ocean_level: f64,
    pub ocean_step: f64,
    pub ocean_depth: f64,
    pub ocean_snap: bool,
    pub terrain_smoothing: f64,
    pub terrain_shape_start: f64,
    pub terrain_shape_end: f64,
    pub terrain_ridges_min: f64,
    pub terrain_ridges_max: f64,
    pub terrain_ridge_balance: f64,
    pub continental: PlanetSimplex,
    pub continental_ruggedness: PlanetSimplex,
    pub continental_sharpness: PlanetRidged,
    pub continental_sharpness_map: PlanetSimplex,
    pub terrain_type: PlanetSimplex,
    pub build_height_colors: bool,
    pub land_classes: Vec<PlanetLandClass>,
    #[serde(skip)]
    built: Option<PlanetNoise>,
}

struct PlanetNoise {
    continental: Simplex,
    ruggedness: Simplex,
    sharpness: RidgedMultifractal,
    sharpness_map: Simplex,
    terrain_type: Simplex,
    land_classes: Vec<Simplex>,
}

/// Relief at one direction before and after land shaping.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Relief {
    pre_smooth: f64,
    height: f64,
}

impl Default for VertexPlanet {
    fn default() -> Self {
        Self {
            seed: 0,
            deformity: 0.0,
            color_deformity: 1.0,
            ocean_level: 0.0,
            ocean_step: 0.0,
            ocean_depth: 0.0,
            ocean_snap: false,
            terrain_smoothing: 0.25,
            terrain_shape_start: 2.0,
            terrain_shape_end: -2.0,
            terrain_ridges_min: 0.4,
            terrain_ridges_max: 1.0,
            terrain_ridge_balance: 0.1,
            continental: PlanetSimplex::default(),
            continental_ruggedness: PlanetSimplex::default(),
            continental_sharpness: PlanetRidged::default(),
            continental_sharpness_map: PlanetSimplex::default(),
            terrain_type: PlanetSimplex::default(),
            build_height_colors: false,
            land_classes: Vec::new(),
            built: None,
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl VertexPlanet {
    /// Pure function of the direction, so both hooks can evaluate it without
    /// sharing per-vertex state.
    fn relief(&self, n: &PlanetNoise, p: [f64; 3]) -> Relief {
        let [x, y, z] = p;
        // The smoothing layer shares the continental seed and settings; only
        // its persistence, used below as a scalar, differs.
        let smoothed = n.continental.noise_normalized(x, y, z);
        let smoothing_persistence = self.continental.persistence * self.terrain_smoothing;
        let persistence = self.continental.persistence - smoothing_persistence * smoothed;
        let mut height = n.continental.noise_normalized_with_persistence(x, y, z, persistence);

        let ridges = self.continental_sharpness.deformity;
        let mut sharpness = (n.sharpness.get(p) + 1.0) * 0.5;
        sharpness *= lerp(ridges, ridges * self.terrain_ridge_balance, (smoothed + sharpness) * 0.5);

        let (lo, hi) = (self.terrain_ridges_min, self.terrain_ridges_max);
        let ridge_map = ((n.sharpness_map.noise(x, y, z) + 1.0) * 0.5).clamp(lo, hi);
        let ridge_map = (ridge_map - lo) / (hi - lo) * self.continental_sharpness_map.deformity;
        sharpness += lerp(0.0, sharpness, ridge_map);

        height += sharpness;
        height /= 1.0 + ridges * self.continental_sharpness_map.deformity;

        let delta = (height - self.ocean_level) / (1.0 - self.ocean_level);
        if height >= self.ocean_level {
            let rugged = n.ruggedness.noise_normalized_with_persistence(
                x,
                y,
                z,
                self.continental_ruggedness.persistence * delta,
            ) * delta
                * delta;
            let (cd, rd) = (self.continental.deformity, self.continental_ruggedness.deformity);
            let land = (delta * cd + rugged * rd) / (cd + rd);
            Relief {
                pre_smooth: land,
                height: cubic_hermite(0.0, 1.0, self.terrain_shape_start, self.terrain_shape_end, land),
            }
        } else {
            let sea = if self.ocean_snap { -self.ocean_step } else { delta * self.ocean_depth - self.ocean_step };
            Relief { pre_smooth: sea, height: sea }
        }
    }

    fn land_class_color(&self, n: &PlanetNoise, index: usize, p: [f64; 3]) -> Option<Color> {
        let lc = self.land_classes.get(index)?;
        let noise = n.land_classes.get(index)?;
        let [x, y, z] = p;
        let amount = lc.color_noise_amount * noise.noise_normalized(x, y, z);
        Some(lc.base_color.lerp(lc.color_noise, amount as f32))
    }

    /// First class whose band contains `t`, falling back to the first class.
    fn select_land_class(&self, t: f64) -> usize {
        self.land_classes.iter().position(|lc| t >= lc.fractal_start && t <= lc.fractal_end).unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        non_zero("planet colour deformity", self.color_deformity)?;
        non_zero("planet ocean level distance from 1", 1.0 - self.ocean_level)?;
        non_zero(
            "planet continental plus ruggedness deformity",
            self.continental.deformity + self.continental_ruggedness.deformity,
        )?;
        non_zero(
            "planet sharpness normaliser",
            1.0 + self.continental_sharpness.deformity * self.continental_sharpness_map.deformity,
        )?;
        if !(self.terrain_ridges_min < self.terrain_ridges_max) {
            return Err(PqsError::InvalidRange {
                what: "planet terrain ridges",
                min: self.terrain_ridges_min,
                max: self.terrain_ridges_max,
            });
        }
        if self.build_height_colors {
            return Ok(());
        }
        let Some(last) = self.land_classes.last() else {
            return Err(PqsError::missing(self.kind(), "at least one land class"));
        };
        if last.lerp_to_next {
            return Err(PqsError::InvalidParameter { what: "lerp_to_next on the last land class", value: 1.0 });
        }
        if let Some(bad) = self.land_classes.iter().find(|lc| !(lc.fractal_start < lc.fractal_end)) {
            return Err(PqsError::InvalidRange {
                what: "planet land class band",
                min: bad.fractal_start,
                max: bad.fractal_end,
            });
        }
        Ok(())
    }
}

impl PqsMod for VertexPlanet {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.validate()?;
        let seed = self.seed;
        let land_classes = self
            .land_classes
            .iter()
            .enumerate()
            .map(|(i, lc)| lc.color_noise_map.build(seed.wrapping_add(i as i32).wrapping_add(10)))
            .collect::<Result<Vec<_>>>()?;
        let sharp = self.continental_sharpness;
        self.built = Some(PlanetNoise {
            continental: self.continental.build(seed)?,
            ruggedness: self.continental_ruggedness.build(seed.wrapping_add(1))?,
            terrain_type: self.terrain_type.build(seed.wrapping_add(2))?,
            sharpness: RidgedMultifractal::new(
                sharp.frequency,
                sharp.persistence,
                sharp.octaves,
                seed.wrapping_add(3),
                NoiseQuality::High,
            ),
            sharpness_map: self.continental_sharpness_map.build(seed.wrapping_add(4))?,
            land_classes,
        });
        log::debug!("planet seed {seed}: {} land classes", self.land_classes.len());
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let Some(n) = &self.built else { return };
        let relief = self.relief(n, data.point());
        data.height += (relief.height * 1e5).round_ties_even() / 1e5 * self.deformity;
    }

    fn build_color(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let Some(n) = &self.built else { return };
        let altitude = (data.height - sphere.radius) / self.color_deformity;
        if self.build_height_colors {
            let grey = altitude as f32;
            (data.color.r, data.color.g, data.color.b) = (grey, grey, grey);
            return;
        }

        let p = data.point();
        let [x, y, z] = p;
        let relief = self.relief(n, p);
        let terrain = n.terrain_type.noise_normalized(x, y, z);
        let t = ((relief.pre_smooth + terrain * self.terrain_type.deformity) * altitude).clamp(0.0, 1.0);

        let index = self.select_land_class(t);
        let (Some(lc), Some(mut color)) = (self.land_classes.get(index), self.land_class_color(n, index, p)) else {
            return;
        };
        if lc.lerp_to_next {
            if let Some(next) = self.land_class_color(n, index + 1, p) {
                let along = (t - lc.fractal_start) / (lc.fractal_end - lc.fractal_start);
                color = color.lerp(next, along as f32);
            }
        }
        color.a = relief.pre_smooth as f32;
        data.color = color;
    }

    fn max_height(&self) -> f64 {
        self.deformity
    }
}
