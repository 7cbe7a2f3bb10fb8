//! Height mods driven by procedural noise graphs built at setup.

use noise::NoiseFn;
use serde::{Deserialize, Serialize};

use super::{non_zero, PqsMod, SphereInfo};
use crate::curve::HermiteCurve;
use crate::error::{PqsError, Result};
use crate::noise::{
    Billow, FractalNoiseConfig, NoiseNode, NoiseQuality, Perlin, RidgedMultifractal, ScaleBias, Select, Simplex,
    SimplexConfig, Voronoi,
};
use crate::vertex::VertexBuildData;

/// Adds simplex noise remapped to [0, 1] and scaled by `deformity`.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexHeightAbsolute {
    pub simplex: SimplexConfig,
    pub deformity: f64,
    #[serde(skip)]
    noise: Option<Simplex>,
}

impl SimplexHeightAbsolute {
    pub fn new(simplex: SimplexConfig, deformity: f64) -> Self {
        Self { simplex, deformity, noise: None }
    }
}

impl PqsMod for SimplexHeightAbsolute {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.noise = Some(self.simplex.build()?);
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(s) = &self.noise {
            let [x, y, z] = data.point();
            data.height += s.noise_normalized(x, y, z) * self.deformity;
        }
    }

    fn min_height(&self) -> f64 {
        -self.deformity
    }

    fn max_height(&self) -> f64 {
        self.deformity
    }
}

/// Raises terrain only where normalised simplex noise exceeds `cutoff`.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexHeightFlatten {
    pub simplex: SimplexConfig,
    pub deformity: f64,
    /// In (0, 1].
    pub cutoff: f64,
    #[serde(skip)]
    noise: Option<Simplex>,
}

impl Default for SimplexHeightFlatten {
    fn default() -> Self {
        Self { simplex: SimplexConfig::default(), deformity: 0.0, cutoff: 0.5, noise: None }
    }
}

impl PqsMod for SimplexHeightFlatten {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        if !(self.cutoff > 0.0 && self.cutoff <= 1.0) {
            return Err(PqsError::InvalidParameter { what: "simplex flatten cutoff", value: self.cutoff });
        }
        self.noise = Some(self.simplex.build()?);
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let Some(s) = &self.noise else { return };
        let [x, y, z] = data.point();
        let value = s.noise_normalized(x, y, z);
        if value > self.cutoff {
            data.height += self.deformity * ((value - self.cutoff) / self.cutoff);
        }
    }

    fn min_height(&self) -> f64 {
        -self.deformity
    }

    fn max_height(&self) -> f64 {
        self.deformity
    }
}

/// Adds `fractal(direction) · deformity`.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightNoise {
    pub noise: FractalNoiseConfig,
    pub deformity: f64,
    #[serde(skip)]
    node: Option<NoiseNode>,
}

impl HeightNoise {
    pub fn new(noise: FractalNoiseConfig, deformity: f64) -> Self {
        Self { noise, deformity, node: None }
    }
}

impl PqsMod for HeightNoise {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.node = Some(self.noise.build());
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(node) = &self.node {
            data.height += node.get(data.point()) * self.deformity;
        }
    }
}

/// Mesas, plains and mountains: a Perlin controller selects between
/// flattened billow plains and ridged mountains. Sampled at the vertex's
/// position on the sphere surface, so `smoothness` values are in metres.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct VertexNoise {
    pub seed: i32,
    pub noise_deformity: f64,
    pub noise_passes: u32,
    pub smoothness: f64,
    pub falloff: f64,
    pub mesa_vs_plains_bias: f64,
    pub plains_vs_mountain_smoothness: f64,
    pub plains_vs_mountain_threshold: f64,
    pub plain_smoothness: f64,
    #[serde(skip)]
    pub terrain: Option<NoiseNode>,
}

impl Default for VertexNoise {
    fn default() -> Self {
        Self {
            seed: 0,
            noise_deformity: 1.0,
            noise_passes: 6,
            smoothness: 1.0,
            falloff: 2.0,
            mesa_vs_plains_bias: 0.0,
            plains_vs_mountain_smoothness: 1.0,
            plains_vs_mountain_threshold: 0.0,
            plain_smoothness: 1.0,
            terrain: None,
        }
    }
}

impl PqsMod for VertexNoise {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        let smoothness = non_zero("vertex noise smoothness", self.smoothness)?;
        let plain_smoothness = non_zero("vertex noise plain smoothness", self.plain_smoothness)?;
        let pvm_smoothness = non_zero("vertex noise plains/mountain smoothness", self.plains_vs_mountain_smoothness)?;
        let falloff = non_zero("vertex noise falloff", self.falloff)?;

        let billow = Billow::new(2.0 / smoothness, 2.0, 0.5, 6, self.seed, NoiseQuality::Medium);
        let plains = ScaleBias::new(1.0 / plain_smoothness, self.mesa_vs_plains_bias, Box::new(billow));
        let mountains =
            RidgedMultifractal::new(1.0 / smoothness, 2.0, self.noise_passes, self.seed, NoiseQuality::Medium);
        let controller =
            Perlin::new(1.0 / pvm_smoothness, 2.0, 1.0 / falloff, self.noise_passes, self.seed, NoiseQuality::Medium);

        let select = Select::new(
            Box::new(plains),
            Box::new(mountains),
            Box::new(controller),
            0.0,
            1.0,
            self.plains_vs_mountain_threshold,
        )?;
        self.terrain = Some(Box::new(select));
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        if let Some(terrain) = &self.terrain {
            let p = (data.direction * sphere.radius).to_array();
            data.height += terrain.get(p) * self.noise_deformity;
        }
    }

    fn max_height(&self) -> f64 {
        self.noise_deformity
    }
}

/// Adds `voronoi(direction) · deformation`.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct VertexVoronoi {
    pub deformation: f64,
    pub seed: i32,
    pub displacement: f64,
    pub frequency: f64,
    pub enable_distance: bool,
    #[serde(skip)]
    voronoi: Option<Voronoi>,
}

impl Default for VertexVoronoi {
    fn default() -> Self {
        Self { deformation: 1000.0, seed: 0, displacement: 1.0, frequency: 1.0, enable_distance: false, voronoi: None }
    }
}

impl PqsMod for VertexVoronoi {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.voronoi = Some(Voronoi::new(self.frequency, self.displacement, self.seed, self.enable_distance)?);
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(v) = &self.voronoi {
            data.height += v.get(data.point()) * self.deformation;
        }
    }
}

/// Ridged multifractal parameters for [`HeightNoiseVertHeightCurve2`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgedSettings {
    pub seed: i32,
    pub frequency: f64,
    pub lacunarity: f64,
    pub octaves: u32,
}

impl Default for RidgedSettings {
    fn default() -> Self {
        Self { seed: 0, frequency: 1.0, lacunarity: 2.0, octaves: 6 }
    }
}

impl RidgedSettings {
    fn build(&self, quality: NoiseQuality) -> RidgedMultifractal {
        RidgedMultifractal::new(self.frequency, self.lacunarity, self.octaves, self.seed, quality)
    }
}

/// Ridge detail that grows with altitude.
///
/// The current height above `radius_min` is mapped into [0, 1] across
/// `[simplex_height_start, simplex_height_end]` and shaped by `simplex_curve`;
/// that weight times normalised simplex noise scales the clamped difference of
/// two ridged generators.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct HeightNoiseVertHeightCurve2 {
    pub deformity: f64,
    pub simplex_curve: HermiteCurve,
    pub simplex_height_start: f64,
    pub simplex_height_end: f64,
    pub simplex: SimplexConfig,
    pub ridged_add: RidgedSettings,
    pub ridged_sub: RidgedSettings,
    pub ridged_mode: NoiseQuality,
    #[serde(skip)]
    built: Option<CurveNoise>,
}

struct CurveNoise {
    simplex: Simplex,
    add: RidgedMultifractal,
    sub: RidgedMultifractal,
}

impl Default for HeightNoiseVertHeightCurve2 {
    fn default() -> Self {
        Self {
            deformity: 0.0,
            simplex_curve: HermiteCurve::linear(),
            simplex_height_start: 0.0,
            simplex_height_end: 1.0,
            simplex: SimplexConfig::default(),
            ridged_add: RidgedSettings::default(),
            ridged_sub: RidgedSettings { seed: 1, ..Default::default() },
            ridged_mode: NoiseQuality::Medium,
            built: None,
        }
    }
}

impl HeightNoiseVertHeightCurve2 {
    /// Altitude weight in [0, 1] for a height above `radius_min`.
    fn altitude_t(&self, h: f64) -> f64 {
        band_weight(h, self.simplex_height_start, self.simplex_height_end)
    }
}

/// 0 at or below `start`, 1 at or above `end`, linear between.
fn band_weight(h: f64, start: f64, end: f64) -> f64 {
    if h <= start {
        0.0
    } else if h < end {
        (h - start) / (end - start)
    } else {
        1.0
    }
}

fn check_band(what: &'static str, start: f64, end: f64) -> Result<()> {
    if !(start < end) {
        return Err(PqsError::InvalidRange { what, min: start, max: end });
    }
    Ok(())
}

/// Noise sample clamped to [-1, 1] and remapped to [0, 1].
fn unit_noise(node: &NoiseNode, p: [f64; 3]) -> f64 {
    (node.get(p).clamp(-1.0, 1.0) + 1.0) * 0.5
}

impl PqsMod for HeightNoiseVertHeightCurve2 {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        check_band("simplex height band", self.simplex_height_start, self.simplex_height_end)?;
        self.built = Some(CurveNoise {
            simplex: self.simplex.build()?,
            add: self.ridged_add.build(self.ridged_mode),
            sub: self.ridged_sub.build(self.ridged_mode),
        });
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let Some(n) = &self.built else { return };
        let t = self.altitude_t(data.height - sphere.radius_min);
        let [x, y, z] = data.point();
        let s = n.simplex.noise_normalized(x, y, z) * self.simplex_curve.evaluate(t);
        if s == 0.0 {
            return;
        }
        let p = data.point();
        let r = (n.add.get(p) - n.sub.get(p)).clamp(-1.0, 1.0);
        data.height += (r + 1.0) * 0.5 * self.deformity * s;
    }

    fn max_height(&self) -> f64 {
        self.deformity
    }
}

/// Fractal noise added only inside a band of the sphere's normalised height.
///
/// The current height is normalised against `radius_min..radius_max`. Vertices
/// outside `[height_start, height_end]` are untouched; inside, the noise is
/// weighted by the position across the band, so it fades in from `height_start`.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct HeightNoiseVertHeight {
    pub noise: FractalNoiseConfig,
    pub deformity: f64,
    /// Fraction of the sphere's height range, usually in [0, 1].
    pub height_start: f64,
    pub height_end: f64,
    #[serde(skip)]
    node: Option<NoiseNode>,
}

impl Default for HeightNoiseVertHeight {
    fn default() -> Self {
        Self { noise: FractalNoiseConfig::default(), deformity: 0.0, height_start: 0.0, height_end: 1.0, node: None }
    }
}

impl HeightNoiseVertHeight {
    pub fn new(noise: FractalNoiseConfig, deformity: f64, height_start: f64, height_end: f64) -> Self {
        Self { noise, deformity, height_start, height_end, node: None }
    }
}

impl PqsMod for HeightNoiseVertHeight {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        check_band("noise height band", self.height_start, self.height_end)?;
        self.node = Some(self.noise.build());
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let Some(node) = &self.node else { return };
        let h = (data.height - sphere.radius_min) / sphere.radius_delta();
        // Also rejects NaN from a sphere with no height range.
        if !(h >= self.height_start && h <= self.height_end) {
            return;
        }
        let weight = (h - self.height_start) / (self.height_end - self.height_start);
        data.height += unit_noise(node, data.point()) * self.deformity * weight;
    }

    fn max_height(&self) -> f64 {
        self.deformity
    }
}

/// Fractal noise weighted by a curve of the altitude above `radius_min`.
///
/// Altitude in metres maps to [0, 1] across `[height_start, height_end]`
/// (clamped outside it) and `curve` turns that into the noise weight.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct HeightNoiseVertHeightCurve {
    pub noise: FractalNoiseConfig,
    pub deformity: f64,
    pub curve: HermiteCurve,
    pub height_start: f64,
    pub height_end: f64,
    #[serde(skip)]
    node: Option<NoiseNode>,
}

impl Default for HeightNoiseVertHeightCurve {
    fn default() -> Self {
        Self {
            noise: FractalNoiseConfig::default(),
            deformity: 0.0,
            curve: HermiteCurve::linear(),
            height_start: 0.0,
            height_end: 1.0,
            node: None,
        }
    }
}

impl PqsMod for HeightNoiseVertHeightCurve {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        check_band("noise height band", self.height_start, self.height_end)?;
        self.node = Some(self.noise.build());
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let Some(node) = &self.node else { return };
        let t = band_weight(data.height - sphere.radius_min, self.height_start, self.height_end);
        data.height += unit_noise(node, data.point()) * self.deformity * self.curve.evaluate(t);
    }

    fn max_height(&self) -> f64 {
        self.deformity
    }
}
