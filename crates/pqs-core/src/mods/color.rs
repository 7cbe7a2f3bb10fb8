//! Colour mods. They run after every height hook, so they observe the final
//! vertex height.

use std::sync::Arc;

use noise::NoiseFn;
use serde::{Deserialize, Serialize};

use super::{non_zero, require, PqsMod, SphereInfo};
use crate::color::Color;
use crate::error::{PqsError, Result};
use crate::map::MapSampler;
use crate::noise::{FractalNoiseConfig, NoiseNode, Simplex, SimplexConfig};
use crate::vertex::VertexBuildData;

/// Writes altitude above the radius, as a fraction of `atmosphere_depth`, into alpha.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltitudeAlpha {
    pub atmosphere_depth: f64,
    pub invert: bool,
}

impl Default for AltitudeAlpha {
    fn default() -> Self {
        Self { atmosphere_depth: 1.0, invert: false }
    }
}

impl PqsMod for AltitudeAlpha {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        non_zero("atmosphere depth", self.atmosphere_depth)?;
        Ok(())
    }

    fn build_color(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let h = (data.height - sphere.radius) / self.atmosphere_depth;
        let alpha = if self.invert { 1.0 - h } else { h };
        data.color.a = alpha as f32;
    }
}

/// A band of normalised altitude painted with one colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandClass {
    pub name: String,
    /// Start of the band in normalised height, [0, 1] between radius_min and radius_max.
    pub alt_start: f64,
    pub alt_end: f64,
    pub color: Color,
    /// Blend towards the next class's colour across this band.
    pub lerp_to_next: bool,
}

impl Default for LandClass {
    fn default() -> Self {
        Self { name: String::new(), alt_start: 0.0, alt_end: 1.0, color: Color::WHITE, lerp_to_next: false }
    }
}

impl LandClass {
    pub fn new(name: impl Into<String>, alt_start: f64, alt_end: f64, color: Color, lerp_to_next: bool) -> Self {
        Self { name: name.into(), alt_start, alt_end, color, lerp_to_next }
    }
}

/// Colours by altitude band.
///
/// Height is normalised with the sphere's aggregated bounds. The first class
/// whose band contains it wins; heights outside every band use the last class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightColorMap {
    pub land_classes: Vec<LandClass>,
    pub blend: f32,
}

impl Default for HeightColorMap {
    fn default() -> Self {
        Self { land_classes: Vec::new(), blend: 1.0 }
    }
}

impl HeightColorMap {
    pub fn new(land_classes: Vec<LandClass>, blend: f32) -> Self {
        Self { land_classes, blend }
    }

    /// Index of the class for a normalised height. Requires at least one class.
    pub fn select_land_class(&self, height: f64) -> usize {
        self.land_classes
            .iter()
            .position(|lc| height >= lc.alt_start && height <= lc.alt_end)
            .unwrap_or(self.land_classes.len() - 1)
    }
}

impl PqsMod for HeightColorMap {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        let Some(last) = self.land_classes.last() else {
            return Err(PqsError::missing(self.kind(), "at least one land class"));
        };
        if last.lerp_to_next {
            return Err(PqsError::InvalidParameter { what: "lerp_to_next on the last land class", value: 1.0 });
        }
        if let Some(bad) = self.land_classes.iter().find(|lc| !(lc.alt_start <= lc.alt_end)) {
            return Err(PqsError::InvalidRange { what: "land class altitude", min: bad.alt_start, max: bad.alt_end });
        }
        Ok(())
    }

    fn build_color(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        if self.land_classes.is_empty() {
            return;
        }
        let delta = sphere.radius_delta();
        let v_height = if delta > 0.0 { (data.height - sphere.radius_min) / delta } else { 0.0 };
        let index = self.select_land_class(v_height);
        let lc = &self.land_classes[index];
        let target = match self.land_classes.get(index + 1) {
            Some(next) if lc.lerp_to_next => {
                let span = lc.alt_end - lc.alt_start;
                let t = if span > 0.0 { (v_height - lc.alt_start) / span } else { 0.0 };
                lc.color.lerp(next.color, t as f32)
            }
            _ => lc.color,
        };
        data.color = data.color.lerp(target, self.blend);
    }
}

/// Blends a fixed colour in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSolid {
    pub color: Color,
    pub blend: f32,
}

impl Default for ColorSolid {
    fn default() -> Self {
        Self { color: Color::WHITE, blend: 1.0 }
    }
}

impl PqsMod for ColorSolid {
    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        data.color = data.color.lerp(self.color, self.blend);
    }
}

/// Replaces the colour outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSolidBlend {
    pub color: Color,
}

impl PqsMod for ColorSolidBlend {
    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        data.color = self.color;
    }
}

/// Replaces the colour with a map lookup at the vertex UV.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMap {
    #[serde(skip)]
    pub map: Option<Arc<dyn MapSampler>>,
}

impl ColorMap {
    pub fn new(map: Arc<dyn MapSampler>) -> Self {
        Self { map: Some(map) }
    }
}

impl PqsMod for ColorMap {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        require(&self.map, self.kind(), "a colour map")
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(map) = &self.map {
            data.color = map.pixel_color(data.u, data.v);
        }
    }
}

/// Blends a map lookup at the vertex UV into the colour.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMapBlend {
    pub blend: f32,
    #[serde(skip)]
    pub map: Option<Arc<dyn MapSampler>>,
}

impl Default for ColorMapBlend {
    fn default() -> Self {
        Self { blend: 1.0, map: None }
    }
}

impl ColorMapBlend {
    pub fn new(map: Arc<dyn MapSampler>, blend: f32) -> Self {
        Self { blend, map: Some(map) }
    }
}

impl PqsMod for ColorMapBlend {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        require(&self.map, self.kind(), "a colour map")
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(map) = &self.map {
            data.color = data.color.lerp(map.pixel_color(data.u, data.v), self.blend);
        }
    }
}

/// Blends in grey fractal noise remapped to [0, 1].
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct ColorNoise {
    pub noise: FractalNoiseConfig,
    pub blend: f32,
    #[serde(skip)]
    node: Option<NoiseNode>,
}

impl Default for ColorNoise {
    fn default() -> Self {
        Self { noise: FractalNoiseConfig::default(), blend: 1.0, node: None }
    }
}

impl ColorNoise {
    pub fn new(noise: FractalNoiseConfig, blend: f32) -> Self {
        Self { noise, blend, node: None }
    }
}

impl PqsMod for ColorNoise {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.node = Some(self.noise.build());
        Ok(())
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(node) = &self.node {
            let h = ((node.get(data.point()) + 1.0) * 0.5) as f32;
            data.color = data.color.lerp(Color::grey(h), self.blend);
        }
    }
}

/// [`ColorNoise`] with a per-channel gain: the remapped noise value `h`
/// gives the colour `(h·r_blend, h·g_blend, h·b_blend, 1)`.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct ColorNoiseRgb {
    pub noise: FractalNoiseConfig,
    pub r_blend: f32,
    pub g_blend: f32,
    pub b_blend: f32,
    pub blend: f32,
    #[serde(skip)]
    node: Option<NoiseNode>,
}

impl Default for ColorNoiseRgb {
    fn default() -> Self {
        Self { noise: FractalNoiseConfig::default(), r_blend: 1.0, g_blend: 1.0, b_blend: 1.0, blend: 1.0, node: None }
    }
}

impl PqsMod for ColorNoiseRgb {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.node = Some(self.noise.build());
        Ok(())
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(node) = &self.node {
            let h = ((node.get(data.point()) + 1.0) * 0.5) as f32;
            let tint = Color::rgb(h * self.r_blend, h * self.g_blend, h * self.b_blend);
            data.color = data.color.lerp(tint, self.blend);
        }
    }
}

/// Blends in a two-colour ramp driven by simplex noise.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexNoiseColor {
    pub simplex: SimplexConfig,
    pub color_start: Color,
    pub color_end: Color,
    pub blend: f32,
    #[serde(skip)]
    noise: Option<Simplex>,
}

impl Default for SimplexNoiseColor {
    fn default() -> Self {
        Self {
            simplex: SimplexConfig::default(),
            color_start: Color::BLACK,
            color_end: Color::WHITE,
            blend: 1.0,
            noise: None,
        }
    }
}

impl PqsMod for SimplexNoiseColor {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.noise = Some(self.simplex.build()?);
        Ok(())
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let Some(s) = &self.noise else { return };
        let [x, y, z] = data.point();
        let n = s.noise_normalized(x, y, z) as f32;
        data.color = data.color.lerp(self.color_start.lerp(self.color_end, n), self.blend);
    }
}

/// Blends in normalised simplex noise weighted per channel.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexColorRgb {
    pub simplex: SimplexConfig,
    pub r_blend: f32,
    pub g_blend: f32,
    pub b_blend: f32,
    pub blend: f32,
    #[serde(skip)]
    noise: Option<Simplex>,
}

impl Default for SimplexColorRgb {
    fn default() -> Self {
        Self { simplex: SimplexConfig::default(), r_blend: 1.0, g_blend: 1.0, b_blend: 1.0, blend: 1.0, noise: None }
    }
}

impl PqsMod for SimplexColorRgb {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.noise = Some(self.simplex.build()?);
        Ok(())
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let Some(s) = &self.noise else { return };
        let [x, y, z] = data.point();
        let n = s.noise_normalized(x, y, z) as f32;
        let c = Color::rgb(n * self.r_blend, n * self.g_blend, n * self.b_blend);
        data.color = data.color.lerp(c, self.blend);
    }
}

/// One independent simplex field per RGBA channel.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexMultiChromatic {
    pub blend: f32,
    pub red: SimplexConfig,
    pub green: SimplexConfig,
    pub blue: SimplexConfig,
    pub alpha: SimplexConfig,
    #[serde(skip)]
    channels: Option<[Simplex; 4]>,
}

impl Default for SimplexMultiChromatic {
    fn default() -> Self {
        let channel = |seed| SimplexConfig { seed, ..Default::default() };
        Self { blend: 1.0, red: channel(0), green: channel(1), blue: channel(2), alpha: channel(3), channels: None }
    }
}

impl PqsMod for SimplexMultiChromatic {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.channels = Some([self.red.build()?, self.green.build()?, self.blue.build()?, self.alpha.build()?]);
        Ok(())
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let Some(channels) = &self.channels else { return };
        let [x, y, z] = data.point();
        let [r, g, b, a] = channels.each_ref().map(|s| s.noise_normalized(x, y, z) as f32);
        data.color = data.color.lerp(Color::rgba(r, g, b, a), self.blend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapData, MapDepth};
    use crate::mods::test_support::{vertex, vertices};

    const R: f64 = 1000.0;

    #[test]
    fn altitude_alpha_and_inverse() {
        let sphere = SphereInfo::flat(R);
        let mut v = vertex(10.0, 10.0, R + 25.0);
        AltitudeAlpha { atmosphere_depth: 100.0, invert: false }.build_color(&mut v, &sphere);
        assert_eq!(v.color.a, 0.25);
        AltitudeAlpha { atmosphere_depth: 100.0, invert: true }.build_color(&mut v, &sphere);
        assert_eq!(v.color.a, 0.75);
        assert!(AltitudeAlpha { atmosphere_depth: 0.0, invert: false }.setup(R).is_err());
    }

    fn classes() -> HeightColorMap {
        HeightColorMap::new(
            vec![
                LandClass::new("sea", 0.0, 0.3, Color::rgb(0.0, 0.0, 1.0), false),
                LandClass::new("land", 0.3, 0.7, Color::rgb(0.0, 1.0, 0.0), true),
                LandClass::new("snow", 0.7, 1.0, Color::WHITE, false),
            ],
            1.0,
        )
    }

    #[test]
    fn land_class_selection_and_fallback() {
        let m = classes();
        assert_eq!(m.select_land_class(0.1), 0);
        assert_eq!(m.select_land_class(0.5), 1);
        assert_eq!(m.select_land_class(0.9), 2);
        assert_eq!(m.select_land_class(-3.0), 2, "out-of-band heights use the last class");
    }

    #[test]
    fn land_class_colour_uses_sphere_bounds() {
        let mut m = classes();
        m.setup(R).unwrap();
        let sphere = SphereInfo { radius: R, radius_min: R - 100.0, radius_max: R + 100.0 };

        let mut sea = vertex(0.0, 0.0, R - 80.0);
        m.build_color(&mut sea, &sphere);
        assert_eq!(sea.color, Color::rgb(0.0, 0.0, 1.0));

        // Halfway through the lerping band: halfway between green and white.
        let mut land = vertex(0.0, 0.0, R);
        m.build_color(&mut land, &sphere);
        assert!((land.color.r - 0.5).abs() < 1e-6 && (land.color.g - 1.0).abs() < 1e-6, "{:?}", land.color);
    }

    #[test]
    fn land_class_setup_validation() {
        assert!(HeightColorMap::default().setup(R).is_err(), "empty class list must fail");
        let mut bad = classes();
        bad.land_classes[2].lerp_to_next = true;
        assert!(bad.setup(R).is_err(), "last class cannot lerp to a missing next class");
        let mut inverted = classes();
        inverted.land_classes[0].alt_end = -1.0;
        assert!(matches!(inverted.setup(R), Err(PqsError::InvalidRange { .. })));
    }

    #[test]
    fn solid_colours() {
        let sphere = SphereInfo::flat(R);
        let mut v = vertex(0.0, 0.0, R);
        ColorSolid { color: Color::BLACK, blend: 0.5 }.build_color(&mut v, &sphere);
        assert_eq!(v.color, Color::grey(0.5));
        ColorSolidBlend { color: Color::MAGENTA }.build_color(&mut v, &sphere);
        assert_eq!(v.color, Color::MAGENTA);
    }

    #[test]
    fn colour_maps_require_a_map() {
        assert!(matches!(ColorMap::default().setup(R), Err(PqsError::MissingResource { .. })));
        assert!(matches!(ColorMapBlend::default().setup(R), Err(PqsError::MissingResource { .. })));
    }

    #[test]
    fn colour_map_samples_uv() {
        let red = MapData::new(1, 1, MapDepth::Rgba, vec![[255, 0, 0, 255]]).unwrap();
        let mut m = ColorMapBlend::new(Arc::new(red), 1.0);
        m.setup(R).unwrap();
        let sphere = SphereInfo::flat(R);
        for mut v in vertices(R) {
            m.build_color(&mut v, &sphere);
            let c = v.color;
            assert!((c.r - 1.0).abs() < 1e-5 && c.g.abs() < 1e-5 && c.b.abs() < 1e-5, "{c:?}");
        }
    }

    #[test]
    fn grey_noise_keeps_channels_equal() {
        let mut m = ColorNoise::default();
        m.setup(R).unwrap();
        let sphere = SphereInfo::flat(R);
        for mut v in vertices(R) {
            m.build_color(&mut v, &sphere);
            assert!(v.color.r.is_finite());
            assert_eq!((v.color.r, v.color.a), (v.color.b, 1.0));
        }
    }

    #[test]
    fn rgb_noise_scales_each_channel() {
        let noise = FractalNoiseConfig { seed: 21, ..Default::default() };
        let mut grey = ColorNoise::new(noise, 1.0);
        let mut tinted = ColorNoiseRgb { noise, r_blend: 1.0, g_blend: 0.5, b_blend: 0.0, ..Default::default() };
        grey.setup(R).unwrap();
        tinted.setup(R).unwrap();
        let sphere = SphereInfo::flat(R);
        for v in vertices(R) {
            let (mut a, mut b) = (v.clone(), v);
            grey.build_color(&mut a, &sphere);
            tinted.build_color(&mut b, &sphere);
            assert_eq!(b.color.r, a.color.r);
            assert!((b.color.g - a.color.r * 0.5).abs() < 1e-6, "{} vs {}", b.color.g, a.color.r);
            assert_eq!((b.color.b, b.color.a), (0.0, 1.0));
        }

        // Zero blend keeps the incoming colour.
        let mut none = ColorNoiseRgb { noise, blend: 0.0, ..Default::default() };
        none.setup(R).unwrap();
        let mut v = vertex(30.0, 40.0, R);
        v.color = Color::MAGENTA;
        none.build_color(&mut v, &sphere);
        assert_eq!(v.color, Color::MAGENTA);
    }

    #[test]
    fn simplex_colours_stay_in_unit_range() {
        let mut mods: Vec<Box<dyn PqsMod>> = vec![
            Box::new(SimplexNoiseColor::default()),
            Box::new(SimplexColorRgb { g_blend: 0.5, ..Default::default() }),
            Box::new(SimplexMultiChromatic::default()),
        ];
        let sphere = SphereInfo::flat(R);
        for m in &mut mods {
            m.setup(R).unwrap();
            for mut v in vertices(R) {
                m.build_color(&mut v, &sphere);
                let c = v.color;
                for ch in [c.r, c.g, c.b, c.a] {
                    assert!((-1e-6..=1.0 + 1e-6).contains(&ch), "{} produced channel {ch}", m.kind());
                }
            }
        }
    }
}
