//! Voronoi crater field with simplex-jittered rims and a colour ramp.

use noise::NoiseFn;
use serde::{Deserialize, Serialize};

use super::{PqsMod, SphereInfo};
use crate::color::{Color, Gradient, GradientAlphaKey, GradientColorKey};
use crate::curve::{CurveKey, HermiteCurve};
use crate::error::Result;
use crate::noise::{Simplex, SimplexConfig, Voronoi};
use crate::vertex::VertexBuildData;

/// Crater synthesis.
///
/// A distance-based Voronoi field gives each point its position within a
/// crater cell. Simplex noise, enveloped by `jitter_curve`, perturbs that
/// position into `r`, which `crater_curve` turns into a height profile. The
/// colour hook darkens crater floors through `crater_colour_ramp`.
///
/// Defaults reproduce a small airless moon's crater field.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct VoronoiCraters {
    pub deformation: f64,
    pub voronoi_seed: i32,
    pub voronoi_displacement: f64,
    pub voronoi_frequency: f64,
    pub simplex: SimplexConfig,
    pub crater_curve: HermiteCurve,
    pub jitter_curve: HermiteCurve,
    pub jitter: f64,
    pub jitter_height: f64,
    pub crater_colour_ramp: Gradient,
    pub r_factor: f64,
    pub r_offset: f64,
    pub color_opacity: f32,
    /// Paint crater structure in magenta instead of the ramp.
    pub debug_color_mapping: bool,
    #[serde(skip)]
    built: Option<CraterNoise>,
}

struct CraterNoise {
    voronoi: Voronoi,
    simplex: Simplex,
}

impl Default for VoronoiCraters {
    fn default() -> Self {
        Self {
            deformation: 500.0,
            voronoi_seed: 824,
            voronoi_displacement: 0.0,
            voronoi_frequency: 22.0,
            simplex: SimplexConfig { seed: 123_123, octaves: 3.0, persistence: 0.5, frequency: 120.0 },
            crater_curve: default_crater_curve(),
            jitter_curve: default_jitter_curve(),
            jitter: 0.1,
            jitter_height: 3.0,
            crater_colour_ramp: default_colour_ramp(),
            r_factor: 1.0,
            r_offset: 1.0,
            color_opacity: 0.7,
            debug_color_mapping: false,
            built: None,
        }
    }
}

fn default_crater_curve() -> HermiteCurve {
    HermiteCurve::new(vec![
        CurveKey::new(-0.998_238_1, -0.741_178_3, -0.065_000_59, -0.065_000_59),
        CurveKey::new(-0.933_226_2, -0.767_831_6, -0.217_639_9, -0.217_639_9),
        CurveKey::new(-0.899_040_5, -0.743_333_9, -2.560_626, -2.560_626),
        CurveKey::new(-0.744_596_6, -0.858_116_7, 0.443_614_8, 0.443_614_8),
        CurveKey::new(-0.449_977_1, -0.139_239_5, 5.289_535, 5.289_535),
        CurveKey::new(-0.401_517_7, 0.255_173_5, 9.069_458, -2.149_609),
        CurveKey::new(-0.229_745_7, 0.002_857_953, -0.445_367_5, -0.445_367_5),
        CurveKey::new(0.272_495_2, 0.004_237_81, -0.018_849_32, -0.018_849_32),
        CurveKey::new(0.999_843_4, -0.004_090_764, 0.013_971_26, 0.013_971_26),
    ])
}

fn default_jitter_curve() -> HermiteCurve {
    HermiteCurve::new(vec![
        CurveKey::new(-1.000_701, 0.427_841_2, 0.157_760_9, 0.157_760_9),
        CurveKey::new(-0.788_496_9, 0.094_874_52, -0.773_966_3, -0.773_966_3),
        CurveKey::new(-0.609_180_3, 0.072_019, 0.123_537, 0.123_537),
        CurveKey::new(-0.393_051_4, 0.390_349_5, 3.300_831, 3.300_831),
        CurveKey::new(-0.358_483_6, 0.864_330_4, 0.071_399_17, 0.071_399_17),
        CurveKey::new(-0.298_806_8, 0.002_564_805, -0.018_143_46, -0.018_143_46),
        CurveKey::new(0.997_025_3, 0.003_401_639, 0.0, 0.0),
    ])
}

fn default_colour_ramp() -> Gradient {
    let key = |v: f32, time: f32| GradientColorKey { color: Color::grey(v), time };
    Gradient::new(
        vec![
            key(0.271, 0.005_889_982),
            key(0.188, 0.123_537),
            key(0.329, 0.529_411_8),
            key(0.584, 0.641_184_1),
            key(0.400, 0.791_180_3),
        ],
        vec![GradientAlphaKey { alpha: 1.0, time: 0.0 }, GradientAlphaKey { alpha: 1.0, time: 1.0 }],
    )
}

impl VoronoiCraters {
    /// Jittered crater coordinate and the jitter term at `point`.
    fn crater_r(&self, n: &CraterNoise, point: [f64; 3]) -> (f64, f64) {
        let vor_h = n.voronoi.get(point);
        let spx_h = n.simplex.noise(point[0], point[1], point[2]);
        let jtt = spx_h * self.jitter * self.jitter_curve.evaluate(vor_h);
        (vor_h + jtt, jtt)
    }
}

impl PqsMod for VoronoiCraters {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        self.built = Some(CraterNoise {
            voronoi: Voronoi::new(self.voronoi_frequency, self.voronoi_displacement, self.voronoi_seed, true)?,
            simplex: self.simplex.build()?,
        });
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let Some(n) = &self.built else { return };
        let (r, jtt) = self.crater_r(n, data.point());
        let h = self.crater_curve.evaluate(r);
        data.height += (h + self.jitter_height * jtt * h) * self.deformation;
    }

    fn build_color(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let Some(n) = &self.built else { return };
        let (r, _) = self.crater_r(n, data.point());
        let r = (r * self.r_factor + self.r_offset) as f32;
        data.color = if self.debug_color_mapping {
            Color::MAGENTA.lerp(data.color, r)
        } else {
            data.color.lerp(self.crater_colour_ramp.evaluate(r), (1.0 - r) * self.color_opacity)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::test_support::vertices;

    const R: f64 = 200_000.0;

    fn craters() -> VoronoiCraters {
        let mut c = VoronoiCraters::default();
        c.setup(R).unwrap();
        c
    }

    #[test]
    fn defaults_build() {
        let c = craters();
        assert_eq!(c.crater_curve.keys().len(), 9);
        assert_eq!(c.jitter_curve.keys().len(), 7);
    }

    #[test]
    fn crater_heights_are_bounded_and_varied() {
        let c = craters();
        let sphere = SphereInfo::flat(R);
        let deltas: Vec<f64> = vertices(R)
            .into_iter()
            .map(|mut v| {
                c.build_height(&mut v, &sphere);
                v.height - R
            })
            .collect();
        // The crater profile stays within about ±1, jitter adds a few tenths.
        assert!(deltas.iter().all(|d| d.is_finite() && d.abs() < 3.0 * c.deformation), "{deltas:?}");
        assert!(deltas.iter().any(|&d| d != deltas[0]));
    }

    #[test]
    fn colour_hook_is_pure() {
        let c = craters();
        let sphere = SphereInfo::flat(R);
        for v in vertices(R) {
            let mut a = v.clone();
            let mut b = v.clone();
            c.build_color(&mut a, &sphere);
            // Running the height hook in between must not influence the colour.
            c.build_height(&mut b, &sphere);
            b.height = v.height;
            c.build_color(&mut b, &sphere);
            assert_eq!(a.color, b.color);
        }
    }

    #[test]
    fn debug_mapping_tints_magenta() {
        let mut c = VoronoiCraters { debug_color_mapping: true, r_factor: 0.0, r_offset: 0.0, ..Default::default() };
        c.setup(R).unwrap();
        let mut v = vertices(R).remove(0);
        c.build_color(&mut v, &SphereInfo::flat(R));
        assert_eq!(v.color, Color::MAGENTA);
    }
}
