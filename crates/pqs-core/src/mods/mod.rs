//! Terrain mods: the stages of the per-vertex pipeline.
//!
//! A mod is configured through plain public fields, prepared once by
//! [`PqsMod::setup`], then asked to contribute to every vertex through
//! [`PqsMod::build_height`] and [`PqsMod::build_color`]. Hooks take `&self`;
//! anything a mod derives during setup is read-only afterwards, so one sphere
//! can be sampled from many threads.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PqsError, Result};
use crate::vertex::VertexBuildData;

pub mod color;
pub mod craters;
pub mod height;
pub mod noise_height;
pub mod planet;

pub use color::{
    AltitudeAlpha, ColorMap, ColorMapBlend, ColorNoise, ColorNoiseRgb, ColorSolid, ColorSolidBlend, HeightColorMap,
    LandClass, SimplexColorRgb, SimplexMultiChromatic, SimplexNoiseColor,
};
pub use craters::VoronoiCraters;
pub use height::{
    DefineCoastLine, FlattenArea, FlattenAreaTangential, FlattenOcean, HeightNoiseHeightMap, HeightOblate, HeightOffset,
    VertexHeightMap,
};
pub use noise_height::{
    HeightNoise, HeightNoiseVertHeight, HeightNoiseVertHeightCurve, HeightNoiseVertHeightCurve2, RidgedSettings,
    SimplexHeightAbsolute, SimplexHeightFlatten, VertexNoise, VertexVoronoi,
};
pub use planet::{PlanetLandClass, PlanetRidged, PlanetSimplex, VertexPlanet};

/// Sphere-level values handed to every hook.
///
/// `radius_min`/`radius_max` are the aggregated height bounds of the enabled
/// mods; they are only meaningful once the sphere has been set up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereInfo {
    pub radius: f64,
    pub radius_min: f64,
    pub radius_max: f64,
}

impl SphereInfo {
    /// A sphere whose mods declare no height range.
    pub fn flat(radius: f64) -> Self {
        Self { radius, radius_min: radius, radius_max: radius }
    }

    pub fn radius_delta(&self) -> f64 {
        self.radius_max - self.radius_min
    }
}

/// Fields every mod carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModSettings {
    pub name: String,
    pub enabled: bool,
    /// Position in the pipeline; lower runs first, ties keep insertion order.
    pub order: i32,
}

impl Default for ModSettings {
    fn default() -> Self {
        Self { name: String::new(), enabled: true, order: 100 }
    }
}

impl ModSettings {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self { name: name.into(), enabled: true, order }
    }
}

/// Downcasting support for [`PqsMod`] trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One stage of the terrain pipeline.
///
/// Every hook has an explicit no-op default, so a mod implements only what
/// it contributes. Configuration problems must surface from `setup`; the
/// build hooks are the hot path and never validate.
pub trait PqsMod: AsAny + Send + Sync {
    /// Validate configuration and build derived state (noise graphs,
    /// precomputed angles). Called by the sphere before any vertex is built.
    fn setup(&mut self, radius: f64) -> Result<()> {
        let _ = radius;
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let _ = (data, sphere);
    }

    fn build_color(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let _ = (data, sphere);
    }

    /// Lowest height this mod can add, relative to the radius. Valid after `setup`.
    fn min_height(&self) -> f64 {
        0.0
    }

    /// Highest height this mod can add, relative to the radius. Valid after `setup`.
    fn max_height(&self) -> f64 {
        0.0
    }

    /// Short type name used in logs and errors.
    fn kind(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Fails with [`PqsError::MissingResource`] when an `Arc` collaborator is unset.
pub(crate) fn require<T: ?Sized>(slot: &Option<Arc<T>>, mod_name: &str, resource: &str) -> Result<()> {
    match slot {
        Some(_) => Ok(()),
        None => Err(PqsError::missing(mod_name, resource)),
    }
}

/// Fails with [`PqsError::InvalidParameter`] unless `value` is finite and non-zero.
pub(crate) fn non_zero(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value != 0.0 {
        Ok(value)
    } else {
        Err(PqsError::InvalidParameter { what, value })
    }
}
