//! Height mods that reshape the accumulated height directly or from a map.

use std::sync::Arc;

use noise::NoiseFn;
use serde::{Deserialize, Serialize};

use super::{require, PqsMod, SphereInfo};
use crate::curve::cubic_hermite;
use crate::error::{PqsError, Result};
use crate::map::MapSampler;
use crate::noise::{FractalNoiseConfig, NoiseNode};
use crate::sphere::{great_circle_distance_rad, Vec3};
use crate::vertex::VertexBuildData;

/// Adds a constant to every vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightOffset {
    pub offset: f64,
}

impl PqsMod for HeightOffset {
    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        data.height += self.offset;
    }
}

/// Raises everything below `radius + ocean_radius` up to that level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOcean {
    pub ocean_radius: f64,
}

impl PqsMod for FlattenOcean {
    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let sea_level = sphere.radius + self.ocean_radius;
        if data.height < sea_level {
            data.height = sea_level;
        }
    }
}

/// Deepens terrain lying below `radius + ocean_radius_offset` by `depth_offset`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefineCoastLine {
    pub ocean_radius_offset: f64,
    pub depth_offset: f64,
}

impl PqsMod for DefineCoastLine {
    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        if data.height < sphere.radius + self.ocean_radius_offset {
            data.height += self.depth_offset;
        }
    }
}

/// Equatorial bulge: adds `sin(π·v)^pow · height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightOblate {
    pub height: f64,
    pub pow: f64,
}

impl Default for HeightOblate {
    fn default() -> Self {
        Self { height: 0.0, pow: 1.0 }
    }
}

impl PqsMod for HeightOblate {
    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let a = (std::f64::consts::PI * data.v).sin().powf(self.pow);
        data.height += a * self.height;
    }
}

/// Flattens a circular area around `position` to `radius + flatten_to`.
///
/// Inside `inner_radius` (metres along the surface, converted to an angle at
/// setup) the height is replaced; out to `outer_radius` it blends back to the
/// incoming height along a Hermite curve shaped by `smooth_start`/`smooth_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenArea {
    pub position: Vec3,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub flatten_to: f64,
    pub smooth_start: f64,
    pub smooth_end: f64,
    #[serde(skip)]
    area: Option<FlattenGeometry>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FlattenGeometry {
    centre: Vec3,
    inner_angle: f64,
    outer_angle: f64,
}

impl Default for FlattenArea {
    fn default() -> Self {
        Self {
            position: Vec3::UP,
            inner_radius: 0.0,
            outer_radius: 0.0,
            flatten_to: 0.0,
            smooth_start: 0.0,
            smooth_end: 0.0,
            area: None,
        }
    }
}

impl FlattenArea {
    pub fn new(position: Vec3, inner_radius: f64, outer_radius: f64, flatten_to: f64) -> Self {
        Self { position, inner_radius, outer_radius, flatten_to, ..Default::default() }
    }
}

impl FlattenGeometry {
    /// Surface radii in metres become angles at the sphere centre.
    fn new(position: Vec3, inner_radius: f64, outer_radius: f64, radius: f64) -> Result<Self> {
        if position.length() <= 0.0 {
            return Err(PqsError::InvalidParameter { what: "flatten area position length", value: 0.0 });
        }
        if !(inner_radius >= 0.0 && inner_radius <= outer_radius) {
            return Err(PqsError::InvalidRange { what: "flatten area radii", min: inner_radius, max: outer_radius });
        }
        Ok(Self {
            centre: position.normalize(),
            inner_angle: (inner_radius / radius).atan(),
            outer_angle: (outer_radius / radius).atan(),
        })
    }

    /// Angle from the centre and the blend fraction between the inner and
    /// outer angles, or `None` outside the area. Inside the inner angle the
    /// fraction is `None` too.
    fn locate(&self, direction: Vec3) -> Option<(f64, Option<f64>)> {
        let angle = great_circle_distance_rad(direction, self.centre);
        if angle >= self.outer_angle {
            return None;
        }
        if angle < self.inner_angle {
            return Some((angle, None));
        }
        Some((angle, Some((angle - self.inner_angle) / (self.outer_angle - self.inner_angle))))
    }
}

impl PqsMod for FlattenArea {
    fn setup(&mut self, radius: f64) -> Result<()> {
        self.area = Some(FlattenGeometry::new(self.position, self.inner_radius, self.outer_radius, radius)?);
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let Some(area) = self.area else { return };
        let Some((_, blend)) = area.locate(data.direction) else { return };
        let flat = sphere.radius + self.flatten_to;
        data.height = match blend {
            None => flat,
            Some(t) => cubic_hermite(flat, data.height, self.smooth_start, self.smooth_end, t),
        };
    }
}

/// [`FlattenArea`] onto the plane tangent to the sphere at `position`.
///
/// The flat target along a direction at angle `θ` from the centre is
/// `(radius + flatten_to) / cos θ`, so the flattened patch is planar rather
/// than following the curvature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenAreaTangential {
    pub position: Vec3,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub flatten_to: f64,
    pub smooth_start: f64,
    pub smooth_end: f64,
    #[serde(skip)]
    area: Option<FlattenGeometry>,
}

impl Default for FlattenAreaTangential {
    fn default() -> Self {
        Self {
            position: Vec3::UP,
            inner_radius: 0.0,
            outer_radius: 0.0,
            flatten_to: 0.0,
            smooth_start: 0.0,
            smooth_end: 0.0,
            area: None,
        }
    }
}

impl FlattenAreaTangential {
    pub fn new(position: Vec3, inner_radius: f64, outer_radius: f64, flatten_to: f64) -> Self {
        Self { position, inner_radius, outer_radius, flatten_to, ..Default::default() }
    }
}

impl PqsMod for FlattenAreaTangential {
    fn setup(&mut self, radius: f64) -> Result<()> {
        self.area = Some(FlattenGeometry::new(self.position, self.inner_radius, self.outer_radius, radius)?);
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, sphere: &SphereInfo) {
        let Some(area) = self.area else { return };
        let Some((angle, blend)) = area.locate(data.direction) else { return };
        let plane = (sphere.radius + self.flatten_to) / angle.cos();
        data.height = match blend {
            None => plane,
            Some(t) => cubic_hermite(plane, data.height, self.smooth_start, self.smooth_end, t),
        };
    }
}

/// Adds `offset + deformity · map(u, v)`.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexHeightMap {
    pub deformity: f64,
    pub offset: f64,
    /// Multiply `deformity` by the sphere radius at setup.
    pub scale_deformity_by_radius: bool,
    #[serde(skip)]
    pub map: Option<Arc<dyn MapSampler>>,
    #[serde(skip)]
    height_deformity: f64,
}

impl VertexHeightMap {
    pub fn new(map: Arc<dyn MapSampler>, deformity: f64, offset: f64) -> Self {
        Self { deformity, offset, map: Some(map), ..Default::default() }
    }
}

impl PqsMod for VertexHeightMap {
    fn setup(&mut self, radius: f64) -> Result<()> {
        require(&self.map, self.kind(), "a height map")?;
        self.height_deformity = if self.scale_deformity_by_radius { radius * self.deformity } else { self.deformity };
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        if let Some(map) = &self.map {
            data.height += self.offset + self.height_deformity * map.pixel_float(data.u, data.v);
        }
    }

    fn min_height(&self) -> f64 {
        self.offset
    }

    fn max_height(&self) -> f64 {
        self.offset + self.height_deformity
    }
}

/// Fractal noise applied only where a height map's grey level falls inside
/// `[height_start, height_end]`, scaled by the position within that band.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightNoiseHeightMap {
    pub noise: FractalNoiseConfig,
    pub deformity: f64,
    pub height_start: f64,
    pub height_end: f64,
    #[serde(skip)]
    pub map: Option<Arc<dyn MapSampler>>,
    #[serde(skip)]
    node: Option<NoiseNode>,
}

impl HeightNoiseHeightMap {
    pub fn new(map: Arc<dyn MapSampler>, noise: FractalNoiseConfig, deformity: f64, band: (f64, f64)) -> Self {
        Self { noise, deformity, height_start: band.0, height_end: band.1, map: Some(map), node: None }
    }
}

impl PqsMod for HeightNoiseHeightMap {
    fn setup(&mut self, _radius: f64) -> Result<()> {
        require(&self.map, self.kind(), "a height map")?;
        if !(self.height_start < self.height_end) {
            return Err(PqsError::InvalidRange { what: "height map band", min: self.height_start, max: self.height_end });
        }
        self.node = Some(self.noise.build());
        Ok(())
    }

    fn build_height(&self, data: &mut VertexBuildData, _sphere: &SphereInfo) {
        let (Some(map), Some(node)) = (&self.map, &self.node) else { return };
        let h = map.pixel_color(data.u, data.v).grayscale() as f64;
        if !(h >= self.height_start && h <= self.height_end) {
            return;
        }
        let h = (h - self.height_start) / (self.height_end - self.height_start);
        let n = node.get(data.point()).clamp(-1.0, 1.0);
        data.height += (n + 1.0) * 0.5 * self.deformity * h;
    }

    fn max_height(&self) -> f64 {
        self.deformity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapData;
    use crate::mods::test_support::{vertex, vertices};
    use approx::assert_relative_eq;

    const R: f64 = 1000.0;

    fn grey_map(level: u8) -> Arc<dyn MapSampler> {
        Arc::new(MapData::from_greyscale(2, 2, &[level; 4]).unwrap())
    }

    #[test]
    fn flatten_ocean_only_raises() {
        let m = FlattenOcean { ocean_radius: 5.0 };
        let sphere = SphereInfo::flat(R);
        let mut low = vertex(0.0, 0.0, R);
        m.build_height(&mut low, &sphere);
        assert_eq!(low.height, R + 5.0);

        let mut high = vertex(0.0, 0.0, R + 50.0);
        m.build_height(&mut high, &sphere);
        assert_eq!(high.height, R + 50.0, "terrain above sea level must be untouched");
    }

    #[test]
    fn coast_line_deepens_only_below_threshold() {
        let m = DefineCoastLine { ocean_radius_offset: 10.0, depth_offset: -30.0 };
        let sphere = SphereInfo::flat(R);
        let mut below = vertex(0.0, 0.0, R + 9.0);
        m.build_height(&mut below, &sphere);
        assert_eq!(below.height, R - 21.0);
        let mut above = vertex(0.0, 0.0, R + 10.0);
        m.build_height(&mut above, &sphere);
        assert_eq!(above.height, R + 10.0);
    }

    #[test]
    fn oblate_peaks_at_equator() {
        let m = HeightOblate { height: 20.0, pow: 2.0 };
        let sphere = SphereInfo::flat(R);
        let mut equator = vertex(0.0, 45.0, R);
        m.build_height(&mut equator, &sphere);
        assert_relative_eq!(equator.height, R + 20.0, epsilon = 1e-9);
        let mut pole = vertex(90.0, 0.0, R);
        m.build_height(&mut pole, &sphere);
        assert_relative_eq!(pole.height, R, epsilon = 1e-9);
    }

    #[test]
    fn flatten_area_zones() {
        // 100 m inner / 300 m outer on a 1 km sphere, centred on +z.
        let mut m = FlattenArea::new(Vec3::new(0.0, 0.0, 2.0), 100.0, 300.0, 7.0);
        m.setup(R).unwrap();
        let sphere = SphereInfo::flat(R);

        let mut centre = vertex(0.0, 0.0, R + 80.0);
        m.build_height(&mut centre, &sphere);
        assert_eq!(centre.height, R + 7.0, "inside the inner radius height is replaced");

        let mut far = vertex(0.0, 90.0, R + 80.0);
        m.build_height(&mut far, &sphere);
        assert_eq!(far.height, R + 80.0, "outside the outer radius height is untouched");

        // Halfway between the inner and outer angles the Hermite blend with
        // zero tangents is the midpoint.
        let inner = (100.0f64 / R).atan();
        let outer = (300.0f64 / R).atan();
        let mid = ((inner + outer) * 0.5).to_degrees();
        let mut blend = vertex(0.0, mid, R + 80.0);
        m.build_height(&mut blend, &sphere);
        assert_relative_eq!(blend.height, R + 43.5, epsilon = 1e-6);
    }

    #[test]
    fn flatten_area_rejects_inverted_radii() {
        let mut m = FlattenArea::new(Vec3::UP, 300.0, 100.0, 0.0);
        assert!(matches!(m.setup(R), Err(PqsError::InvalidRange { .. })));
    }

    #[test]
    fn tangential_flatten_follows_the_tangent_plane() {
        let mut m = FlattenAreaTangential::new(Vec3::new(0.0, 0.0, 1.0), 100.0, 300.0, 7.0);
        m.setup(R).unwrap();
        let sphere = SphereInfo::flat(R);

        let mut centre = vertex(0.0, 0.0, R + 80.0);
        m.build_height(&mut centre, &sphere);
        assert_relative_eq!(centre.height, R + 7.0, epsilon = 1e-6);

        // 3 degrees out is inside the ~5.7 degree inner angle: the plane sits above the sphere.
        let mut off = vertex(0.0, 3.0, R + 80.0);
        m.build_height(&mut off, &sphere);
        assert_relative_eq!(off.height, (R + 7.0) / 3.0f64.to_radians().cos(), epsilon = 1e-6);
        assert!(off.height > R + 7.0);

        let mut far = vertex(0.0, 90.0, R + 80.0);
        m.build_height(&mut far, &sphere);
        assert_eq!(far.height, R + 80.0);

        // Blend-zone endpoints: the plane at the inner edge, the incoming height at the outer.
        let outer = (300.0f64 / R).atan().to_degrees();
        let mut edge = vertex(0.0, outer - 1e-6, R + 80.0);
        m.build_height(&mut edge, &sphere);
        assert_relative_eq!(edge.height, R + 80.0, epsilon = 1e-3);

        assert!(FlattenAreaTangential::new(Vec3::UP, 5.0, 1.0, 0.0).setup(R).is_err());
    }

    #[test]
    fn height_map_requires_map() {
        let mut m = VertexHeightMap::default();
        let err = m.setup(R).unwrap_err();
        assert!(matches!(err, PqsError::MissingResource { .. }), "got {err}");
    }

    #[test]
    fn height_map_bounds_scale_with_radius() {
        let mut m = VertexHeightMap::new(grey_map(255), 0.01, -2.0);
        m.scale_deformity_by_radius = true;
        m.setup(R).unwrap();
        assert_eq!(m.min_height(), -2.0);
        assert_relative_eq!(m.max_height(), 8.0, epsilon = 1e-12);

        let sphere = SphereInfo::flat(R);
        for mut v in vertices(R) {
            m.build_height(&mut v, &sphere);
            assert_relative_eq!(v.height, R + 8.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn noise_height_map_respects_band() {
        let noise = FractalNoiseConfig::default();
        let sphere = SphereInfo::flat(R);

        let mut outside = HeightNoiseHeightMap::new(grey_map(25), noise, 100.0, (0.5, 1.0));
        outside.setup(R).unwrap();
        for mut v in vertices(R) {
            outside.build_height(&mut v, &sphere);
            assert_eq!(v.height, R, "grey level below the band adds nothing");
        }

        let mut inside = HeightNoiseHeightMap::new(grey_map(255), noise, 100.0, (0.5, 1.0));
        inside.setup(R).unwrap();
        for mut v in vertices(R) {
            inside.build_height(&mut v, &sphere);
            assert!((R..=R + 100.0).contains(&v.height), "height {} outside [R, R+deformity]", v.height);
        }
    }
}
