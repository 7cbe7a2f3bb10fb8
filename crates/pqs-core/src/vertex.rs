use crate::color::Color;
use crate::coords::SphericalCoords;
use crate::sphere::Vec3;

/// Per-vertex state threaded through the mod pipeline.
///
/// Created fresh for each evaluated direction; mods read and mutate it in
/// order. Latitude, longitude and the primary UV pair are derived once from
/// the direction before any mod runs.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuildData {
    /// Unit direction from the sphere centre.
    pub direction: Vec3,
    /// Accumulated distance from the centre; starts at the sphere radius.
    pub height: f64,
    pub color: Color,
    /// Radians, -π/2..π/2.
    pub latitude: f64,
    /// Radians, -π..π.
    pub longitude: f64,
    pub u: f64,
    pub v: f64,
    /// Auxiliary UV pairs, untouched by the pipeline.
    pub u2: f64,
    pub v2: f64,
    pub u3: f64,
    pub v3: f64,
}

impl VertexBuildData {
    pub fn new(direction: Vec3, radius: f64) -> Self {
        let sc = SphericalCoords::from_direction(direction);
        Self {
            direction,
            height: radius,
            color: Color::WHITE,
            latitude: sc.latitude,
            longitude: sc.longitude,
            u: sc.u,
            v: sc.v,
            u2: 0.0,
            v2: 0.0,
            u3: 0.0,
            v3: 0.0,
        }
    }

    /// Direction as a noise-graph sample point.
    #[inline]
    pub fn point(&self) -> [f64; 3] {
        self.direction.to_array()
    }
}
