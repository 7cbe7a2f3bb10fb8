/// Spherical coordinate derivation for vertex directions.
/// All coordinate math uses f64 for precision.
use std::f64::consts::{FRAC_PI_2, PI};

use crate::sphere::Vec3;

/// A point on the sphere in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn to_direction(self) -> Vec3 {
        Vec3::from_latlon(self.lat, self.lon)
    }
}

/// Latitude/longitude (radians) and texture coordinates derived from a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCoords {
    pub latitude: f64,
    pub longitude: f64,
    /// `longitude / π · 0.5`, in [-0.5, 0.5]; samplers wrap it.
    pub u: f64,
    /// `latitude / π + 0.5`, 0 at the south pole and 1 at the north pole.
    pub v: f64,
}

impl SphericalCoords {
    pub fn from_direction(dir: Vec3) -> Self {
        let mut latitude = dir.y.asin();
        if latitude.is_nan() {
            // |y| drifted past 1.0.
            latitude = FRAC_PI_2.copysign(dir.y);
        }

        let xz = Vec3::new(dir.x, 0.0, dir.z);
        let xz_len = xz.length();
        let longitude = if xz_len <= 0.0 {
            0.0
        } else {
            let nx = (xz.x / xz_len).clamp(-1.0, 1.0);
            let a = nx.asin();
            if xz.z >= 0.0 {
                a
            } else if nx >= 0.0 {
                PI - a
            } else {
                -PI - a
            }
        };

        Self {
            latitude,
            longitude,
            u: longitude / PI * 0.5,
            v: latitude / PI + 0.5,
        }
    }
}
