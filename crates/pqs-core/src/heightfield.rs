use serde::{Deserialize, Serialize};

use crate::color::Color;

/// An equirectangular raster of sampled sphere heights, row-major.
///
/// Elevations are stored as f32 metres relative to the sphere radius; grid
/// coordinates use f64. Row 0 is `min_lat`, column 0 is `min_lon`, and the
/// last row/column lie exactly on `max_lat`/`max_lon`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightField {
    /// Row-major elevation values in metres.
    pub data: Vec<f32>,
    /// Row-major vertex colours, parallel to `data`. Empty when not sampled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<Color>,
    pub width: usize,
    pub height: usize,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl HeightField {
    /// Create a new HeightField filled with the given value.
    pub fn new(width: usize, height: usize, min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            colors: Vec::new(),
            width,
            height,
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// A zero-elevation field covering the whole globe.
    pub fn flat(width: usize, height: usize) -> Self {
        Self::new(width, height, -180.0, 180.0, -90.0, 90.0, 0.0)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    /// Latitude and longitude in degrees of a grid node.
    pub fn lat_lon(&self, row: usize, col: usize) -> (f64, f64) {
        let step = |min: f64, max: f64, i: usize, n: usize| {
            if n <= 1 {
                (min + max) * 0.5
            } else {
                min + (max - min) * i as f64 / (n - 1) as f64
            }
        };
        (
            step(self.min_lat, self.max_lat, row, self.height),
            step(self.min_lon, self.max_lon, col, self.width),
        )
    }

    /// Sample the field at (lon, lat) using bilinear interpolation.
    /// Returns None if (lon, lat) is outside the field bounds.
    pub fn sample(&self, lon: f64, lat: f64) -> Option<f32> {
        if lon < self.min_lon || lon > self.max_lon || lat < self.min_lat || lat > self.max_lat {
            return None;
        }
        if self.width < 2 || self.height < 2 {
            return self.data.first().copied();
        }

        let fx = (lon - self.min_lon) / (self.max_lon - self.min_lon) * (self.width - 1) as f64;
        let fy = (lat - self.min_lat) / (self.max_lat - self.min_lat) * (self.height - 1) as f64;

        let x0 = (fx.floor() as usize).min(self.width - 1);
        let y0 = (fy.floor() as usize).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let tx = (fx - x0 as f64) as f32;
        let ty = (fy - y0 as f64) as f32;

        let top = self.get(y0, x0) + (self.get(y0, x1) - self.get(y0, x0)) * tx;
        let bottom = self.get(y1, x0) + (self.get(y1, x1) - self.get(y1, x0)) * tx;
        Some(top + (bottom - top) * ty)
    }

    pub fn min_elevation(&self) -> f32 {
        self.data.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    pub fn max_elevation(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn mean_elevation(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }
}
