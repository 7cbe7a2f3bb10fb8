//! Image-backed samplers consumed by the height-map and color-map mods.
//!
//! `MapSampler` is the narrow interface the mods call; `MapData` is the
//! in-memory implementation with bilinear filtering and wraparound on both axes.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{PqsError, Result};

/// Read-only texture lookup at wrapped UV coordinates.
pub trait MapSampler: Send + Sync + std::fmt::Debug {
    /// Scalar value in [0, 1] at `(u, v)`.
    fn pixel_float(&self, u: f64, v: f64) -> f64;
    fn pixel_color(&self, u: f64, v: f64) -> Color;
}

/// Which channels of the stored pixels carry information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapDepth {
    Greyscale,
    HeightAlpha,
    Rgb,
    #[default]
    Rgba,
}

impl MapDepth {
    /// Scalar value of one pixel: mean of the meaningful channels.
    ///
    /// Every depth divides by the number of channels it sums, so a white
    /// pixel reads 1.0 at any depth. Schemes that divide by the depth's
    /// ordinal (1 for height-alpha, 2 for RGB, 3 for RGBA) overshoot 1.0 on
    /// bright pixels; that behaviour is not reproduced here.
    fn scalar(self, c: Color) -> f32 {
        match self {
            MapDepth::Greyscale => c.r,
            MapDepth::HeightAlpha => (c.r + c.a) / 2.0,
            MapDepth::Rgb => (c.r + c.g + c.b) / 3.0,
            MapDepth::Rgba => (c.r + c.g + c.b + c.a) / 4.0,
        }
    }
}

/// Row-major RGBA8 image. Row 0 is `v = 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MapDataRaw")]
pub struct MapData {
    width: usize,
    height: usize,
    depth: MapDepth,
    pixels: Vec<[u8; 4]>,
}

#[derive(Deserialize)]
struct MapDataRaw {
    width: usize,
    height: usize,
    #[serde(default)]
    depth: MapDepth,
    pixels: Vec<[u8; 4]>,
}

impl TryFrom<MapDataRaw> for MapData {
    type Error = PqsError;
    fn try_from(raw: MapDataRaw) -> Result<Self> {
        MapData::new(raw.width, raw.height, raw.depth, raw.pixels)
    }
}

/// Integer corners and fractional weights of a bilinear lookup.
struct Bilinear {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
    tx: f32,
    ty: f32,
}

impl MapData {
    pub fn new(width: usize, height: usize, depth: MapDepth, pixels: Vec<[u8; 4]>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PqsError::InvalidParameter { what: "map dimensions", value: (width * height) as f64 });
        }
        if pixels.len() != width * height {
            return Err(PqsError::InvalidParameter { what: "map pixel count", value: pixels.len() as f64 });
        }
        Ok(Self { width, height, depth, pixels })
    }

    /// Single-channel map from grey levels.
    pub fn from_greyscale(width: usize, height: usize, levels: &[u8]) -> Result<Self> {
        let pixels = levels.iter().map(|&l| [l, l, l, 255]).collect();
        Self::new(width, height, MapDepth::Greyscale, pixels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> MapDepth {
        self.depth
    }

    #[inline]
    fn pixel(&self, x: usize, y: usize) -> Color {
        Color::from_rgba8(self.pixels[y * self.width + x])
    }

    fn bilinear(&self, u: f64, v: f64) -> Bilinear {
        let u = (u - u.floor()).abs();
        let v = (v - v.floor()).abs();

        let fx = u * self.width as f64;
        let x0 = (fx.floor() as usize).min(self.width - 1);
        let x1 = if x0 + 1 >= self.width { 0 } else { x0 + 1 };

        let fy = v * self.height as f64;
        let y0 = (fy.floor() as usize).min(self.height - 1);
        let y1 = if y0 + 1 >= self.height { 0 } else { y0 + 1 };

        Bilinear {
            x0,
            x1,
            y0,
            y1,
            tx: (fx - fx.floor()) as f32,
            ty: (fy - fy.floor()) as f32,
        }
    }
}

impl MapSampler for MapData {
    fn pixel_float(&self, u: f64, v: f64) -> f64 {
        let b = self.bilinear(u, v);
        let s = |x, y| self.depth.scalar(self.pixel(x, y));
        let top = s(b.x0, b.y0) + (s(b.x1, b.y0) - s(b.x0, b.y0)) * b.tx;
        let bottom = s(b.x0, b.y1) + (s(b.x1, b.y1) - s(b.x0, b.y1)) * b.tx;
        (top + (bottom - top) * b.ty) as f64
    }

    fn pixel_color(&self, u: f64, v: f64) -> Color {
        let b = self.bilinear(u, v);
        let top = self.pixel(b.x0, b.y0).lerp(self.pixel(b.x1, b.y0), b.tx);
        let bottom = self.pixel(b.x0, b.y1).lerp(self.pixel(b.x1, b.y1), b.tx);
        top.lerp(bottom, b.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_by_one() -> MapData {
        MapData::from_greyscale(2, 1, &[0, 255]).unwrap()
    }

    #[test]
    fn rejects_wrong_pixel_count() {
        assert!(MapData::from_greyscale(2, 2, &[0, 1, 2]).is_err());
        assert!(MapData::from_greyscale(0, 0, &[]).is_err());
    }

    #[test]
    fn samples_texel_corners_exactly() {
        let m = two_by_one();
        assert_relative_eq!(m.pixel_float(0.0, 0.0), 0.0);
        assert_relative_eq!(m.pixel_float(0.5, 0.0), 1.0);
    }

    #[test]
    fn interpolates_between_texels() {
        let m = two_by_one();
        assert_relative_eq!(m.pixel_float(0.25, 0.0), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn wraps_past_right_edge() {
        let m = two_by_one();
        // Between texel 1 (white) and texel 0 (black) across the seam.
        assert_relative_eq!(m.pixel_float(0.75, 0.0), 0.5, epsilon = 1e-6);
        assert_relative_eq!(m.pixel_float(1.25, 0.0), m.pixel_float(0.25, 0.0), epsilon = 1e-9);
        assert_relative_eq!(m.pixel_float(-0.75, 0.0), m.pixel_float(0.25, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn white_reads_one_at_every_depth() {
        for depth in [MapDepth::Greyscale, MapDepth::HeightAlpha, MapDepth::Rgb, MapDepth::Rgba] {
            let m = MapData::new(1, 1, depth, vec![[255, 255, 255, 255]]).unwrap();
            assert_relative_eq!(m.pixel_float(0.0, 0.0), 1.0, epsilon = 1e-6);
        }
        let red = MapData::new(1, 1, MapDepth::Rgb, vec![[255, 0, 0, 255]]).unwrap();
        assert_relative_eq!(red.pixel_float(0.0, 0.0), 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn color_sampling_matches_float_for_greyscale() {
        let m = two_by_one();
        let c = m.pixel_color(0.25, 0.0);
        assert_relative_eq!(c.r as f64, m.pixel_float(0.25, 0.0), epsilon = 1e-6);
        assert_relative_eq!(c.a, 1.0);
    }

    #[test]
    fn deserializes_and_validates() {
        let ok: MapData = serde_json::from_str(r#"{"width":1,"height":1,"pixels":[[1,2,3,4]]}"#).unwrap();
        assert_eq!(ok.depth(), MapDepth::Rgba);
        let bad = serde_json::from_str::<MapData>(r#"{"width":2,"height":1,"pixels":[[1,2,3,4]]}"#);
        assert!(bad.is_err());
    }
}
