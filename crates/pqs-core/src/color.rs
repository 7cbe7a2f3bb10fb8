//! RGBA color and gradient value types used by the color mods.

use serde::{Deserialize, Serialize};

/// Linear RGBA color with f32 channels, nominally in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "one")]
    pub a: f32,
}

fn one() -> f32 {
    1.0
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const MAGENTA: Color = Color::rgba(1.0, 0.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Opaque grey with all color channels set to `v`.
    pub const fn grey(v: f32) -> Self {
        Self { r: v, g: v, b: v, a: 1.0 }
    }

    /// Perceptual luminance.
    pub fn grayscale(&self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    /// Interpolate towards `other`; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Color, t: f32) -> Color {
        self.lerp_unclamped(other, t.clamp(0.0, 1.0))
    }

    pub fn lerp_unclamped(self, other: Color, t: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn from_rgba8(px: [u8; 4]) -> Color {
        const BYTE_TO_FLOAT: f32 = 1.0 / 255.0;
        Color {
            r: px[0] as f32 * BYTE_TO_FLOAT,
            g: px[1] as f32 * BYTE_TO_FLOAT,
            b: px[2] as f32 * BYTE_TO_FLOAT,
            a: px[3] as f32 * BYTE_TO_FLOAT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientColorKey {
    pub color: Color,
    pub time: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientAlphaKey {
    pub alpha: f32,
    pub time: f32,
}

/// Piecewise-linear color ramp over `time` with separate alpha keys.
///
/// Keys are kept sorted by time. Lookups before the first key or after the
/// last key return the end key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GradientKeys")]
pub struct Gradient {
    color_keys: Vec<GradientColorKey>,
    alpha_keys: Vec<GradientAlphaKey>,
}

#[derive(Deserialize)]
struct GradientKeys {
    color_keys: Vec<GradientColorKey>,
    #[serde(default)]
    alpha_keys: Vec<GradientAlphaKey>,
}

impl From<GradientKeys> for Gradient {
    fn from(k: GradientKeys) -> Self {
        Gradient::new(k.color_keys, k.alpha_keys)
    }
}

impl Gradient {
    pub fn new(mut color_keys: Vec<GradientColorKey>, mut alpha_keys: Vec<GradientAlphaKey>) -> Self {
        color_keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        alpha_keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { color_keys, alpha_keys }
    }

    pub fn evaluate(&self, time: f32) -> Color {
        let mut color = match self.color_keys.as_slice() {
            [] => Color::BLACK,
            keys => {
                let (lo, hi, t) = bracket(keys, |k| k.time, time);
                keys[lo].color.lerp(keys[hi].color, t)
            }
        };
        color.a = match self.alpha_keys.as_slice() {
            [] => 1.0,
            keys => {
                let (lo, hi, t) = bracket(keys, |k| k.time, time);
                keys[lo].alpha + (keys[hi].alpha - keys[lo].alpha) * t
            }
        };
        color
    }
}

/// Indices of the keys around `time` and the interpolation fraction between them.
fn bracket<K>(keys: &[K], time_of: impl Fn(&K) -> f32, time: f32) -> (usize, usize, f32) {
    let last = keys.len() - 1;
    if time <= time_of(&keys[0]) {
        return (0, 0, 0.0);
    }
    if time >= time_of(&keys[last]) {
        return (last, last, 0.0);
    }
    let hi = keys.iter().position(|k| time_of(k) > time).unwrap_or(last);
    let lo = hi - 1;
    let span = time_of(&keys[hi]) - time_of(&keys[lo]);
    let t = if span > 0.0 { (time - time_of(&keys[lo])) / span } else { 0.0 };
    (lo, hi, t)
}
