//! Octave-summed coherent noise: Perlin, ridged multifractal and billow.
//!
//! Each octave samples gradient coherent noise with its own seed
//! (`seed + octave`), multiplying the coordinates by `lacunarity` between
//! octaves.

use noise::NoiseFn;
use serde::{Deserialize, Serialize};

use super::coherent::{gradient_coherent_noise_3d, make_int32_range, NoiseQuality, OCTAVES_MAXIMUM};
use super::NoiseNode;

fn clamp_octaves(octaves: u32) -> u32 {
    octaves.clamp(1, OCTAVES_MAXIMUM)
}

/// Classic Perlin fBm. Output is unnormalised: with persistence 0.5 it stays
/// roughly within [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Perlin {
    pub frequency: f64,
    pub lacunarity: f64,
    pub persistence: f64,
    pub seed: i32,
    pub quality: NoiseQuality,
    octaves: u32,
}

impl Default for Perlin {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 0,
            quality: NoiseQuality::Medium,
            octaves: 6,
        }
    }
}

impl Perlin {
    pub fn new(frequency: f64, lacunarity: f64, persistence: f64, octaves: u32, seed: i32, quality: NoiseQuality) -> Self {
        Self { frequency, lacunarity, persistence, seed, quality, octaves: clamp_octaves(octaves) }
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    /// Octave count, clamped to `1..=OCTAVES_MAXIMUM`.
    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = clamp_octaves(octaves);
        self
    }
}

impl NoiseFn<f64, 3> for Perlin {
    fn get(&self, point: [f64; 3]) -> f64 {
        let mut x = point[0] * self.frequency;
        let mut y = point[1] * self.frequency;
        let mut z = point[2] * self.frequency;
        let mut value = 0.0;
        let mut cp = 1.0;
        for i in 0..self.octaves {
            let seed = self.seed.wrapping_add(i as i32);
            let signal = gradient_coherent_noise_3d(
                make_int32_range(x),
                make_int32_range(y),
                make_int32_range(z),
                seed,
                self.quality,
            );
            value += signal * cp;
            x *= self.lacunarity;
            y *= self.lacunarity;
            z *= self.lacunarity;
            cp *= self.persistence;
        }
        value
    }
}

/// Ridged multifractal noise, roughly in [-1, 1].
///
/// Spectral weights `f^-1` are precomputed for every octave at construction
/// and depend on `lacunarity`.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgedMultifractal {
    frequency: f64,
    lacunarity: f64,
    seed: i32,
    quality: NoiseQuality,
    octaves: u32,
    weights: Vec<f64>,
}

impl Default for RidgedMultifractal {
    fn default() -> Self {
        Self::new(1.0, 2.0, 6, 0, NoiseQuality::Medium)
    }
}

impl RidgedMultifractal {
    pub fn new(frequency: f64, lacunarity: f64, octaves: u32, seed: i32, quality: NoiseQuality) -> Self {
        const H: f64 = 1.0;
        let mut f = 1.0f64;
        let weights = (0..OCTAVES_MAXIMUM)
            .map(|_| {
                let w = f.powf(-H);
                f *= lacunarity;
                w
            })
            .collect();
        Self { frequency, lacunarity, seed, quality, octaves: clamp_octaves(octaves), weights }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }
}

impl NoiseFn<f64, 3> for RidgedMultifractal {
    fn get(&self, point: [f64; 3]) -> f64 {
        const OFFSET: f64 = 1.0;
        const GAIN: f64 = 2.0;
        let mut x = point[0] * self.frequency;
        let mut y = point[1] * self.frequency;
        let mut z = point[2] * self.frequency;
        let mut value = 0.0;
        let mut weight = 1.0;
        for i in 0..self.octaves as usize {
            let seed = self.seed.wrapping_add(i as i32) & 0x7fff_ffff;
            let mut signal = gradient_coherent_noise_3d(
                make_int32_range(x),
                make_int32_range(y),
                make_int32_range(z),
                seed,
                self.quality,
            );
            // Fold into sharp ridges, then weight by the previous octave so
            // detail concentrates on the ridges.
            signal = OFFSET - signal.abs();
            signal *= signal;
            signal *= weight;
            weight = (signal * GAIN).clamp(0.0, 1.0);
            value += signal * self.weights[i];
            x *= self.lacunarity;
            y *= self.lacunarity;
            z *= self.lacunarity;
        }
        value * 1.25 - 1.0
    }
}

/// Billowy noise built from the absolute value of each octave.
#[derive(Debug, Clone, PartialEq)]
pub struct Billow {
    pub frequency: f64,
    pub lacunarity: f64,
    pub persistence: f64,
    pub seed: i32,
    pub quality: NoiseQuality,
    octaves: u32,
}

impl Default for Billow {
    fn default() -> Self {
        Self::new(1.0, 2.0, 0.5, 6, 0, NoiseQuality::Medium)
    }
}

impl Billow {
    pub fn new(frequency: f64, lacunarity: f64, persistence: f64, octaves: u32, seed: i32, quality: NoiseQuality) -> Self {
        Self { frequency, lacunarity, persistence, seed, quality, octaves: clamp_octaves(octaves) }
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }
}

impl NoiseFn<f64, 3> for Billow {
    fn get(&self, point: [f64; 3]) -> f64 {
        let mut x = point[0] * self.frequency;
        let mut y = point[1] * self.frequency;
        let mut z = point[2] * self.frequency;
        let mut value = 0.0;
        let mut cp = 1.0;
        for i in 0..self.octaves {
            let seed = self.seed.wrapping_add(i as i32);
            let signal = gradient_coherent_noise_3d(
                make_int32_range(x),
                make_int32_range(y),
                make_int32_range(z),
                seed,
                self.quality,
            );
            value += (2.0 * signal.abs() - 1.0) * cp;
            x *= self.lacunarity;
            y *= self.lacunarity;
            z *= self.lacunarity;
            cp *= self.persistence;
        }
        value + 0.5
    }
}

/// Which fractal generator a noise-driven mod builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoiseType {
    #[default]
    Perlin,
    RidgedMultifractal,
    Billow,
}

/// Serializable fractal settings shared by the noise-driven mods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalNoiseConfig {
    pub noise_type: NoiseType,
    pub seed: i32,
    pub frequency: f64,
    pub lacunarity: f64,
    /// Ignored by ridged multifractal.
    pub persistence: f64,
    pub octaves: u32,
    pub quality: NoiseQuality,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            noise_type: NoiseType::Perlin,
            seed: 0,
            frequency: 1.0,
            lacunarity: 2.0,
            persistence: 0.5,
            octaves: 6,
            quality: NoiseQuality::Medium,
        }
    }
}

impl FractalNoiseConfig {
    pub fn build(&self) -> NoiseNode {
        let FractalNoiseConfig { noise_type, seed, frequency, lacunarity, persistence, octaves, quality } = *self;
        match noise_type {
            NoiseType::Perlin => Box::new(Perlin::new(frequency, lacunarity, persistence, octaves, seed, quality)),
            NoiseType::RidgedMultifractal => {
                Box::new(RidgedMultifractal::new(frequency, lacunarity, octaves, seed, quality))
            }
            NoiseType::Billow => Box::new(Billow::new(frequency, lacunarity, persistence, octaves, seed, quality)),
        }
    }
}
