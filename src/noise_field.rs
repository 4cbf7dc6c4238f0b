//! Noise fields for terrain height and biome values
//!
//! Height is a hand-rolled multi-octave sum over Perlin noise, normalized by
//! the total amplitude so the [0,1] bound holds for any octave count. Biome
//! values (temperature, humidity) sample the same noise primitive at a
//! coarser fixed scale, each axis offset into its own region of the field so
//! the two stay uncorrelated.

use noise::{NoiseFn, Perlin, Seedable};
use serde::{Deserialize, Serialize};

/// Sampling offset that sends temperature into its own noise region.
pub const TEMPERATURE_OFFSET: f64 = 10_000.0;

/// Sampling offset that sends humidity into its own noise region.
pub const HUMIDITY_OFFSET: f64 = 20_000.0;

/// Parameters for height and biome noise.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Base frequency for height noise (lower = larger features)
    pub base_frequency: f64,
    /// Number of height octaves
    pub octaves: u32,
    /// Amplitude decay per octave (0.0-1.0)
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
    /// Fixed coarse frequency for biome values
    pub biome_scale: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            base_frequency: 0.02,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            biome_scale: 0.004,
        }
    }
}

/// Per-cell sample of all noise-derived fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSample {
    /// Terrain height in [0,1]
    pub height: f64,
    /// Temperature in [-1,1]
    pub temperature: f64,
    /// Humidity in [-1,1]
    pub humidity: f64,
}

/// Deterministic noise field generator.
///
/// Pure: no interior state beyond configuration, safe to call concurrently
/// and redundantly. Two fields built from the same seed and parameters
/// return identical values forever.
#[derive(Clone, Debug)]
pub struct NoiseField {
    perlin: Perlin,
    params: NoiseParams,
    /// Additive coordinate offset derived from the seed, kept small enough
    /// that f64 lattice coordinates stay precise.
    seed_offset: f64,
}

impl NoiseField {
    pub fn new(seed: u64, params: NoiseParams) -> Self {
        Self {
            perlin: Perlin::new(1).set_seed(seed as u32),
            params,
            seed_offset: (seed % 0x10000) as f64,
        }
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Sample the height field at a world cell. Result is in [0,1].
    pub fn height(&self, x: i32, y: i32) -> f64 {
        let px = x as f64 + self.seed_offset;
        let py = y as f64 + self.seed_offset;

        let mut amplitude = 1.0;
        let mut frequency = self.params.base_frequency;
        let mut sum = 0.0;
        let mut total_amplitude = 0.0;

        for _ in 0..self.params.octaves.max(1) {
            let n = self.perlin.get([px * frequency, py * frequency]);
            // Perlin is in [-1,1]; fold each octave into [0,1] before summing
            sum += (n + 1.0) * 0.5 * amplitude;
            total_amplitude += amplitude;
            amplitude *= self.params.persistence;
            frequency *= self.params.lacunarity;
        }

        (sum / total_amplitude).clamp(0.0, 1.0)
    }

    /// Sample a biome value at a world cell. Result is in [-1,1].
    ///
    /// `axis_offset` selects which region of the noise field the value lives
    /// in; use [`TEMPERATURE_OFFSET`] and [`HUMIDITY_OFFSET`].
    pub fn biome(&self, x: i32, y: i32, axis_offset: f64) -> f64 {
        let px = (x as f64 + self.seed_offset + axis_offset) * self.params.biome_scale;
        let py = (y as f64 + self.seed_offset + axis_offset) * self.params.biome_scale;

        let n01 = (self.perlin.get([px, py]) + 1.0) * 0.5;
        (n01 * 2.0 - 1.0).clamp(-1.0, 1.0)
    }

    /// Sample every field at once.
    pub fn sample(&self, x: i32, y: i32) -> FieldSample {
        FieldSample {
            height: self.height(x, y),
            temperature: self.biome(x, y, TEMPERATURE_OFFSET),
            humidity: self.biome(x, y, HUMIDITY_OFFSET),
        }
    }
}
