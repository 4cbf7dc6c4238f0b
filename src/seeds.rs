//! Seed management for world generation
//!
//! Provides separate seeds for each generation system, derived from a single
//! master seed, plus a cell-local hash so per-cell randomness is reproducible
//! independent of call order or threading.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeds for the generation subsystems.
///
/// Each subsystem gets its own seed derived from the master, so changing one
/// aspect of generation (e.g. preset placement) never perturbs another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Height field sampling
    pub height: u64,
    /// Biome fields (temperature, humidity)
    pub biome: u64,
    /// Per-cell terrain selection draws
    pub terrain: u64,
    /// Preset placement batches
    pub placement: u64,
}

impl WorldSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            height: derive_seed(master, "height"),
            biome: derive_seed(master, "biome"),
            terrain: derive_seed(master, "terrain"),
            placement: derive_seed(master, "placement"),
        }
    }
}

/// Derive a sub-seed from a master seed and a subsystem name.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

/// Mix a subsystem seed with a cell coordinate into a per-cell seed.
///
/// The result depends only on (seed, x, y), so draws seeded from it are
/// stable across call order, ticks, and threads. Negative coordinates are
/// sign-extended before mixing, so (-1, 0) and (0, -1) differ.
pub fn cell_seed(seed: u64, x: i32, y: i32) -> u64 {
    let mut h = seed;
    h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
    h ^= x as i64 as u64;
    h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
    h ^= y as i64 as u64;
    h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
    h ^= h >> 32;
    h
}
