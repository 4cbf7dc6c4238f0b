//! Terrain type registry and per-cell selection
//!
//! Terrain types are immutable configuration data: each covers a height
//! interval and carries a spawn frequency plus an independent rarity gate.
//! Selection draws a cell-seeded gate and tiebreak, filters candidates by
//! height, and resolves overlaps with weighted roulette. Overlapping height
//! ranges are expected and resolved by weighting; a coverage gap falls back
//! to the configured fallback type, never an error.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::chunk::WorldCell;
use crate::noise_field::FieldSample;
use crate::seeds::cell_seed;

/// Index into the terrain registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerrainId(pub u16);

/// One kind of cell content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainDef {
    pub name: String,
    /// Glyph for ASCII output
    #[serde(default = "default_glyph")]
    pub glyph: char,
    /// RGB color for map export
    #[serde(default)]
    pub color: [u8; 3],
    /// Cells of this type block movement
    #[serde(default)]
    pub collides: bool,
    /// Cells of this type can be interacted with
    #[serde(default)]
    pub interactable: bool,
    /// Valid height interval, inclusive, within [0,1]
    pub height_range: (f64, f64),
    /// Spawn frequency weight in [0,1]
    pub frequency: f64,
    /// Independent random-gate probability in [0,1]
    #[serde(default = "default_rarity_gate")]
    pub rarity_gate: f64,
}

fn default_glyph() -> char {
    '?'
}

fn default_rarity_gate() -> f64 {
    1.0
}

impl TerrainDef {
    pub fn covers(&self, height: f64) -> bool {
        height >= self.height_range.0 && height <= self.height_range.1
    }
}

/// Registry of terrain types plus selection configuration.
///
/// Created at load time, never mutated at runtime.
#[derive(Clone, Debug)]
pub struct TerrainRegistry {
    defs: Vec<TerrainDef>,
    fallback: Option<TerrainId>,
    frequency_multiplier: f64,
}

impl TerrainRegistry {
    pub fn new(defs: Vec<TerrainDef>, fallback: Option<TerrainId>, frequency_multiplier: f64) -> Self {
        Self {
            defs,
            fallback,
            frequency_multiplier,
        }
    }

    pub fn get(&self, id: TerrainId) -> Option<&TerrainDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<TerrainId> {
        self.defs
            .iter()
            .position(|d| d.name == name)
            .map(|i| TerrainId(i as u16))
    }

    pub fn fallback(&self) -> Option<TerrainId> {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TerrainId, &TerrainDef)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, d)| (TerrainId(i as u16), d))
    }

    /// Height sub-intervals of [0,1] covered by no terrain type.
    ///
    /// A gap is a content-authoring mistake worth a startup warning; cells
    /// landing in one get the fallback at runtime.
    pub fn coverage_gaps(&self) -> Vec<(f64, f64)> {
        let mut ranges: Vec<(f64, f64)> = self
            .defs
            .iter()
            .map(|d| d.height_range)
            .filter(|(lo, hi)| hi >= lo)
            .collect();
        ranges.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut gaps = Vec::new();
        let mut covered_to = 0.0f64;
        for (lo, hi) in ranges {
            if lo > covered_to {
                gaps.push((covered_to, lo));
            }
            covered_to = covered_to.max(hi);
        }
        if covered_to < 1.0 {
            gaps.push((covered_to, 1.0));
        }
        gaps
    }

    /// Pick the terrain type occupying a cell.
    ///
    /// Deterministic in (terrain_seed, cell): the gate and tiebreak draws
    /// come from a cell-seeded RNG, so the result is independent of call
    /// order and threading. Temperature and humidity ride along in the
    /// sample for callers that condition on them; the candidate filter
    /// itself is by height.
    pub fn select(&self, terrain_seed: u64, cell: WorldCell, sample: &FieldSample) -> Option<TerrainId> {
        let mut rng = ChaCha8Rng::seed_from_u64(cell_seed(terrain_seed, cell.x, cell.y));
        let gate: f64 = rng.gen();
        let tiebreak: f64 = rng.gen();
        self.select_with_draws(sample.height, gate, tiebreak)
    }

    /// Selection core with explicit gate/tiebreak draws.
    pub fn select_with_draws(&self, height: f64, gate: f64, tiebreak: f64) -> Option<TerrainId> {
        let mut candidates: Vec<(TerrainId, f64)> = Vec::new();
        for (id, def) in self.iter() {
            if !def.covers(height) {
                continue;
            }
            let gate_factor = if gate <= def.rarity_gate { 1.0 } else { 0.0 };
            let probability = def.frequency * self.frequency_multiplier * gate_factor;
            if probability > 0.0 {
                candidates.push((id, probability));
            }
        }

        match candidates.len() {
            0 => self.fallback,
            1 => Some(candidates[0].0),
            _ => Some(roulette(&candidates, tiebreak)),
        }
    }
}

/// Weighted roulette selection over a cumulative distribution.
///
/// `candidates` is non-empty and every probability is positive. If roundoff
/// leaves the threshold above the final cumulative weight, the candidate
/// with the highest raw probability wins.
fn roulette(candidates: &[(TerrainId, f64)], tiebreak: f64) -> TerrainId {
    let total: f64 = candidates.iter().map(|(_, p)| p).sum();
    let threshold = tiebreak * total;

    let mut cumulative = 0.0;
    for &(id, probability) in candidates {
        cumulative += probability;
        if cumulative >= threshold {
            return id;
        }
    }

    candidates
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| *id)
        .expect("roulette requires at least one candidate")
}
