//! Preset types and definitions
//!
//! A preset is a template for a multi-cell structure stamped onto the world.
//! Cell offsets are relative to the anchor and stateless, so the same preset
//! can be stamped at any anchor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chunk::WorldCell;
use crate::noise_field::FieldSample;
use crate::terrain::TerrainId;

/// Index into the preset registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresetId(pub u16);

/// One cell of a preset template.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PresetCell {
    /// Offset from the anchor cell
    pub dx: i32,
    pub dy: i32,
    /// Terrain written into the target cell
    pub terrain: TerrainId,
    /// Placement priority; on a contested cell the higher priority wins
    pub priority: i32,
}

/// A stamped multi-cell structure template.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    /// May spawn opportunistically during chunk generation
    pub natural_spawn: bool,
    /// Natural-spawn probability per qualifying attempt
    pub spawn_chance: f64,
    /// Minimum Euclidean distance (cell units) from other instances
    pub min_spacing: f64,
    /// Acceptance window on the height field
    pub height_window: (f64, f64),
    /// Acceptance window on temperature
    pub temperature_window: (f64, f64),
    /// Acceptance window on humidity
    pub humidity_window: (f64, f64),
    pub cells: Vec<PresetCell>,
    /// Terrain types eligible as an anchor for interactive placement;
    /// None = any terrain triggers
    pub trigger_terrain: Option<Vec<TerrainId>>,
}

impl Preset {
    /// Whether a cell's field sample falls inside the acceptance windows.
    pub fn accepts(&self, sample: &FieldSample) -> bool {
        within(sample.height, self.height_window)
            && within(sample.temperature, self.temperature_window)
            && within(sample.humidity, self.humidity_window)
    }

    /// Whether a cell with the given terrain may anchor an interactive
    /// placement of this preset.
    pub fn triggers_on(&self, terrain: Option<TerrainId>) -> bool {
        match &self.trigger_terrain {
            None => true,
            Some(whitelist) => terrain.map_or(false, |t| whitelist.contains(&t)),
        }
    }

    /// Bounding half-extents of the template, for preview sizing.
    pub fn extent(&self) -> (i32, i32) {
        let mut ex = 0;
        let mut ey = 0;
        for cell in &self.cells {
            ex = ex.max(cell.dx.abs());
            ey = ey.max(cell.dy.abs());
        }
        (ex, ey)
    }
}

fn within(value: f64, window: (f64, f64)) -> bool {
    value >= window.0 && value <= window.1
}

/// Immutable registry of preset templates.
#[derive(Clone, Debug, Default)]
pub struct PresetRegistry {
    presets: Vec<Preset>,
}

impl PresetRegistry {
    pub fn new(presets: Vec<Preset>) -> Self {
        Self { presets }
    }

    pub fn get(&self, id: PresetId) -> Option<&Preset> {
        self.presets.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<PresetId> {
        self.presets
            .iter()
            .position(|p| p.name == name)
            .map(|i| PresetId(i as u16))
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PresetId, &Preset)> {
        self.presets
            .iter()
            .enumerate()
            .map(|(i, p)| (PresetId(i as u16), p))
    }

    /// Presets eligible for natural spawning.
    pub fn naturals(&self) -> Vec<(PresetId, &Preset)> {
        self.iter().filter(|(_, p)| p.natural_spawn).collect()
    }
}

/// A preset instance stamped into a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedPreset {
    pub preset: PresetId,
    pub anchor: WorldCell,
}

/// Transient per-batch bookkeeping for one chunk's placement pass.
///
/// Tracks the anchors already consumed (for the minimum-spacing check) and
/// the priority each written cell was claimed at (so a contested cell ends
/// up with the highest-priority content regardless of stamp order).
/// Discarded after the batch.
#[derive(Debug, Default)]
pub struct PlacementRecord {
    anchors: Vec<(WorldCell, PresetId)>,
    claimed: HashMap<WorldCell, i32>,
}

impl PlacementRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a previously-placed anchor lies within `spacing` of `anchor`.
    pub fn violates_spacing(&self, anchor: WorldCell, spacing: f64) -> bool {
        self.anchors
            .iter()
            .any(|(placed, _)| placed.distance(&anchor) < spacing)
    }

    pub fn push_anchor(&mut self, anchor: WorldCell, preset: PresetId) {
        self.anchors.push((anchor, preset));
    }

    /// Try to claim a cell at a priority. Returns false when a prior claim
    /// at strictly higher priority holds the cell.
    pub fn claim(&mut self, cell: WorldCell, priority: i32) -> bool {
        match self.claimed.get(&cell) {
            Some(&held) if held > priority => false,
            _ => {
                self.claimed.insert(cell, priority);
                true
            }
        }
    }

    pub fn placed_count(&self) -> usize {
        self.anchors.len()
    }
}

/// One cell of an interactive placement preview.
#[derive(Clone, Copy, Debug)]
pub struct PreviewCell {
    pub cell: WorldCell,
    pub terrain: TerrainId,
    pub writable: bool,
}

/// Translucent-overlay data for an uncommitted interactive placement,
/// recomputed whenever the pointer cell changes.
#[derive(Clone, Debug)]
pub struct PlacementPreview {
    pub preset: PresetId,
    pub anchor: WorldCell,
    pub cells: Vec<PreviewCell>,
    /// Whether a commit at this anchor would succeed
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(height: f64, temperature: f64, humidity: f64) -> FieldSample {
        FieldSample {
            height,
            temperature,
            humidity,
        }
    }

    fn preset(height_window: (f64, f64)) -> Preset {
        Preset {
            name: "test".to_string(),
            natural_spawn: true,
            spawn_chance: 1.0,
            min_spacing: 4.0,
            height_window,
            temperature_window: (-1.0, 1.0),
            humidity_window: (-1.0, 1.0),
            cells: vec![PresetCell {
                dx: 0,
                dy: 0,
                terrain: TerrainId(0),
                priority: 0,
            }],
            trigger_terrain: None,
        }
    }

    #[test]
    fn test_acceptance_window() {
        let p = preset((0.3, 0.7));

        assert!(p.accepts(&sample(0.5, 0.0, 0.0)));
        assert!(p.accepts(&sample(0.3, -1.0, 1.0)));
        assert!(!p.accepts(&sample(0.2, 0.0, 0.0)));
        assert!(!p.accepts(&sample(0.8, 0.0, 0.0)));
    }

    #[test]
    fn test_trigger_whitelist() {
        let mut p = preset((0.0, 1.0));
        assert!(p.triggers_on(Some(TerrainId(3))));
        assert!(p.triggers_on(None));

        p.trigger_terrain = Some(vec![TerrainId(1), TerrainId(2)]);
        assert!(p.triggers_on(Some(TerrainId(2))));
        assert!(!p.triggers_on(Some(TerrainId(3))));
        assert!(!p.triggers_on(None));
    }

    #[test]
    fn test_record_spacing() {
        let mut record = PlacementRecord::new();
        record.push_anchor(WorldCell::new(0, 0), PresetId(0));

        assert!(record.violates_spacing(WorldCell::new(3, 4), 6.0));
        assert!(!record.violates_spacing(WorldCell::new(3, 4), 5.0));
    }

    #[test]
    fn test_record_priority_claims() {
        let mut record = PlacementRecord::new();
        let cell = WorldCell::new(1, 1);

        assert!(record.claim(cell, 2));
        assert!(!record.claim(cell, 1));
        assert!(record.claim(cell, 2));
        assert!(record.claim(cell, 5));
        assert!(!record.claim(cell, 4));
    }
}
