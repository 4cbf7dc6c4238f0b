//! Preset placement engine
//!
//! Natural placement runs once per chunk right after base terrain selection:
//! a budgeted attempt loop picks random in-chunk anchors, filters presets by
//! acceptance window, rolls the spawn chance, enforces minimum spacing
//! against the batch record, and stamps. The interactive path shares the
//! stamp but anchors at a caller-supplied cell and adds the trigger-terrain
//! check. Every failure is a silent skip counted against the attempt budget;
//! nothing here aborts a chunk's generation.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunk::{Chunk, Grid, WorldCell};
use crate::noise_field::FieldSample;
use crate::presets::types::{
    PlacedPreset, PlacementPreview, PlacementRecord, Preset, PresetCell, PresetId, PresetRegistry,
    PreviewCell,
};
use crate::seeds::cell_seed;
use crate::terrain::TerrainRegistry;

/// Attempts allowed per requested success before a batch gives up.
const ATTEMPTS_PER_SUCCESS: usize = 3;

/// What to do when some of a preset's target cells are not writable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampPolicy {
    /// All-or-nothing: fail unless every target cell is writable
    #[default]
    Strict,
    /// Proceed with whatever cells are writable; fail only when none are
    Partial,
}

/// Stamps preset templates into chunks under spacing and priority rules.
pub struct PresetPlacementEngine {
    registry: PresetRegistry,
    policy: StampPolicy,
    max_presets_per_chunk: usize,
    seed: u64,
}

impl PresetPlacementEngine {
    pub fn new(
        registry: PresetRegistry,
        policy: StampPolicy,
        max_presets_per_chunk: usize,
        seed: u64,
    ) -> Self {
        Self {
            registry,
            policy,
            max_presets_per_chunk,
            seed,
        }
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    /// Run the natural placement batch for one freshly-selected chunk.
    ///
    /// Deterministic in (placement seed, chunk coordinate). The batch RNG
    /// and record are chunk-local, so chunks stay independent.
    pub fn try_natural_placements(
        &self,
        chunk: &mut Chunk,
        samples: &Grid<FieldSample>,
        terrain: &TerrainRegistry,
    ) -> Vec<PlacedPreset> {
        let naturals = self.registry.naturals();
        if naturals.is_empty() || self.max_presets_per_chunk == 0 {
            return Vec::new();
        }

        let mut rng =
            ChaCha8Rng::seed_from_u64(cell_seed(self.seed, chunk.coord.x, chunk.coord.y));
        let mut record = PlacementRecord::new();
        let mut placed = Vec::new();

        let max_attempts = ATTEMPTS_PER_SUCCESS * self.max_presets_per_chunk;
        for _ in 0..max_attempts {
            if placed.len() >= self.max_presets_per_chunk {
                break;
            }

            let lx = rng.gen_range(0..chunk.size);
            let ly = rng.gen_range(0..chunk.size);
            let anchor = chunk.world_cell(lx, ly);
            let sample = *samples.get(lx, ly);

            let qualifying: Vec<&(PresetId, &Preset)> = naturals
                .iter()
                .filter(|(_, p)| p.accepts(&sample))
                .collect();
            if qualifying.is_empty() {
                continue;
            }

            let &(id, preset) = qualifying[rng.gen_range(0..qualifying.len())];
            if rng.gen::<f64>() > preset.spawn_chance {
                continue;
            }
            if record.violates_spacing(anchor, preset.min_spacing) {
                continue;
            }

            if self.stamp(preset, anchor, chunk, terrain, &mut record) {
                record.push_anchor(anchor, id);
                let instance = PlacedPreset { preset: id, anchor };
                chunk.placements.push(instance);
                placed.push(instance);
                debug!(
                    preset = preset.name.as_str(),
                    anchor_x = anchor.x,
                    anchor_y = anchor.y,
                    "placed preset"
                );
            }
        }

        placed
    }

    /// Interactive placement at a specific anchor.
    ///
    /// `nearby` holds placements already committed in the surrounding area;
    /// the anchor must clear the preset's minimum spacing against all of
    /// them and, when a trigger whitelist is configured, sit on a
    /// whitelisted terrain.
    pub fn try_place_at(
        &self,
        preset_id: PresetId,
        anchor: WorldCell,
        chunk: &mut Chunk,
        terrain: &TerrainRegistry,
        nearby: &[PlacedPreset],
    ) -> bool {
        let Some(preset) = self.registry.get(preset_id) else {
            return false;
        };
        if !preset.triggers_on(chunk.terrain_at(anchor)) {
            return false;
        }
        if nearby
            .iter()
            .any(|p| p.anchor.distance(&anchor) < preset.min_spacing)
        {
            return false;
        }

        let mut record = PlacementRecord::new();
        if self.stamp(preset, anchor, chunk, terrain, &mut record) {
            chunk.placements.push(PlacedPreset {
                preset: preset_id,
                anchor,
            });
            debug!(
                preset = preset.name.as_str(),
                anchor_x = anchor.x,
                anchor_y = anchor.y,
                "placed preset interactively"
            );
            true
        } else {
            false
        }
    }

    /// Compute the overlay for an uncommitted placement without mutating
    /// anything.
    pub fn preview(
        &self,
        preset_id: PresetId,
        anchor: WorldCell,
        chunk: &Chunk,
        nearby: &[PlacedPreset],
    ) -> Option<PlacementPreview> {
        let preset = self.registry.get(preset_id)?;

        let cells: Vec<PreviewCell> = preset
            .cells
            .iter()
            .map(|pc| {
                let cell = anchor.offset(pc.dx, pc.dy);
                PreviewCell {
                    cell,
                    terrain: pc.terrain,
                    writable: chunk.contains(cell),
                }
            })
            .collect();

        let writable = cells.iter().filter(|c| c.writable).count();
        let stampable = match self.policy {
            StampPolicy::Strict => writable == cells.len() && !cells.is_empty(),
            StampPolicy::Partial => writable > 0,
        };
        let valid = stampable
            && preset.triggers_on(chunk.terrain_at(anchor))
            && !nearby
                .iter()
                .any(|p| p.anchor.distance(&anchor) < preset.min_spacing);

        Some(PlacementPreview {
            preset: preset_id,
            anchor,
            cells,
            valid,
        })
    }

    /// Full-placement path shared by the natural and interactive modes.
    ///
    /// A target cell is writable iff it lies inside the destination chunk.
    /// Under `Strict` the whole placement fails unless every cell is
    /// writable; under `Partial` it fails only when none are. Cells are
    /// written in ascending priority order, and a cell already claimed in
    /// this batch at a higher priority is left alone.
    fn stamp(
        &self,
        preset: &Preset,
        anchor: WorldCell,
        chunk: &mut Chunk,
        terrain: &TerrainRegistry,
        record: &mut PlacementRecord,
    ) -> bool {
        let targets: Vec<(WorldCell, &PresetCell)> = preset
            .cells
            .iter()
            .map(|pc| (anchor.offset(pc.dx, pc.dy), pc))
            .collect();

        let mut writable: Vec<(WorldCell, &PresetCell)> = targets
            .iter()
            .filter(|(cell, _)| chunk.contains(*cell))
            .copied()
            .collect();

        let enough = match self.policy {
            StampPolicy::Strict => writable.len() == targets.len() && !targets.is_empty(),
            StampPolicy::Partial => !writable.is_empty(),
        };
        if !enough {
            return false;
        }

        writable.sort_by_key(|(_, pc)| pc.priority);
        for &(cell, pc) in &writable {
            if !record.claim(cell, pc.priority) {
                continue;
            }
            let Some((lx, ly)) = chunk.local_of(cell) else {
                continue;
            };
            let (collides, interactable) = terrain
                .get(pc.terrain)
                .map(|d| (d.collides, d.interactable))
                .unwrap_or((false, false));
            chunk.tiles.set(lx, ly, Some(pc.terrain));
            chunk.collision.set(lx, ly, collides);
            chunk.interactable.set(lx, ly, interactable);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkCoord;
    use crate::terrain::{TerrainDef, TerrainId};

    const SIZE: usize = 16;

    fn terrain_registry() -> TerrainRegistry {
        let defs = vec![
            TerrainDef {
                name: "grass".to_string(),
                glyph: ',',
                color: [0, 128, 0],
                collides: false,
                interactable: false,
                height_range: (0.0, 1.0),
                frequency: 1.0,
                rarity_gate: 1.0,
            },
            TerrainDef {
                name: "wall".to_string(),
                glyph: '#',
                color: [80, 80, 80],
                collides: true,
                interactable: false,
                height_range: (0.0, 0.0),
                frequency: 0.0,
                rarity_gate: 1.0,
            },
            TerrainDef {
                name: "altar".to_string(),
                glyph: 'O',
                color: [160, 160, 200],
                collides: false,
                interactable: true,
                height_range: (0.0, 0.0),
                frequency: 0.0,
                rarity_gate: 1.0,
            },
        ];
        TerrainRegistry::new(defs, Some(TerrainId(0)), 1.0)
    }

    fn one_cell_preset(name: &str, terrain: TerrainId, priority: i32, min_spacing: f64) -> Preset {
        Preset {
            name: name.to_string(),
            natural_spawn: true,
            spawn_chance: 1.0,
            min_spacing,
            height_window: (0.0, 1.0),
            temperature_window: (-1.0, 1.0),
            humidity_window: (-1.0, 1.0),
            cells: vec![PresetCell {
                dx: 0,
                dy: 0,
                terrain,
                priority,
            }],
            trigger_terrain: None,
        }
    }

    fn grass_chunk() -> Chunk {
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0), SIZE);
        for ly in 0..SIZE {
            for lx in 0..SIZE {
                chunk.tiles.set(lx, ly, Some(TerrainId(0)));
            }
        }
        chunk.generated = true;
        chunk
    }

    fn flat_samples() -> Grid<FieldSample> {
        Grid::new(
            SIZE,
            FieldSample {
                height: 0.5,
                temperature: 0.0,
                humidity: 0.0,
            },
        )
    }

    #[test]
    fn test_natural_batch_is_deterministic() {
        let registry = terrain_registry();
        let presets =
            PresetRegistry::new(vec![one_cell_preset("wall_spot", TerrainId(1), 1, 3.0)]);
        let engine = PresetPlacementEngine::new(presets, StampPolicy::Strict, 3, 77);

        let mut a = grass_chunk();
        let mut b = grass_chunk();
        let placed_a = engine.try_natural_placements(&mut a, &flat_samples(), &registry);
        let placed_b = engine.try_natural_placements(&mut b, &flat_samples(), &registry);

        assert_eq!(placed_a, placed_b);
        assert_eq!(a.tiles, b.tiles);
        assert_eq!(a.collision, b.collision);
    }

    #[test]
    fn test_natural_batch_respects_max_per_chunk() {
        let registry = terrain_registry();
        let presets =
            PresetRegistry::new(vec![one_cell_preset("wall_spot", TerrainId(1), 1, 0.0)]);
        let engine = PresetPlacementEngine::new(presets, StampPolicy::Strict, 2, 5);

        let mut chunk = grass_chunk();
        let placed = engine.try_natural_placements(&mut chunk, &flat_samples(), &registry);

        assert!(placed.len() <= 2);
        assert_eq!(chunk.placements.len(), placed.len());
    }

    #[test]
    fn test_natural_spacing_is_enforced() {
        let registry = terrain_registry();
        // Spacing larger than the chunk diagonal: at most one can ever land
        let presets =
            PresetRegistry::new(vec![one_cell_preset("spread", TerrainId(1), 1, 100.0)]);
        let engine = PresetPlacementEngine::new(presets, StampPolicy::Strict, 8, 21);

        let mut chunk = grass_chunk();
        let placed = engine.try_natural_placements(&mut chunk, &flat_samples(), &registry);

        assert!(placed.len() <= 1);
    }

    #[test]
    fn test_spacing_pair_never_closer_than_minimum() {
        let registry = terrain_registry();
        let presets = PresetRegistry::new(vec![one_cell_preset("spread", TerrainId(1), 1, 10.0)]);

        // Across many seeds no two anchors in a batch sit closer than 10
        for seed in 0..32u64 {
            let engine = PresetPlacementEngine::new(presets.clone(), StampPolicy::Strict, 8, seed);
            let mut chunk = grass_chunk();
            let placed = engine.try_natural_placements(&mut chunk, &flat_samples(), &registry);
            for i in 0..placed.len() {
                for j in (i + 1)..placed.len() {
                    assert!(placed[i].anchor.distance(&placed[j].anchor) >= 10.0);
                }
            }
        }
    }

    #[test]
    fn test_direct_placement_inside_spacing_fails() {
        let registry = terrain_registry();
        let presets = PresetRegistry::new(vec![one_cell_preset("spread", TerrainId(1), 1, 10.0)]);
        let engine = PresetPlacementEngine::new(presets, StampPolicy::Strict, 8, 0);

        let mut chunk = grass_chunk();
        let existing = vec![PlacedPreset {
            preset: PresetId(0),
            anchor: WorldCell::new(5, 5),
        }];

        assert!(!engine.try_place_at(
            PresetId(0),
            WorldCell::new(8, 9),
            &mut chunk,
            &registry,
            &existing,
        ));
        assert!(engine.try_place_at(
            PresetId(0),
            WorldCell::new(5, 15),
            &mut chunk,
            &registry,
            &existing,
        ));
    }

    #[test]
    fn test_priority_conflict_highest_wins_regardless_of_order() {
        let registry = terrain_registry();
        let low = one_cell_preset("low", TerrainId(1), 1, 0.0);
        let high = one_cell_preset("high", TerrainId(2), 5, 0.0);
        let engine = PresetPlacementEngine::new(
            PresetRegistry::new(vec![low.clone(), high.clone()]),
            StampPolicy::Strict,
            8,
            0,
        );

        let contested = WorldCell::new(4, 4);
        for order in [[&low, &high], [&high, &low]] {
            let mut chunk = grass_chunk();
            let mut record = PlacementRecord::new();
            for preset in order {
                assert!(engine.stamp(preset, contested, &mut chunk, &registry, &mut record));
            }
            assert_eq!(chunk.terrain_at(contested), Some(TerrainId(2)));
            let (lx, ly) = chunk.local_of(contested).unwrap();
            assert!(*chunk.interactable.get(lx, ly));
        }
    }

    #[test]
    fn test_strict_rejects_partial_stamps_at_chunk_edge() {
        let registry = terrain_registry();
        let wide = Preset {
            cells: (-2..=2)
                .map(|dx| PresetCell {
                    dx,
                    dy: 0,
                    terrain: TerrainId(1),
                    priority: 0,
                })
                .collect(),
            ..one_cell_preset("wide", TerrainId(1), 0, 0.0)
        };
        let presets = PresetRegistry::new(vec![wide]);

        // Anchor one cell from the edge: the westmost cell hangs outside
        let edge_anchor = WorldCell::new(1, 8);

        let strict = PresetPlacementEngine::new(presets.clone(), StampPolicy::Strict, 8, 0);
        let mut chunk = grass_chunk();
        assert!(!strict.try_place_at(PresetId(0), edge_anchor, &mut chunk, &registry, &[]));
        assert_eq!(chunk.terrain_at(edge_anchor), Some(TerrainId(0)));

        let partial = PresetPlacementEngine::new(presets, StampPolicy::Partial, 8, 0);
        let mut chunk = grass_chunk();
        assert!(partial.try_place_at(PresetId(0), edge_anchor, &mut chunk, &registry, &[]));
        assert_eq!(chunk.terrain_at(edge_anchor), Some(TerrainId(1)));
        assert_eq!(chunk.terrain_at(WorldCell::new(3, 8)), Some(TerrainId(1)));
    }

    #[test]
    fn test_trigger_whitelist_blocks_direct_placement() {
        let registry = terrain_registry();
        let mut preset = one_cell_preset("picky", TerrainId(2), 1, 0.0);
        preset.trigger_terrain = Some(vec![TerrainId(1)]);
        let engine = PresetPlacementEngine::new(
            PresetRegistry::new(vec![preset]),
            StampPolicy::Strict,
            8,
            0,
        );

        // Anchor is grass, whitelist wants wall
        let mut chunk = grass_chunk();
        assert!(!engine.try_place_at(PresetId(0), WorldCell::new(3, 3), &mut chunk, &registry, &[]));

        // Put a wall at the anchor and it goes through
        chunk.tiles.set(3, 3, Some(TerrainId(1)));
        assert!(engine.try_place_at(PresetId(0), WorldCell::new(3, 3), &mut chunk, &registry, &[]));
    }

    #[test]
    fn test_preview_reports_validity_without_mutation() {
        let registry = terrain_registry();
        let presets = PresetRegistry::new(vec![one_cell_preset("spot", TerrainId(1), 1, 10.0)]);
        let engine = PresetPlacementEngine::new(presets, StampPolicy::Strict, 8, 0);

        let chunk = grass_chunk();
        let before = chunk.tiles.clone();

        let ok = engine
            .preview(PresetId(0), WorldCell::new(4, 4), &chunk, &[])
            .unwrap();
        assert!(ok.valid);
        assert_eq!(ok.cells.len(), 1);

        let blocked = engine
            .preview(
                PresetId(0),
                WorldCell::new(4, 4),
                &chunk,
                &[PlacedPreset {
                    preset: PresetId(0),
                    anchor: WorldCell::new(6, 6),
                }],
            )
            .unwrap();
        assert!(!blocked.valid);

        assert_eq!(chunk.tiles, before);
    }
}
