//! Per-chunk content generation
//!
//! Orchestrates one chunk's generation: sample the noise fields for every
//! cell, select base terrain, then run the preset placement batch once.
//! Base terrain always completes before presets run. The result is a pure
//! function of (seed, chunk coordinate) — regenerating a chunk yields a
//! byte-identical grid.

use rayon::prelude::*;

use crate::chunk::{Chunk, ChunkCoord, Grid};
use crate::noise_field::{FieldSample, NoiseField, NoiseParams};
use crate::presets::{PresetPlacementEngine, PresetRegistry, StampPolicy};
use crate::seeds::WorldSeeds;
use crate::terrain::{TerrainId, TerrainRegistry};

/// Generates chunk content from the registries and seed set.
pub struct ChunkGenerator {
    seeds: WorldSeeds,
    noise: NoiseField,
    terrain: TerrainRegistry,
    presets: PresetPlacementEngine,
    chunk_size: usize,
}

impl ChunkGenerator {
    pub fn new(
        seeds: WorldSeeds,
        noise_params: NoiseParams,
        terrain: TerrainRegistry,
        presets: PresetRegistry,
        stamp_policy: StampPolicy,
        max_presets_per_chunk: usize,
        chunk_size: usize,
    ) -> Self {
        Self {
            noise: NoiseField::new(seeds.height, noise_params),
            presets: PresetPlacementEngine::new(
                presets,
                stamp_policy,
                max_presets_per_chunk,
                seeds.placement,
            ),
            seeds,
            terrain,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn terrain(&self) -> &TerrainRegistry {
        &self.terrain
    }

    pub fn presets(&self) -> &PresetPlacementEngine {
        &self.presets
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Generate one chunk's full content.
    pub fn generate(&self, coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::new(coord, self.chunk_size);
        let samples = self.sample_fields(coord);

        // Base terrain. Selection is cell-local and seeded by coordinates,
        // so row order cannot change the outcome.
        let size = self.chunk_size;
        let base = chunk.coord.base_cell(size);
        let selected: Vec<Option<TerrainId>> = (0..size * size)
            .into_par_iter()
            .map(|i| {
                let lx = i % size;
                let ly = i / size;
                let cell = base.offset(lx as i32, ly as i32);
                self.terrain
                    .select(self.seeds.terrain, cell, samples.get(lx, ly))
            })
            .collect();

        for ly in 0..size {
            for lx in 0..size {
                let id = selected[ly * size + lx];
                let (collides, interactable) = id
                    .and_then(|t| self.terrain.get(t))
                    .map(|d| (d.collides, d.interactable))
                    .unwrap_or((false, false));
                chunk.tiles.set(lx, ly, id);
                chunk.collision.set(lx, ly, collides);
                chunk.interactable.set(lx, ly, interactable);
            }
        }

        // Presets overlay the base selection, once per chunk.
        self.presets
            .try_natural_placements(&mut chunk, &samples, &self.terrain);

        chunk.generated = true;
        chunk
    }

    /// Sample height/temperature/humidity for every cell of a chunk.
    pub fn sample_fields(&self, coord: ChunkCoord) -> Grid<FieldSample> {
        let size = self.chunk_size;
        let base = coord.base_cell(size);

        let samples: Vec<FieldSample> = (0..size * size)
            .into_par_iter()
            .map(|i| {
                let cell = base.offset((i % size) as i32, (i / size) as i32);
                self.noise.sample(cell.x, cell.y)
            })
            .collect();

        let mut grid = Grid::new(
            size,
            FieldSample {
                height: 0.0,
                temperature: 0.0,
                humidity: 0.0,
            },
        );
        for ly in 0..size {
            for lx in 0..size {
                grid.set(lx, ly, samples[ly * size + lx]);
            }
        }
        grid
    }
}
