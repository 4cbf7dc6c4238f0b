//! Chunk streaming around a moving observer
//!
//! Tracks which chunk coordinates must be resident given the observer
//! position and a render radius, generates newly-required chunks exactly
//! once, pushes them to the external surface, and pulls chunks back out
//! when they fall outside the keep radius. The keep radius sits one chunk
//! beyond the render radius by default, so a chunk flickering on the
//! boundary is not loaded and unloaded every tick.
//!
//! Loads and unloads are throttled per tick; the remainder is deferred so a
//! large jump spreads its cost across ticks instead of stalling one. When
//! the observer moves again, the deferred lists are recomputed from scratch
//! — per-chunk transitions are atomic, so abandoning a half-drained list
//! cannot corrupt anything.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunk::{Chunk, ChunkCoord, WorldCell};
use crate::generation::ChunkGenerator;
use crate::presets::{PlacedPreset, PlacementPreview, PresetId};
use crate::surface::TileSurface;
use crate::terrain::{TerrainDef, TerrainId};

/// How chunk distance is measured against the radii.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Square neighborhoods
    #[default]
    Chebyshev,
    /// Circular neighborhoods
    Euclidean,
}

impl DistanceMetric {
    fn distance(&self, a: &ChunkCoord, b: &ChunkCoord) -> f64 {
        match self {
            DistanceMetric::Chebyshev => a.chebyshev_distance(b) as f64,
            DistanceMetric::Euclidean => a.euclidean_distance(b),
        }
    }

    fn within(&self, a: &ChunkCoord, b: &ChunkCoord, radius: i32) -> bool {
        self.distance(a, b) <= radius as f64
    }
}

/// Streaming configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunk edge length in cells
    pub chunk_size: usize,
    /// Radius (in chunks) that must be resident around the observer
    pub render_distance: i32,
    /// Unload threshold; None = render_distance + 1 (hysteresis)
    pub keep_distance: Option<i32>,
    /// Maximum chunk loads processed per tick
    pub max_loads_per_tick: usize,
    /// Maximum chunk unloads processed per tick
    pub max_unloads_per_tick: usize,
    pub metric: DistanceMetric,
    /// Keep generated grids in memory when non-resident; false re-derives
    /// on revisit
    pub retain_generated: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            render_distance: 3,
            keep_distance: None,
            max_loads_per_tick: 4,
            max_unloads_per_tick: 8,
            metric: DistanceMetric::default(),
            retain_generated: true,
        }
    }
}

impl StreamingConfig {
    pub fn keep_distance(&self) -> i32 {
        self.keep_distance.unwrap_or(self.render_distance + 1)
    }
}

/// What one tick actually did.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    pub loaded: Vec<ChunkCoord>,
    pub unloaded: Vec<ChunkCoord>,
}

/// Streaming counters for debug display.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamingStats {
    pub resident: usize,
    pub generated: usize,
    pub pending_loads: usize,
    pub pending_unloads: usize,
}

/// Interactive placement state: one preset armed, preview following the
/// pointer.
#[derive(Debug)]
struct PlacementMode {
    preset: PresetId,
    pointer: Option<WorldCell>,
    preview: Option<PlacementPreview>,
}

/// Streams chunks in and out of an external surface around the observer.
///
/// All state transitions happen on the caller's tick; the manager holds no
/// threads. Chunks are keyed in a BTreeMap so iteration order is stable.
pub struct ChunkStreamingManager<S: TileSurface> {
    config: StreamingConfig,
    generator: ChunkGenerator,
    surface: S,
    chunks: BTreeMap<ChunkCoord, Chunk>,
    last_observer_chunk: Option<ChunkCoord>,
    pending_loads: VecDeque<ChunkCoord>,
    pending_unloads: VecDeque<ChunkCoord>,
    placement: Option<PlacementMode>,
}

impl<S: TileSurface> ChunkStreamingManager<S> {
    pub fn new(config: StreamingConfig, generator: ChunkGenerator, surface: S) -> Self {
        Self {
            config,
            generator,
            surface,
            chunks: BTreeMap::new(),
            last_observer_chunk: None,
            pending_loads: VecDeque::new(),
            pending_unloads: VecDeque::new(),
            placement: None,
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn generator(&self) -> &ChunkGenerator {
        &self.generator
    }

    /// Advance one tick with the observer's polled world position.
    pub fn tick(&mut self, observer: (f32, f32)) -> TickReport {
        let observer_chunk = WorldCell::from_world_pos(observer.0, observer.1)
            .chunk_coord(self.config.chunk_size);

        let moved = self.last_observer_chunk != Some(observer_chunk);
        if !moved && self.pending_loads.is_empty() && self.pending_unloads.is_empty() {
            return TickReport::default();
        }
        if moved {
            self.last_observer_chunk = Some(observer_chunk);
            self.recompute_pending(observer_chunk);
        }

        let mut report = TickReport::default();
        for _ in 0..self.config.max_unloads_per_tick {
            let Some(coord) = self.pending_unloads.pop_front() else {
                break;
            };
            if self.unload_chunk(coord) {
                report.unloaded.push(coord);
            }
        }
        for _ in 0..self.config.max_loads_per_tick {
            let Some(coord) = self.pending_loads.pop_front() else {
                break;
            };
            if self.load_chunk(coord) {
                report.loaded.push(coord);
            }
        }
        report
    }

    /// Rebuild the deferred load/unload lists for a new observer chunk.
    fn recompute_pending(&mut self, center: ChunkCoord) {
        let r = self.config.render_distance;
        let metric = self.config.metric;

        let mut loads: Vec<ChunkCoord> = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let coord = ChunkCoord::new(center.x + dx, center.y + dy);
                if !metric.within(&coord, &center, r) {
                    continue;
                }
                let resident = self.chunks.get(&coord).map(|c| c.resident).unwrap_or(false);
                if !resident {
                    loads.push(coord);
                }
            }
        }
        // Nearest first so the observer's surroundings fill in before the rim
        loads.sort_by(|a, b| {
            metric
                .distance(a, &center)
                .partial_cmp(&metric.distance(b, &center))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        self.pending_loads = loads.into();

        let keep = self.config.keep_distance();
        let mut unloads: Vec<ChunkCoord> = self
            .chunks
            .values()
            .filter(|c| c.resident && !metric.within(&c.coord, &center, keep))
            .map(|c| c.coord)
            .collect();
        // Farthest first
        unloads.sort_by(|a, b| {
            metric
                .distance(b, &center)
                .partial_cmp(&metric.distance(a, &center))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        self.pending_unloads = unloads.into();
    }

    /// Generate (once) and push one chunk to the surface.
    fn load_chunk(&mut self, coord: ChunkCoord) -> bool {
        let needs_generation = self
            .chunks
            .get(&coord)
            .map(|c| !c.generated)
            .unwrap_or(true);
        if needs_generation {
            let generated = self.generator.generate(coord);
            self.chunks.insert(coord, generated);
        }

        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if chunk.resident {
            return false;
        }

        for ly in 0..chunk.size {
            for lx in 0..chunk.size {
                if let Some(tile) = *chunk.tiles.get(lx, ly) {
                    let cell = chunk.world_cell(lx, ly);
                    self.surface.set_cell(cell, tile, *chunk.collision.get(lx, ly));
                }
            }
        }
        chunk.resident = true;
        debug!(x = coord.x, y = coord.y, "chunk loaded");
        true
    }

    /// Pull one chunk's content back out of the surface.
    fn unload_chunk(&mut self, coord: ChunkCoord) -> bool {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if !chunk.resident {
            return false;
        }
        chunk.resident = false;
        let size = chunk.size;
        let base = chunk.coord.base_cell(size);

        for ly in 0..size as i32 {
            for lx in 0..size as i32 {
                self.surface
                    .clear_cell(WorldCell::new(base.x + lx, base.y + ly));
            }
        }
        if !self.config.retain_generated {
            self.chunks.remove(&coord);
        }
        debug!(x = coord.x, y = coord.y, "chunk unloaded");
        true
    }

    /// Whether a chunk's content is currently on the surface.
    pub fn is_chunk_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).map(|c| c.resident).unwrap_or(false)
    }

    /// Terrain at a world cell; None for ungenerated coordinates or empty
    /// cells (defensive, never panics).
    pub fn terrain_at(&self, cell: WorldCell) -> Option<TerrainId> {
        let chunk = self.chunks.get(&cell.chunk_coord(self.config.chunk_size))?;
        if !chunk.generated {
            return None;
        }
        chunk.terrain_at(cell)
    }

    /// Full terrain definition at a world cell.
    pub fn terrain_def_at(&self, cell: WorldCell) -> Option<&TerrainDef> {
        self.generator.terrain().get(self.terrain_at(cell)?)
    }

    /// Whether the cell currently holds interactable content.
    pub fn is_interactable_at(&self, cell: WorldCell) -> bool {
        let Some(chunk) = self.chunks.get(&cell.chunk_coord(self.config.chunk_size)) else {
            return false;
        };
        chunk
            .local_of(cell)
            .map(|(lx, ly)| *chunk.interactable.get(lx, ly))
            .unwrap_or(false)
    }

    /// All chunks currently held in memory, generated or not.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn stats(&self) -> StreamingStats {
        StreamingStats {
            resident: self.chunks.values().filter(|c| c.resident).count(),
            generated: self.chunks.values().filter(|c| c.generated).count(),
            pending_loads: self.pending_loads.len(),
            pending_unloads: self.pending_unloads.len(),
        }
    }

    // ----- interactive placement -------------------------------------------

    /// Arm interactive placement for a preset. Returns whether placement
    /// mode was entered.
    pub fn request_interactive_placement(&mut self, preset: PresetId) -> bool {
        if self.generator.presets().registry().get(preset).is_none() {
            return false;
        }
        self.placement = Some(PlacementMode {
            preset,
            pointer: None,
            preview: None,
        });
        true
    }

    /// Feed the polled pointer position; recomputes the preview when the
    /// pointer cell changes. Ignored outside placement mode.
    pub fn update_pointer(&mut self, pointer: (f32, f32)) {
        let Some(mode) = &self.placement else {
            return;
        };
        let anchor = WorldCell::from_world_pos(pointer.0, pointer.1);
        if mode.pointer == Some(anchor) {
            return;
        }

        let preset_id = mode.preset;
        let preview = self.compute_preview(preset_id, anchor);
        if let Some(mode) = &mut self.placement {
            mode.pointer = Some(anchor);
            mode.preview = preview;
        }
    }

    /// Current translucent-overlay data, if placement mode is active and
    /// the pointer is over generated terrain.
    pub fn placement_preview(&self) -> Option<&PlacementPreview> {
        self.placement.as_ref()?.preview.as_ref()
    }

    /// Commit the armed preset at the current pointer cell. On success the
    /// changed cells are re-pushed to the surface and placement mode ends.
    /// Ignored outside placement mode.
    pub fn try_place_at_pointer(&mut self) -> bool {
        let Some(mode) = &self.placement else {
            return false;
        };
        let (preset_id, Some(anchor)) = (mode.preset, mode.pointer) else {
            return false;
        };

        let Some(preset) = self.generator.presets().registry().get(preset_id) else {
            return false;
        };
        let offsets: Vec<(i32, i32)> = preset.cells.iter().map(|c| (c.dx, c.dy)).collect();
        let spacing = preset.min_spacing;
        let nearby = self.placements_near(anchor, spacing);

        let coord = anchor.chunk_coord(self.config.chunk_size);
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if !chunk.generated {
            return false;
        }

        let placed = self.generator.presets().try_place_at(
            preset_id,
            anchor,
            chunk,
            self.generator.terrain(),
            &nearby,
        );
        if !placed {
            return false;
        }

        if chunk.resident {
            for (dx, dy) in offsets {
                let cell = anchor.offset(dx, dy);
                if let Some((lx, ly)) = chunk.local_of(cell) {
                    if let Some(tile) = *chunk.tiles.get(lx, ly) {
                        self.surface
                            .set_cell(cell, tile, *chunk.collision.get(lx, ly));
                    }
                }
            }
        }
        self.placement = None;
        true
    }

    /// Leave placement mode, discarding any preview. No-op outside it.
    pub fn cancel_placement_mode(&mut self) {
        self.placement = None;
    }

    fn compute_preview(&self, preset: PresetId, anchor: WorldCell) -> Option<PlacementPreview> {
        let spacing = self
            .generator
            .presets()
            .registry()
            .get(preset)
            .map(|p| p.min_spacing)
            .unwrap_or(0.0);
        let chunk = self.chunks.get(&anchor.chunk_coord(self.config.chunk_size))?;
        if !chunk.generated {
            return None;
        }
        let nearby = self.placements_near(anchor, spacing);
        self.generator.presets().preview(preset, anchor, chunk, &nearby)
    }

    /// Placements committed in chunks overlapping a radius around a cell.
    fn placements_near(&self, anchor: WorldCell, radius: f64) -> Vec<PlacedPreset> {
        let r = radius.ceil() as i32;
        let size = self.config.chunk_size;
        let min = anchor.offset(-r, -r).chunk_coord(size);
        let max = anchor.offset(r, r).chunk_coord(size);

        let mut found = Vec::new();
        for cy in min.y..=max.y {
            for cx in min.x..=max.x {
                if let Some(chunk) = self.chunks.get(&ChunkCoord::new(cx, cy)) {
                    found.extend(chunk.placements.iter().copied());
                }
            }
        }
        found
    }
}
