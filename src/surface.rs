//! Render/collision surface boundary
//!
//! The streaming manager is the sole writer to the surface for any chunk's
//! cell range; callers must not write to the same cells concurrently. That
//! contract is documented, not enforced here.

use std::collections::HashMap;

use crate::chunk::WorldCell;
use crate::terrain::TerrainId;

/// External surface that actually paints tiles and carries collision.
pub trait TileSurface {
    /// Write a cell's tile and collision flag.
    fn set_cell(&mut self, cell: WorldCell, tile: TerrainId, collides: bool);

    /// Remove a cell's content.
    fn clear_cell(&mut self, cell: WorldCell);

    /// Current tile at a cell, if any.
    fn cell(&self, cell: WorldCell) -> Option<TerrainId>;
}

/// In-memory surface used by the demo binary and tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    cells: HashMap<WorldCell, (TerrainId, bool)>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn collides(&self, cell: WorldCell) -> bool {
        self.cells.get(&cell).map(|(_, c)| *c).unwrap_or(false)
    }
}

impl TileSurface for MemorySurface {
    fn set_cell(&mut self, cell: WorldCell, tile: TerrainId, collides: bool) {
        self.cells.insert(cell, (tile, collides));
    }

    fn clear_cell(&mut self, cell: WorldCell) {
        self.cells.remove(&cell);
    }

    fn cell(&self, cell: WorldCell) -> Option<TerrainId> {
        self.cells.get(&cell).map(|(t, _)| *t)
    }
}
