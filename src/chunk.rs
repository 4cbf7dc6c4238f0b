//! Chunk data model
//!
//! World cells are integer tile coordinates; chunks are fixed-size square
//! blocks of cells and the unit of generation, load and unload. A chunk's
//! generated content is a pure function of (seed, chunk coordinate).

use serde::{Deserialize, Serialize};

use crate::presets::PlacedPreset;
use crate::terrain::TerrainId;

/// An integer (x, y) coordinate in tile space. Used as a key, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldCell {
    pub x: i32,
    pub y: i32,
}

impl WorldCell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell containing a continuous world position.
    pub fn from_world_pos(x: f32, y: f32) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
        }
    }

    /// Chunk containing this cell (floor division).
    pub fn chunk_coord(&self, chunk_size: usize) -> ChunkCoord {
        let size = chunk_size as i32;
        ChunkCoord {
            x: self.x.div_euclid(size),
            y: self.y.div_euclid(size),
        }
    }

    /// Euclidean distance to another cell, in cell units.
    pub fn distance(&self, other: &WorldCell) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Chunk coordinate (world cell / chunk size, floored).
///
/// Ord so chunk sets iterate in a stable order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// World cell at this chunk's minimum corner.
    pub fn base_cell(&self, chunk_size: usize) -> WorldCell {
        let size = chunk_size as i32;
        WorldCell {
            x: self.x * size,
            y: self.y * size,
        }
    }

    /// Chebyshev distance in chunk units.
    pub fn chebyshev_distance(&self, other: &ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Euclidean distance in chunk units.
    pub fn euclidean_distance(&self, other: &ChunkCoord) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A dense chunk-local `size x size` grid.
///
/// Unlike a world map there is no wrapping: grids are chunk-local and the
/// world is unbounded.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    size: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(size: usize, value: T) -> Self {
        Self {
            size,
            data: vec![value; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.size && y < self.size);
        y * self.size + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

/// One chunk's content plus lifecycle flags.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub size: usize,
    /// Terrain occupying each cell; None = no tile (uncovered height, no fallback)
    pub tiles: Grid<Option<TerrainId>>,
    pub collision: Grid<bool>,
    pub interactable: Grid<bool>,
    /// Presets stamped into this chunk, in placement order
    pub placements: Vec<PlacedPreset>,
    /// Content has been computed
    pub generated: bool,
    /// Content is currently pushed to the render surface
    pub resident: bool,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, size: usize) -> Self {
        Self {
            coord,
            size,
            tiles: Grid::new(size, None),
            collision: Grid::new(size, false),
            interactable: Grid::new(size, false),
            placements: Vec::new(),
            generated: false,
            resident: false,
        }
    }

    /// Local coordinates of a world cell, or None if outside this chunk.
    pub fn local_of(&self, cell: WorldCell) -> Option<(usize, usize)> {
        let base = self.coord.base_cell(self.size);
        let lx = cell.x - base.x;
        let ly = cell.y - base.y;
        if lx >= 0 && ly >= 0 && (lx as usize) < self.size && (ly as usize) < self.size {
            Some((lx as usize, ly as usize))
        } else {
            None
        }
    }

    /// World cell at local coordinates.
    pub fn world_cell(&self, lx: usize, ly: usize) -> WorldCell {
        let base = self.coord.base_cell(self.size);
        WorldCell {
            x: base.x + lx as i32,
            y: base.y + ly as i32,
        }
    }

    pub fn contains(&self, cell: WorldCell) -> bool {
        self.local_of(cell).is_some()
    }

    /// Terrain at a world cell, or None when the cell is outside the chunk
    /// or holds no tile.
    pub fn terrain_at(&self, cell: WorldCell) -> Option<TerrainId> {
        let (lx, ly) = self.local_of(cell)?;
        *self.tiles.get(lx, ly)
    }

    /// Iterate all world cells of this chunk in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = WorldCell> + '_ {
        let base = self.coord.base_cell(self.size);
        let size = self.size as i32;
        (0..size).flat_map(move |ly| {
            (0..size).map(move |lx| WorldCell {
                x: base.x + lx,
                y: base.y + ly,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coord_floor_division() {
        assert_eq!(WorldCell::new(0, 0).chunk_coord(16), ChunkCoord::new(0, 0));
        assert_eq!(WorldCell::new(15, 15).chunk_coord(16), ChunkCoord::new(0, 0));
        assert_eq!(WorldCell::new(16, 0).chunk_coord(16), ChunkCoord::new(1, 0));
        assert_eq!(WorldCell::new(-1, -1).chunk_coord(16), ChunkCoord::new(-1, -1));
        assert_eq!(WorldCell::new(-16, -17).chunk_coord(16), ChunkCoord::new(-1, -2));
    }

    #[test]
    fn test_world_pos_floors_negative() {
        assert_eq!(WorldCell::from_world_pos(-0.5, 2.9), WorldCell::new(-1, 2));
    }

    #[test]
    fn test_local_round_trip() {
        let chunk = Chunk::new(ChunkCoord::new(-2, 3), 16);

        for cell in chunk.cells().collect::<Vec<_>>() {
            let (lx, ly) = chunk.local_of(cell).unwrap();
            assert_eq!(chunk.world_cell(lx, ly), cell);
        }
        assert_eq!(chunk.cells().count(), 256);
    }

    #[test]
    fn test_outside_cell_is_not_local() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0), 16);

        assert!(chunk.local_of(WorldCell::new(16, 0)).is_none());
        assert!(chunk.local_of(WorldCell::new(0, -1)).is_none());
        assert!(chunk.terrain_at(WorldCell::new(40, 40)).is_none());
    }

    #[test]
    fn test_grid_indexing() {
        let mut grid = Grid::new(4, 0u8);
        grid.set(3, 1, 7);

        assert_eq!(*grid.get(3, 1), 7);
        assert_eq!(grid.as_slice()[1 * 4 + 3], 7);
    }
}
