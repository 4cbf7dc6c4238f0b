//! Debug export of generated chunks
//!
//! Stitches chunk grids into a PNG, one pixel per cell, using the terrain
//! registry colors. Cells with no tile and never-generated gaps inside the
//! bounding box stay transparent.

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::chunk::Chunk;
use crate::terrain::TerrainRegistry;

/// Export a set of generated chunks as a PNG image.
///
/// Returns Ok(false) without writing when there is nothing to draw.
pub fn export_chunks<'a>(
    chunks: impl IntoIterator<Item = &'a Chunk>,
    registry: &TerrainRegistry,
    path: &str,
) -> Result<bool, image::ImageError> {
    let chunks: Vec<&Chunk> = chunks.into_iter().filter(|c| c.generated).collect();
    let Some(first) = chunks.first() else {
        return Ok(false);
    };

    let size = first.size as i32;
    let min_x = chunks.iter().map(|c| c.coord.x).min().unwrap_or(0);
    let min_y = chunks.iter().map(|c| c.coord.y).min().unwrap_or(0);
    let max_x = chunks.iter().map(|c| c.coord.x).max().unwrap_or(0);
    let max_y = chunks.iter().map(|c| c.coord.y).max().unwrap_or(0);

    let width = ((max_x - min_x + 1) * size) as u32;
    let height = ((max_y - min_y + 1) * size) as u32;
    let mut img: RgbaImage = ImageBuffer::new(width, height);

    for chunk in &chunks {
        let ox = ((chunk.coord.x - min_x) * size) as u32;
        let oy = ((chunk.coord.y - min_y) * size) as u32;
        for ly in 0..chunk.size {
            for lx in 0..chunk.size {
                let pixel = match *chunk.tiles.get(lx, ly) {
                    Some(id) => {
                        let [r, g, b] = registry.get(id).map(|d| d.color).unwrap_or([0, 0, 0]);
                        Rgba([r, g, b, 255])
                    }
                    None => Rgba([0, 0, 0, 0]),
                };
                img.put_pixel(ox + lx as u32, oy + ly as u32, pixel);
            }
        }
    }

    img.save(path)?;
    Ok(true)
}
