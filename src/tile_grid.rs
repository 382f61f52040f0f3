//! Tile pyramid addressing.
//!
//! Tiles are addressed by (zoom, column, row) with rows counted southward from
//! the grid origin, which is the top-left corner of zoom level 0. Resolution
//! halves with each zoom step and has no floor.

use std::fmt;

use crate::geometry::{BoundingBox, Point};

/// Default tile side length in pixels
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Tile address in a pyramid grid.
///
/// Column and row are not checked against `2^zoom`; callers may address tiles
/// outside the conventional range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub zoom: u32,
    pub col: u32,
    pub row: u32,
}

impl TileAddress {
    #[must_use]
    pub fn new(zoom: u32, col: u32, row: u32) -> Self {
        Self { zoom, col, row }
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z{}-X{}-Y{}", self.zoom, self.col, self.row)
    }
}

/// North-up tiling scheme: origin, zoom-0 resolution and tile size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    /// Map units per pixel at zoom 0
    pub base_resolution: f64,
    /// Top-left corner of zoom level 0
    pub origin: Point,
    /// Tile side length in pixels
    pub tile_size: usize,
}

impl TileGrid {
    #[must_use]
    pub fn new(base_resolution: f64, origin: Point, tile_size: usize) -> Self {
        Self { base_resolution, origin, tile_size }
    }

    /// Map units per pixel at `zoom`
    #[must_use]
    pub fn resolution(&self, zoom: u32) -> f64 {
        resolution_at(self.base_resolution, zoom)
    }

    /// Geographic bounds of a tile
    #[must_use]
    pub fn bounds(&self, tile: TileAddress) -> BoundingBox {
        tile_bounds(
            tile.zoom,
            tile.col,
            tile.row,
            self.base_resolution,
            self.origin.x,
            self.origin.y,
            self.tile_size,
        )
    }
}

#[inline]
fn resolution_at(base_resolution: f64, zoom: u32) -> f64 {
    // powi keeps exact powers of two for every zoom an i32 can express
    base_resolution / 2f64.powi(zoom.min(i32::MAX as u32) as i32)
}

/// Bounding box of tile (`zoom`, `col`, `row`) in an inverted-Y grid.
///
/// ```rust
/// use tilecheck::tile_bounds;
///
/// let bbox = tile_bounds(1, 1, 2, 1000.0, -500_000.0, 500_000.0, 256);
/// assert_eq!(bbox.minx, -372_000.0);
/// assert_eq!(bbox.maxy, 244_000.0);
/// ```
#[must_use]
pub fn tile_bounds(
    zoom: u32,
    col: u32,
    row: u32,
    base_resolution: f64,
    origin_x: f64,
    origin_y: f64,
    tile_pixel_size: usize,
) -> BoundingBox {
    let resolution = resolution_at(base_resolution, zoom);
    let span = tile_pixel_size as f64 * resolution;

    let minx = origin_x + f64::from(col) * span;
    let maxy = origin_y - f64::from(row) * span;
    let maxx = minx + span;
    let miny = maxy - span;

    BoundingBox { minx, miny, maxx, maxy }
}
