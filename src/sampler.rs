//! Reference tile sampling.
//!
//! Builds the tile a cache *must* produce for an address by sampling the
//! source raster directly, independently of the system under test. For every
//! output pixel the geographic center is computed from the tile bounds, mapped
//! through the inverse source geo-transform, and floored to a source pixel.
//! Pixels whose source falls outside the raster are black.
//!
//! Only nearest-neighbour sampling with a black edge policy is implemented. A
//! cache configured with another kernel (bilinear, cubic) or edge handling
//! cannot be checked by this oracle and will show mismatches along every
//! source pixel boundary.
//!
//! # Example
//!
//! ```rust
//! use tilecheck::{Point, ReferenceSampler, SyntheticRaster, TileAddress, TileGrid};
//!
//! let source = SyntheticRaster::new(512, 512).to_raster()?;
//! let grid = TileGrid::new(1000.0, Point::new(-500_000.0, 500_000.0), 256);
//!
//! let expected = ReferenceSampler::new(&source).sample_tile(&grid, TileAddress::new(0, 0, 0));
//! assert_eq!(expected.width(), 256);
//! # Ok::<(), tilecheck::OracleError>(())
//! ```

use tracing::debug;

use crate::geometry::BoundingBox;
use crate::raster::GeoRaster;
use crate::tile_grid::{TileAddress, TileGrid};
use crate::tile_image::{TILE_BANDS, TileImage};

/// Resampling kernel the oracle reproduces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResamplingMethod {
    /// Single closest source pixel, indices floored
    #[default]
    Nearest,
}

/// Samples expected tiles from a source raster
pub struct ReferenceSampler<'a> {
    source: &'a GeoRaster,
    method: ResamplingMethod,
}

impl<'a> ReferenceSampler<'a> {
    #[must_use]
    pub fn new(source: &'a GeoRaster) -> Self {
        Self { source, method: ResamplingMethod::default() }
    }

    #[must_use]
    pub fn method(&self) -> ResamplingMethod {
        self.method
    }

    /// Expected content of `tile` in `grid`
    #[must_use]
    pub fn sample_tile(&self, grid: &TileGrid, tile: TileAddress) -> TileImage {
        let bounds = grid.bounds(tile);
        debug!(
            tile = %tile,
            minx = bounds.minx,
            miny = bounds.miny,
            maxx = bounds.maxx,
            maxy = bounds.maxy,
            "Tile geographic bounds"
        );
        self.sample_with_resolution(&bounds, grid.resolution(tile.zoom), grid.tile_size)
    }

    /// Expected content of a square `tile_size` tile covering `bounds`
    #[must_use]
    pub fn sample_bounds(&self, bounds: &BoundingBox, tile_size: usize) -> TileImage {
        if tile_size == 0 {
            return TileImage::zeros(0);
        }
        let resolution = bounds.width() / tile_size as f64;
        self.sample_with_resolution(bounds, resolution, tile_size)
    }

    fn sample_with_resolution(
        &self,
        bounds: &BoundingBox,
        resolution: f64,
        tile_size: usize,
    ) -> TileImage {
        let mut tile = TileImage::zeros(tile_size);
        let mut outside = 0usize;
        let corner = bounds.top_left();

        for py in 0..tile_size {
            let map_y = corner.y - (py as f64 + 0.5) * resolution;
            for px in 0..tile_size {
                let map_x = corner.x + (px as f64 + 0.5) * resolution;

                let Some((col, row)) = self.source.pixel_at(map_x, map_y) else {
                    outside += 1;
                    continue;
                };
                let mut value = [0u8; TILE_BANDS];
                if let Some(src) = self.source.pixel(col, row) {
                    for (band, v) in value.iter_mut().enumerate() {
                        *v = src.get(band).copied().unwrap_or(0);
                    }
                }
                tile.set_pixel(px, py, value);
            }
        }

        if outside > 0 {
            debug!(outside, total = tile_size * tile_size, "Pixels outside source extent");
        }
        tile
    }
}

/// Expected tile for (`zoom`, `col`, `row`) in `grid`
#[must_use]
pub fn expected_tile(source: &GeoRaster, grid: &TileGrid, tile: TileAddress) -> TileImage {
    ReferenceSampler::new(source).sample_tile(grid, tile)
}
