//! # tilecheck - Correctness oracle for tile caches
//!
//! Predicts, independently of the system under test, the exact pixels a cached
//! map tile must contain and checks the tile a cache actually stored against
//! that prediction, bit for bit.
//!
//! ## Features
//!
//! - **Self-describing source**: synthetic GeoTIFF whose pixel values encode
//!   their own row and column
//! - **Tile geometry**: (zoom, column, row) to geographic bounds in a north-up
//!   pyramid grid
//! - **Reference sampling**: nearest-neighbour sampling straight from the
//!   source raster, black outside its extent
//! - **Backends**: path-addressed disk caches and SQLite blob stores
//! - **Exact comparison**: signed difference grid plus the first differing
//!   samples
//! - **Seeding**: drives `mapcache_seed` with a timeout
//!
//! ## Quick Start
//!
//! ```rust
//! use tilecheck::{compare, expected_tile, Point, SyntheticRaster, TileAddress, TileGrid};
//!
//! let source = SyntheticRaster::new(512, 512).to_raster()?;
//! let grid = TileGrid::new(1000.0, Point::new(-500_000.0, 500_000.0), 256);
//!
//! let expected = expected_tile(&source, &grid, TileAddress::new(1, 1, 2));
//! let result = compare(&expected, Some(&expected));
//! assert!(result.matched);
//! # Ok::<(), tilecheck::OracleError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`synthetic`]: synthetic raster generation and GeoTIFF writing
//! - [`geotiff_reader`]: reading the source raster back
//! - [`geometry`]: coordinate types ([`Point`], [`BoundingBox`]) and the
//!   affine [`GeoTransform`]
//! - [`tile_grid`]: tile addressing and bounds
//! - [`sampler`]: expected tiles via [`ReferenceSampler`]
//! - [`backend`]: cached tile readers behind [`TileBackend`]
//! - [`compare`](mod@compare): exact comparison
//! - [`config`], [`seeder`], [`scenario`]: running against a real cache

// ============================================================================
// Public modules
// ============================================================================

pub mod backend;
pub mod compare;
pub mod config;
pub mod error;
pub mod geometry;
pub mod geotiff_reader;
pub mod raster;
pub mod sampler;
pub mod scenario;
pub mod seeder;
pub mod synthetic;
pub mod tile_grid;
pub mod tile_image;

// ============================================================================
// Errors
// ============================================================================

pub use error::{OracleError, OracleResult};

// ============================================================================
// Geometry
// ============================================================================

pub use geometry::{BoundingBox, GeoTransform, Point};
pub use tile_grid::{
    DEFAULT_TILE_SIZE,
    TileAddress,
    TileGrid,
    tile_bounds,
};

// ============================================================================
// Source Raster
// ============================================================================

pub use raster::{GeoRaster, RasterSource};
pub use synthetic::{
    SyntheticCompression,
    SyntheticRaster,
    encode_pixel,
    generate_synthetic_geotiff,
};
pub use geotiff_reader::open_geotiff;

// ============================================================================
// Expected Tiles & Comparison
// ============================================================================

pub use sampler::{ReferenceSampler, ResamplingMethod, expected_tile};
pub use tile_image::TileImage;
pub use compare::{
    ComparisonResult,
    PixelMismatch,
    compare,
};

// ============================================================================
// Backends
// ============================================================================

pub use backend::{
    BackendKind,
    DiskLayout,
    DiskTileStore,
    SqliteTileStore,
    TileBackend,
    open_backend,
};

// ============================================================================
// Running Against a Cache
// ============================================================================

pub use config::{GridConfig, OracleConfig, render_template, write_config};
pub use seeder::{MapcacheSeeder, SeedOutput, Seeder};
pub use scenario::{Scenario, WORKSPACE_MARKER, Workspace};
