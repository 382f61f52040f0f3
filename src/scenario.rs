//! End-to-end verification runs.
//!
//! A [`Scenario`] owns a scratch [`Workspace`], writes the synthetic raster and
//! cache configuration into it, lets a [`Seeder`] populate the cache and then
//! checks tiles from any [`TileBackend`] against the reference sampler.
//!
//! ```rust,no_run
//! use tilecheck::{BackendKind, MapcacheSeeder, OracleConfig, Scenario, TileAddress};
//!
//! let config = OracleConfig::default();
//! let seeder = MapcacheSeeder::new(&config.seeder, config.seed_timeout);
//! let scenario = Scenario::prepare(config)?;
//! scenario.seed(&seeder, BackendKind::Disk)?;
//!
//! let backend = scenario.backend(BackendKind::Disk);
//! let result = scenario.verify_tile(backend.as_ref(), TileAddress::new(0, 0, 0))?;
//! assert!(result.matched);
//! # Ok::<(), tilecheck::OracleError>(())
//! ```

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::backend::{BackendKind, TileBackend, open_backend};
use crate::compare::{ComparisonResult, compare};
use crate::config::{OracleConfig, write_config};
use crate::error::{OracleError, OracleResult};
use crate::geotiff_reader::open_geotiff;
use crate::sampler::ReferenceSampler;
use crate::seeder::{SeedOutput, Seeder};
use crate::synthetic::SyntheticRaster;
use crate::tile_grid::{TileAddress, TileGrid};
use crate::tile_image::TileImage;

/// File marking a directory as a tilecheck workspace
pub const WORKSPACE_MARKER: &str = ".tilecheck-workspace";

/// Scratch directory removed when dropped, whatever the outcome of the run
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Create `path`, clearing anything a previous run left behind.
    ///
    /// An existing directory is only cleared when it carries
    /// [`WORKSPACE_MARKER`]. Any other non-empty directory is refused.
    pub fn create(path: impl Into<PathBuf>) -> OracleResult<Self> {
        let path = path.into();
        if path.is_dir() {
            if path.join(WORKSPACE_MARKER).is_file() {
                info!(path = %path.display(), "Clearing previous workspace");
                std::fs::remove_dir_all(&path)?;
            } else if std::fs::read_dir(&path)?.next().is_some() {
                return Err(OracleError::Config(format!(
                    "Refusing to use {}: directory is not empty and was not created by tilecheck",
                    path.display()
                )));
            }
        }
        std::fs::create_dir_all(&path)?;
        std::fs::write(path.join(WORKSPACE_MARKER), b"")?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "Cleanup complete"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Cleanup failed"),
        }
    }
}

/// A prepared verification run
#[derive(Debug)]
pub struct Scenario {
    config: OracleConfig,
    grid: TileGrid,
    config_file: PathBuf,
    workspace: Workspace,
}

impl Scenario {
    /// Create the workspace, write the synthetic raster and render the cache
    /// configuration
    pub fn prepare(config: OracleConfig) -> OracleResult<Self> {
        let workspace = Workspace::create(&config.work_dir)?;
        std::fs::create_dir_all(config.cache_base_dir())?;

        SyntheticRaster::new(config.raster_width, config.raster_height).write(config.raster_path())?;
        let config_file = write_config(&config)?;

        Ok(Self { grid: config.grid.to_tile_grid(), config, config_file, workspace })
    }

    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        self.workspace.path()
    }

    /// Rendered cache configuration
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Populate the tileset of `kind` at the configured zoom levels
    pub fn seed(&self, seeder: &dyn Seeder, kind: BackendKind) -> OracleResult<SeedOutput> {
        info!(backend = %kind, "Seeding storage backend");
        seeder.seed(&self.config_file, &kind.default_tileset(), &self.config.zoom_levels)
    }

    /// Reader for the tiles the bundled configuration stores for `kind`
    #[must_use]
    pub fn backend(&self, kind: BackendKind) -> Box<dyn TileBackend> {
        open_backend(kind, &self.config.cache_base_dir(), &kind.default_tileset(), &self.config.grid_name)
    }

    /// Expected tile, sampled from the raster file the cache reads
    pub fn expected_tile(&self, tile: TileAddress) -> OracleResult<TileImage> {
        let source = open_geotiff(self.config.raster_path())?;
        Ok(ReferenceSampler::new(&source).sample_tile(&self.grid, tile))
    }

    /// Compare the cached tile in `backend` with the expected one
    pub fn verify_tile(
        &self,
        backend: &dyn TileBackend,
        tile: TileAddress,
    ) -> OracleResult<ComparisonResult> {
        info!(backend = %backend.kind(), tile = %tile, "Verifying tile");
        let expected = self.expected_tile(tile)?;
        let actual = backend.read_tile(tile)?;
        Ok(compare(&expected, actual.as_ref()))
    }

    /// Verify several tiles from one backend
    pub fn verify_tiles(
        &self,
        backend: &dyn TileBackend,
        tiles: &[TileAddress],
    ) -> OracleResult<Vec<(TileAddress, ComparisonResult)>> {
        tiles
            .iter()
            .map(|&tile| Ok((tile, self.verify_tile(backend, tile)?)))
            .collect()
    }
}
