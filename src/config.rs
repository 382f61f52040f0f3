//! Scenario configuration and cache configuration templating.
//!
//! [`OracleConfig::default`] reads overrides from the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TILECHECK_WORK_DIR` | `/tmp/mc_test` |
//! | `TILECHECK_SEEDER` | `mapcache_seed` |
//! | `TILECHECK_SEED_TIMEOUT_SECS` | `300` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::error::{OracleError, OracleResult};
use crate::geometry::Point;
use crate::tile_grid::{DEFAULT_TILE_SIZE, TileGrid};

/// Token replaced by the synthetic raster path
pub const RASTER_PATH_PLACEHOLDER: &str = "SYNTHETIC_GEOTIFF_PATH_PLACEHOLDER";
/// Token replaced by the cache base directory
pub const CACHE_BASE_PLACEHOLDER: &str = "TILE_CACHE_BASE_DIR";

/// Cache configuration declaring the synthetic grid, a disk cache and a
/// SQLite cache with one tileset each
pub const BUNDLED_TEMPLATE: &str = include_str!("../data/mapcache_backend_template.xml");

const DEFAULT_WORK_DIR: &str = "/tmp/mc_test";
const DEFAULT_SEEDER: &str = "mapcache_seed";
const DEFAULT_SEED_TIMEOUT_SECS: u64 = 300;

/// Tiling scheme parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    pub base_resolution: f64,
    pub origin: Point,
    pub tile_size: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_resolution: 1000.0,
            origin: Point::new(-500_000.0, 500_000.0),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl GridConfig {
    #[must_use]
    pub fn to_tile_grid(&self) -> TileGrid {
        TileGrid::new(self.base_resolution, self.origin, self.tile_size)
    }
}

/// Everything a scenario needs to know about its environment
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Scratch directory; removed after a scenario
    pub work_dir: PathBuf,
    /// Seeding executable
    pub seeder: String,
    pub seed_timeout: Duration,
    /// Template file; the bundled template when `None`
    pub template_path: Option<PathBuf>,
    pub grid: GridConfig,
    /// Name of the grid in the cache configuration
    pub grid_name: String,
    pub raster_width: usize,
    pub raster_height: usize,
    pub zoom_levels: Vec<u32>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::var("TILECHECK_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORK_DIR)),
            seeder: std::env::var("TILECHECK_SEEDER").unwrap_or_else(|_| DEFAULT_SEEDER.to_string()),
            seed_timeout: Duration::from_secs(
                std::env::var("TILECHECK_SEED_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SEED_TIMEOUT_SECS),
            ),
            template_path: None,
            grid: GridConfig::default(),
            grid_name: "synthetic_grid".to_string(),
            raster_width: 512,
            raster_height: 512,
            zoom_levels: vec![0, 1],
        }
    }
}

impl OracleConfig {
    #[must_use]
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    #[must_use]
    pub fn with_seeder(mut self, seeder: &str) -> Self {
        self.seeder = seeder.to_string();
        self
    }

    #[must_use]
    pub fn with_seed_timeout(mut self, timeout: Duration) -> Self {
        self.seed_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    #[must_use]
    pub fn with_raster_size(mut self, width: usize, height: usize) -> Self {
        self.raster_width = width;
        self.raster_height = height;
        self
    }

    #[must_use]
    pub fn with_zoom_levels(mut self, zoom_levels: &[u32]) -> Self {
        self.zoom_levels = zoom_levels.to_vec();
        self
    }

    /// Directory the cache writes tiles under
    #[must_use]
    pub fn cache_base_dir(&self) -> PathBuf {
        self.work_dir.join("cache_data")
    }

    /// Rendered cache configuration file
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.work_dir.join("mapcache.xml")
    }

    /// Synthetic source raster
    #[must_use]
    pub fn raster_path(&self) -> PathBuf {
        self.work_dir.join("synthetic_test_data.tif")
    }

    /// Template text, read from `template_path` if set
    pub fn template(&self) -> OracleResult<String> {
        match &self.template_path {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                OracleError::Config(format!("Cannot read template {}: {e}", path.display()))
            }),
            None => Ok(BUNDLED_TEMPLATE.to_string()),
        }
    }
}

/// Substitute the raster path and cache base directory into `template`.
///
/// Fails when either placeholder is missing: a configuration that does not
/// point at the synthetic raster cannot produce comparable tiles.
pub fn render_template(template: &str, raster_path: &Path, cache_base: &Path) -> OracleResult<String> {
    for token in [RASTER_PATH_PLACEHOLDER, CACHE_BASE_PLACEHOLDER] {
        if !template.contains(token) {
            return Err(OracleError::Config(format!("Template is missing placeholder {token}")));
        }
    }
    Ok(template
        .replace(RASTER_PATH_PLACEHOLDER, &raster_path.to_string_lossy())
        .replace(CACHE_BASE_PLACEHOLDER, &cache_base.to_string_lossy()))
}

/// Render the cache configuration for `config` and write it to
/// [`OracleConfig::config_path`]
pub fn write_config(config: &OracleConfig) -> OracleResult<PathBuf> {
    let rendered = render_template(&config.template()?, &config.raster_path(), &config.cache_base_dir())?;
    let path = config.config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, rendered)?;
    info!(path = %path.display(), "Created cache configuration");
    Ok(path)
}
