//! Path-addressed tile store.
//!
//! The default "tilecache" layout splits column and row into three-digit
//! groups, most significant first:
//!
//! ```text
//! <base>/<backend>/<tileset>/<grid>/<zz>/<x/1e6>/<x/1e3%1e3>/<x%1e3>/<y/1e6>/<y/1e3%1e3>/<y%1e3>.<ext>
//! ```
//!
//! which addresses columns and rows up to 999,999,999.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::backend::{BackendKind, TileBackend, decode_tile};
use crate::error::OracleResult;
use crate::tile_grid::TileAddress;
use crate::tile_image::TileImage;

/// Directory layouts a disk cache can use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiskLayout {
    /// `zz/xxx/xxx/xxx/yyy/yyy/yyy.ext`
    #[default]
    TileCache,
    /// `Lzz/Ryyyyyyyy/Cxxxxxxxx.ext`, hexadecimal row and column
    ArcGis,
    /// `z/yyyy/yyyy_xxxx.ext`, without tileset or grid directories
    WorldWind,
}

/// Tiles stored as individual image files
#[derive(Debug, Clone)]
pub struct DiskTileStore {
    base: PathBuf,
    backend_name: String,
    tileset: String,
    grid: String,
    extension: String,
    layout: DiskLayout,
}

impl DiskTileStore {
    pub fn new(base: impl AsRef<Path>, backend_name: &str, tileset: &str, grid: &str) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            backend_name: backend_name.to_string(),
            tileset: tileset.to_string(),
            grid: grid.to_string(),
            extension: "png".to_string(),
            layout: DiskLayout::default(),
        }
    }

    /// Set the image file suffix (without the dot)
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: DiskLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Directory holding every tile of this tileset and grid
    #[must_use]
    pub fn tileset_dir(&self) -> PathBuf {
        self.base.join(&self.backend_name).join(&self.tileset).join(&self.grid)
    }

    /// File a cache writes tile `tile` to
    #[must_use]
    pub fn tile_path(&self, tile: TileAddress) -> PathBuf {
        let TileAddress { zoom, col: x, row: y } = tile;
        let ext = &self.extension;
        match self.layout {
            DiskLayout::TileCache => self
                .tileset_dir()
                .join(format!("{zoom:02}"))
                .join(format!("{:03}", x / 1_000_000))
                .join(format!("{:03}", (x / 1000) % 1000))
                .join(format!("{:03}", x % 1000))
                .join(format!("{:03}", y / 1_000_000))
                .join(format!("{:03}", (y / 1000) % 1000))
                .join(format!("{:03}.{ext}", y % 1000)),
            DiskLayout::ArcGis => self
                .tileset_dir()
                .join(format!("L{zoom:02}"))
                .join(format!("R{y:08x}"))
                .join(format!("C{x:08x}.{ext}")),
            DiskLayout::WorldWind => self
                .base
                .join(&self.backend_name)
                .join(format!("{zoom}"))
                .join(format!("{y:04}"))
                .join(format!("{y:04}_{x:04}.{ext}")),
        }
    }
}

impl TileBackend for DiskTileStore {
    fn read_tile(&self, tile: TileAddress) -> OracleResult<Option<TileImage>> {
        let path = self.tile_path(tile);
        debug!(path = %path.display(), "Reading tile");

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(path = %path.display(), "Actual tile not found");
                return Ok(None);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not read actual tile");
                return Ok(None);
            }
        };

        decode_tile(&bytes, &path.to_string_lossy())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Disk
    }

    fn identifier(&self) -> String {
        self.tileset_dir().display().to_string()
    }
}
