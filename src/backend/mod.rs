//! Readers for tiles stored by the cache under test.
//!
//! Each storage backend implements [`TileBackend`]. A lookup either yields a
//! normalized RGB [`TileImage`] or `Ok(None)` when the tile is absent, cannot
//! be read from the store, or its bytes do not decode. The only error is a
//! cached image with an unexpected band layout.

pub mod disk;
pub mod sqlite;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use crate::error::{OracleError, OracleResult};
use crate::tile_grid::TileAddress;
use crate::tile_image::TileImage;

pub use disk::{DiskLayout, DiskTileStore};
pub use sqlite::SqliteTileStore;

/// Tile lookup against one storage backend
pub trait TileBackend {
    /// Fetch and decode the cached tile at `tile`
    fn read_tile(&self, tile: TileAddress) -> OracleResult<Option<TileImage>>;

    /// Which kind of store this is
    fn kind(&self) -> BackendKind;

    /// Human-readable location of the store (for logging/errors)
    fn identifier(&self) -> String;
}

/// Storage backend variants the oracle can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Path-addressed files under a base directory
    Disk,
    /// Keyed blob rows in a SQLite database
    Sqlite,
}

impl BackendKind {
    /// Name used in the cache configuration and on disk
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Sqlite => "sqlite",
        }
    }

    /// Tileset seeded into this backend by the bundled configuration
    #[must_use]
    pub fn default_tileset(&self) -> String {
        format!("{}-tileset", self.name())
    }

    #[must_use]
    pub fn all() -> [BackendKind; 2] {
        [Self::Disk, Self::Sqlite]
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disk" => Ok(Self::Disk),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(OracleError::Config(format!("Unknown backend: {other}"))),
        }
    }
}

/// Open the store a bundled-configuration cache writes for `kind`.
///
/// Disk tiles live under `<cache_base>/disk`, SQLite tiles in
/// `<cache_base>/cache.sqlite`.
pub fn open_backend(
    kind: BackendKind,
    cache_base: &Path,
    tileset: &str,
    grid: &str,
) -> Box<dyn TileBackend> {
    match kind {
        BackendKind::Disk => Box::new(DiskTileStore::new(cache_base, kind.name(), tileset, grid)),
        BackendKind::Sqlite => Box::new(SqliteTileStore::new(
            cache_base.join(sqlite::DEFAULT_DB_FILE),
            tileset,
            grid,
        )),
    }
}

/// Decode encoded tile bytes and normalize to RGB.
///
/// Undecodable bytes are a miss, not an error.
pub(crate) fn decode_tile(bytes: &[u8], origin: &str) -> OracleResult<Option<TileImage>> {
    match image::load_from_memory(bytes) {
        Ok(image) => TileImage::from_dynamic_image(image).map(Some),
        Err(e) => {
            warn!(origin, error = %e, "Could not decode tile image");
            Ok(None)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_names() {
        assert_eq!(BackendKind::Disk.to_string(), "disk");
        assert_eq!(BackendKind::Sqlite.default_tileset(), "sqlite-tileset");
        assert_eq!("SQLite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert!("redis".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_decode_tile_rgba() {
        let tile = decode_tile(&test_support::rgba_png(16), "memory").unwrap().unwrap();
        assert_eq!(tile.width(), 16);
        assert_eq!(tile.get(5, 9, 2), Some(5 ^ 9));
    }

    #[test]
    fn test_decode_tile_garbage_is_miss() {
        assert!(decode_tile(b"not an image", "memory").unwrap().is_none());
    }

    #[test]
    fn test_decode_tile_gray_is_error() {
        let result = decode_tile(&test_support::gray_png(4), "memory");
        assert!(matches!(result, Err(OracleError::UnexpectedBandCount(1))));
    }

    #[test]
    fn test_open_backend_kinds() {
        let base = Path::new("/tmp/cache_data");
        let disk = open_backend(BackendKind::Disk, base, "disk-tileset", "synthetic_grid");
        assert_eq!(disk.kind(), BackendKind::Disk);
        assert!(disk.identifier().starts_with("/tmp/cache_data/disk/disk-tileset/synthetic_grid"));

        let sqlite = open_backend(BackendKind::Sqlite, base, "sqlite-tileset", "synthetic_grid");
        assert_eq!(sqlite.kind(), BackendKind::Sqlite);
        assert!(sqlite.identifier().contains("cache.sqlite"));
    }
}
