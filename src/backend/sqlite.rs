//! Keyed blob store backed by SQLite.
//!
//! Tiles are rows of `tiles(tileset, grid, x, y, z, data, ...)` where `data`
//! holds the encoded image. The database is opened read-only for each lookup
//! and the connection is closed on every exit path when it goes out of scope.
//!
//! [`SqliteTileStore::read_blob`] reports store failures as errors;
//! [`TileBackend::read_tile`] logs them and treats the tile as missing.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, error, warn};

use crate::backend::{BackendKind, TileBackend, decode_tile};
use crate::error::{OracleError, OracleResult};
use crate::tile_grid::TileAddress;
use crate::tile_image::TileImage;

/// Database file name used by the bundled cache configuration
pub const DEFAULT_DB_FILE: &str = "cache.sqlite";

/// Tiles stored as blobs keyed by (tileset, grid, x, y, z)
#[derive(Debug, Clone)]
pub struct SqliteTileStore {
    db_path: PathBuf,
    tileset: String,
    grid: String,
    table: String,
}

impl SqliteTileStore {
    pub fn new(db_path: impl AsRef<Path>, tileset: &str, grid: &str) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            tileset: tileset.to_string(),
            grid: grid.to_string(),
            table: "tiles".to_string(),
        }
    }

    /// Use a table other than `tiles`.
    ///
    /// The name must be a plain SQL identifier; it cannot be bound as a
    /// parameter.
    pub fn with_table(mut self, table: &str) -> OracleResult<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(OracleError::Config(format!("Invalid table name: {table:?}")));
        }
        self.table = table.to_string();
        Ok(self)
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn query(&self) -> String {
        format!(
            "SELECT data FROM {} WHERE tileset = ?1 AND grid = ?2 AND x = ?3 AND y = ?4 AND z = ?5",
            self.table
        )
    }

    /// Raw encoded bytes of `tile`, or `None` when no row matches or the
    /// payload is NULL
    pub fn read_blob(&self, tile: TileAddress) -> OracleResult<Option<Vec<u8>>> {
        if !self.db_path.exists() {
            error!(path = %self.db_path.display(), "Database file not found");
            return Ok(None);
        }

        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut stmt = conn.prepare(&self.query())?;
        let mut rows = stmt.query(params![self.tileset, self.grid, tile.col, tile.row, tile.zoom])?;

        let Some(row) = rows.next()? else {
            error!(tile = %tile, "Tile not found in database");
            return Ok(None);
        };
        let data: Option<Vec<u8>> = row.get(0)?;

        if rows.next()?.is_some() {
            warn!(tile = %tile, "Several rows match tile key, using the first");
        }
        if data.is_none() {
            error!(tile = %tile, "Tile row has no data");
        }
        Ok(data)
    }
}

impl TileBackend for SqliteTileStore {
    fn read_tile(&self, tile: TileAddress) -> OracleResult<Option<TileImage>> {
        debug!(db = %self.db_path.display(), tile = %tile, "Reading tile");
        match self.read_blob(tile) {
            Ok(Some(bytes)) => decode_tile(&bytes, &format!("{}#{tile}", self.db_path.display())),
            Ok(None) => Ok(None),
            Err(e) => {
                error!(
                    db = %self.db_path.display(),
                    tile = %tile,
                    error = %e,
                    "Could not read tile from database"
                );
                Ok(None)
            }
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn identifier(&self) -> String {
        format!("{}:{}/{}", self.db_path.display(), self.tileset, self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{gray_png, rgba_png};

    const SCHEMA: &str = "create table if not exists tiles(tileset text, grid text, \
        x integer, y integer, z integer, data blob, dim text, ctime datetime, \
        primary key(tileset,grid,x,y,z,dim))";

    fn seeded_db(dir: &Path, rows: &[(&str, u32, u32, u32, Vec<u8>)]) -> PathBuf {
        let path = dir.join(DEFAULT_DB_FILE);
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        for (tileset, x, y, z, data) in rows {
            conn.execute(
                "insert into tiles(tileset,grid,x,y,z,data,dim,ctime) \
                 values (?1,'synthetic_grid',?2,?3,?4,?5,'',datetime('now'))",
                params![tileset, x, y, z, data],
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_read_matching_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(dir.path(), &[("sqlite-tileset", 1, 2, 1, rgba_png(8))]);
        let store = SqliteTileStore::new(&db, "sqlite-tileset", "synthetic_grid");

        let tile = store.read_tile(TileAddress::new(1, 1, 2)).unwrap().unwrap();
        assert_eq!(tile.height(), 8);
        assert_eq!(tile.get(6, 1, 2), Some(6 ^ 1));
    }

    #[test]
    fn test_key_components_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(dir.path(), &[("sqlite-tileset", 1, 2, 1, rgba_png(4))]);
        let store = SqliteTileStore::new(&db, "sqlite-tileset", "synthetic_grid");

        // Swapped x/y and other zoom do not match
        assert!(store.read_tile(TileAddress::new(1, 2, 1)).unwrap().is_none());
        assert!(store.read_tile(TileAddress::new(0, 1, 2)).unwrap().is_none());

        let other = SqliteTileStore::new(&db, "disk-tileset", "synthetic_grid");
        assert!(other.read_tile(TileAddress::new(1, 1, 2)).unwrap().is_none());
    }

    #[test]
    fn test_missing_database_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteTileStore::new(dir.path().join("absent.sqlite"), "t", "g");
        assert!(store.read_tile(TileAddress::new(0, 0, 0)).unwrap().is_none());
        // A read-only lookup must not create the file
        assert!(!store.db_path().exists());
    }

    #[test]
    fn test_undecodable_blob_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(dir.path(), &[("sqlite-tileset", 0, 0, 0, b"garbage".to_vec())]);
        let store = SqliteTileStore::new(&db, "sqlite-tileset", "synthetic_grid");
        assert_eq!(store.read_blob(TileAddress::new(0, 0, 0)).unwrap(), Some(b"garbage".to_vec()));
        assert!(store.read_tile(TileAddress::new(0, 0, 0)).unwrap().is_none());
    }

    #[test]
    fn test_single_band_blob_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(dir.path(), &[("sqlite-tileset", 0, 0, 0, gray_png(4))]);
        let store = SqliteTileStore::new(&db, "sqlite-tileset", "synthetic_grid");
        assert!(matches!(
            store.read_tile(TileAddress::new(0, 0, 0)),
            Err(OracleError::UnexpectedBandCount(1))
        ));
    }

    #[test]
    fn test_missing_table_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(dir.path(), &[]);
        let store = SqliteTileStore::new(&db, "t", "g").with_table("mbtiles").unwrap();
        let tile = TileAddress::new(0, 0, 0);
        assert!(matches!(store.read_blob(tile), Err(OracleError::Store(_))));
        assert!(store.read_tile(tile).unwrap().is_none());
    }

    #[test]
    fn test_file_that_is_not_a_database_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join(DEFAULT_DB_FILE);
        std::fs::write(&db, vec![0xAB; 4096]).unwrap();
        let store = SqliteTileStore::new(&db, "sqlite-tileset", "synthetic_grid");
        let tile = TileAddress::new(0, 0, 0);

        assert!(matches!(store.read_blob(tile), Err(OracleError::Store(_))));
        assert!(store.read_tile(tile).unwrap().is_none());
    }

    #[test]
    fn test_null_payload_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_db(dir.path(), &[]);
        Connection::open(&db)
            .unwrap()
            .execute(
                "insert into tiles(tileset,grid,x,y,z,data,dim) \
                 values ('sqlite-tileset','synthetic_grid',0,0,0,NULL,'')",
                [],
            )
            .unwrap();
        let store = SqliteTileStore::new(&db, "sqlite-tileset", "synthetic_grid");
        let tile = TileAddress::new(0, 0, 0);

        assert_eq!(store.read_blob(tile).unwrap(), None);
        assert!(store.read_tile(tile).unwrap().is_none());
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let store = SqliteTileStore::new("/tmp/x.sqlite", "t", "g");
        assert!(store.with_table("tiles; drop table tiles").is_err());
    }
}
