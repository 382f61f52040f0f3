//! Error type shared by every oracle stage.
//!
//! Retrieval misses (missing tile file, missing store row, undecodable bytes)
//! are not errors: backends report them as `Ok(None)` and the comparator treats
//! them as a failed comparison. Everything here aborts the scenario.

use std::process::ExitStatus;
use std::time::Duration;

/// Result alias used throughout the crate
pub type OracleResult<T> = Result<T, OracleError>;

/// Error type for oracle operations
#[derive(Debug)]
pub enum OracleError {
    /// I/O error during file or process operations
    Io(std::io::Error),
    /// TIFF encoding error while writing the synthetic raster
    TiffEncode(String),
    /// TIFF decoding error while reading a source raster back
    TiffDecode(String),
    /// Raster data or georeferencing that the oracle cannot use
    InvalidRaster(String),
    /// A cached tile decoded to a band layout other than RGB or RGBA
    UnexpectedBandCount(usize),
    /// Keyed tile store failure (connection or query)
    Store(String),
    /// The seeding tool exited unsuccessfully
    SeederFailed {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    /// The seeding tool did not finish within its time budget
    SeederTimeout(Duration),
    /// Invalid configuration or template
    Config(String),
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::TiffEncode(e) => write!(f, "TIFF encoding error: {e}"),
            Self::TiffDecode(e) => write!(f, "TIFF decoding error: {e}"),
            Self::InvalidRaster(e) => write!(f, "Invalid raster: {e}"),
            Self::UnexpectedBandCount(n) => {
                write!(f, "Unexpected number of bands in actual tile: {n}")
            }
            Self::Store(e) => write!(f, "Tile store error: {e}"),
            Self::SeederFailed { status, stderr, .. } => {
                write!(f, "Seeder failed with {status}: {}", stderr.trim())
            }
            Self::SeederTimeout(limit) => {
                write!(f, "Seeder did not finish within {}s", limit.as_secs())
            }
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for OracleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OracleError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<tiff::TiffError> for OracleError {
    fn from(e: tiff::TiffError) -> Self {
        Self::TiffDecode(e.to_string())
    }
}

impl From<rusqlite::Error> for OracleError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<ndarray::ShapeError> for OracleError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::InvalidRaster(e.to_string())
    }
}
