//! Exact tile comparison.
//!
//! Two tiles match only when their shapes agree and every band value is
//! identical. On a mismatch the signed difference `expected - actual` is kept
//! and the first few differing entries are logged.

use ndarray::{Array3, Zip};
use tracing::{error, info};

use crate::tile_image::TileImage;

/// Differing entries logged (and kept in [`ComparisonResult::mismatches`])
pub const PREVIEW_LIMIT: usize = 10;

/// One differing band value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMismatch {
    pub col: usize,
    pub row: usize,
    pub band: usize,
    pub expected: u8,
    pub actual: u8,
}

impl PixelMismatch {
    /// `expected - actual`
    #[must_use]
    pub fn delta(&self) -> i16 {
        i16::from(self.expected) - i16::from(self.actual)
    }
}

/// Outcome of comparing an expected tile with a cached one
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub matched: bool,
    /// First differing entries in row, column, band order
    pub mismatches: Vec<PixelMismatch>,
    /// Total number of differing band values
    pub mismatch_count: usize,
    /// Signed difference, present only when both tiles had the same shape
    pub diff: Option<Array3<i16>>,
}

impl ComparisonResult {
    fn success() -> Self {
        Self { matched: true, mismatches: Vec::new(), mismatch_count: 0, diff: None }
    }

    fn failure() -> Self {
        Self { matched: false, mismatches: Vec::new(), mismatch_count: 0, diff: None }
    }
}

/// Compare `expected` against the tile read from a cache.
///
/// An absent actual tile is a failed comparison, not an error.
#[must_use]
pub fn compare(expected: &TileImage, actual: Option<&TileImage>) -> ComparisonResult {
    let Some(actual) = actual else {
        error!("FAILURE: Actual tile data could not be retrieved");
        return ComparisonResult::failure();
    };

    let (expected, actual) = (expected.data(), actual.data());
    if expected.dim() != actual.dim() {
        error!(
            expected = ?expected.dim(),
            actual = ?actual.dim(),
            "FAILURE: Tile shapes differ"
        );
        return ComparisonResult::failure();
    }

    if expected == actual {
        info!("SUCCESS: Actual tile matches expected tile");
        return ComparisonResult::success();
    }

    let diff = Zip::from(expected)
        .and(actual)
        .map_collect(|&e, &a| i16::from(e) - i16::from(a));

    let mut mismatches = Vec::new();
    let mut mismatch_count = 0;
    for ((row, col, band), &d) in diff.indexed_iter() {
        if d == 0 {
            continue;
        }
        mismatch_count += 1;
        if mismatches.len() < PREVIEW_LIMIT {
            mismatches.push(PixelMismatch {
                col,
                row,
                band,
                expected: expected[[row, col, band]],
                actual: actual[[row, col, band]],
            });
        }
    }

    error!(mismatch_count, "FAILURE: Actual tile does not match expected tile");
    for m in &mismatches {
        error!(
            row = m.row,
            col = m.col,
            band = m.band,
            expected = m.expected,
            actual = m.actual,
            delta = m.delta(),
            "Pixel mismatch"
        );
    }

    ComparisonResult { matched: false, mismatches, mismatch_count, diff: Some(diff) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(size: usize) -> TileImage {
        let mut tile = TileImage::zeros(size);
        for row in 0..size {
            for col in 0..size {
                tile.set_pixel(col, row, [col as u8, row as u8, (col + row) as u8]);
            }
        }
        tile
    }

    #[test]
    fn test_identical_tiles_match() {
        let tile = gradient(16);
        let result = compare(&tile, Some(&tile));
        assert!(result.matched);
        assert_eq!(result.mismatch_count, 0);
        assert!(result.diff.is_none());
    }

    #[test]
    fn test_single_value_flip_is_reported() {
        let expected = gradient(16);
        let mut actual = expected.clone();
        actual.set_pixel(5, 9, [5, 10, 14]);

        let result = compare(&expected, Some(&actual));
        assert!(!result.matched);
        assert_eq!(result.mismatch_count, 1);
        assert_eq!(
            result.mismatches,
            vec![PixelMismatch { col: 5, row: 9, band: 1, expected: 9, actual: 10 }]
        );
        assert_eq!(result.mismatches[0].delta(), -1);

        let diff = result.diff.unwrap();
        assert_eq!(diff[[9, 5, 1]], -1);
        assert_eq!(diff.iter().filter(|&&d| d != 0).count(), 1);
    }

    #[test]
    fn test_preview_is_capped() {
        let expected = TileImage::zeros(8);
        let mut actual = TileImage::zeros(8);
        for col in 0..8 {
            actual.set_pixel(col, 0, [255, 255, 255]);
        }

        let result = compare(&expected, Some(&actual));
        assert_eq!(result.mismatch_count, 24);
        assert_eq!(result.mismatches.len(), PREVIEW_LIMIT);
        // Row-major, band fastest
        assert_eq!((result.mismatches[0].col, result.mismatches[0].band), (0, 0));
        assert_eq!((result.mismatches[4].col, result.mismatches[4].band), (1, 1));
        assert_eq!(result.mismatches[0].delta(), -255);
    }

    #[test]
    fn test_absent_actual_fails() {
        let result = compare(&gradient(4), None);
        assert!(!result.matched);
        assert!(result.mismatches.is_empty());
        assert!(result.diff.is_none());
    }

    #[test]
    fn test_shape_mismatch_fails() {
        let result = compare(&gradient(4), Some(&gradient(8)));
        assert!(!result.matched);
        assert!(result.diff.is_none());
    }
}
