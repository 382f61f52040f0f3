//! Normalized RGB tile images.

use std::path::Path;

use image::{DynamicImage, RgbImage};
use ndarray::{Array3, Axis, s};

use crate::error::{OracleError, OracleResult};

/// Bands kept for comparison
pub const TILE_BANDS: usize = 3;

/// An RGB tile with shape `(height, width, 3)`.
///
/// Alpha and any other encoding artifacts of the cache are stripped before a
/// value of this type exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileImage {
    data: Array3<u8>,
}

impl TileImage {
    /// Black square tile
    #[must_use]
    pub fn zeros(tile_size: usize) -> Self {
        Self { data: Array3::zeros((tile_size, tile_size, TILE_BANDS)) }
    }

    /// Wrap a `(height, width, bands)` array, dropping a 4th (alpha) band.
    ///
    /// Any band count other than 3 or 4 is an error: the cache produced an
    /// output shape the oracle does not know how to compare.
    pub fn from_array(data: Array3<u8>) -> OracleResult<Self> {
        match data.dim().2 {
            3 => Ok(Self { data }),
            4 => Ok(Self { data: data.slice(s![.., .., ..TILE_BANDS]).to_owned() }),
            n => Err(OracleError::UnexpectedBandCount(n)),
        }
    }

    /// Normalize a decoded image to RGB
    pub fn from_dynamic_image(image: DynamicImage) -> OracleResult<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let (bands, raw) = match image {
            DynamicImage::ImageRgb8(rgb) => (3, rgb.into_raw()),
            DynamicImage::ImageRgba8(rgba) => (4, rgba.into_raw()),
            other => {
                let channels = usize::from(other.color().channel_count());
                if channels == 3 || channels == 4 {
                    return Err(OracleError::InvalidRaster(format!(
                        "Expected 8-bit samples, got {:?}",
                        other.color()
                    )));
                }
                return Err(OracleError::UnexpectedBandCount(channels));
            }
        };
        Self::from_array(Array3::from_shape_vec((height, width, bands), raw)?)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    #[must_use]
    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    /// Value of `band` at pixel (`col`, `row`)
    #[must_use]
    pub fn get(&self, col: usize, row: usize, band: usize) -> Option<u8> {
        self.data.get((row, col, band)).copied()
    }

    /// Overwrite all bands of pixel (`col`, `row`)
    pub fn set_pixel(&mut self, col: usize, row: usize, value: [u8; TILE_BANDS]) {
        for (band, v) in value.into_iter().enumerate() {
            self.data[[row, col, band]] = v;
        }
    }

    /// Number of pixels whose bands are all zero
    #[must_use]
    pub fn count_black(&self) -> usize {
        self.data
            .lanes(Axis(2))
            .into_iter()
            .filter(|px| px.iter().all(|&v| v == 0))
            .count()
    }

    #[must_use]
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let raw = self.data.iter().copied().collect();
        RgbImage::from_raw(self.width() as u32, self.height() as u32, raw)
    }

    /// Save as PNG (or any format implied by the extension)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> OracleResult<()> {
        let image = self
            .to_rgb_image()
            .ok_or_else(|| OracleError::InvalidRaster("Tile buffer size mismatch".to_string()))?;
        image
            .save(path)
            .map_err(|e| OracleError::InvalidRaster(format!("Could not encode tile: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Rgb, Rgba, RgbaImage};

    #[test]
    fn test_rgba_drops_alpha() {
        let rgba: RgbaImage = ImageBuffer::from_fn(4, 2, |x, y| Rgba([x as u8, y as u8, 7, 255]));
        let tile = TileImage::from_dynamic_image(DynamicImage::ImageRgba8(rgba)).unwrap();
        assert_eq!((tile.width(), tile.height()), (4, 2));
        assert_eq!(tile.data().dim().2, 3);
        assert_eq!(tile.get(3, 1, 0), Some(3));
        assert_eq!(tile.get(3, 1, 1), Some(1));
        assert_eq!(tile.get(3, 1, 2), Some(7));
        assert_eq!(tile.get(3, 1, 3), None);
    }

    #[test]
    fn test_rgb_passes_through() {
        let rgb: RgbImage = ImageBuffer::from_fn(3, 3, |x, y| Rgb([x as u8, y as u8, 9]));
        let tile = TileImage::from_dynamic_image(DynamicImage::ImageRgb8(rgb.clone())).unwrap();
        assert_eq!(tile.to_rgb_image().unwrap(), rgb);
    }

    #[test]
    fn test_grayscale_is_hard_error() {
        let gray = GrayImage::new(2, 2);
        let result = TileImage::from_dynamic_image(DynamicImage::ImageLuma8(gray));
        assert!(matches!(result, Err(OracleError::UnexpectedBandCount(1))));
    }

    #[test]
    fn test_from_array_band_counts() {
        assert!(TileImage::from_array(Array3::zeros((2, 2, 3))).is_ok());
        assert_eq!(
            TileImage::from_array(Array3::zeros((2, 2, 4))).unwrap(),
            TileImage::zeros(2)
        );
        assert!(matches!(
            TileImage::from_array(Array3::zeros((2, 2, 2))),
            Err(OracleError::UnexpectedBandCount(2))
        ));
        assert!(matches!(
            TileImage::from_array(Array3::zeros((2, 2, 5))),
            Err(OracleError::UnexpectedBandCount(5))
        ));
    }

    #[test]
    fn test_set_pixel_and_count_black() {
        let mut tile = TileImage::zeros(4);
        assert_eq!(tile.count_black(), 16);
        tile.set_pixel(1, 2, [0, 0, 1]);
        assert_eq!(tile.get(1, 2, 2), Some(1));
        assert_eq!(tile.count_black(), 15);
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let mut tile = TileImage::zeros(8);
        tile.set_pixel(7, 0, [1, 2, 3]);
        tile.save(&path).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(TileImage::from_dynamic_image(decoded).unwrap(), tile);
    }
}
