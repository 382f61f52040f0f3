use ndarray::{Array3, ArrayView1};

use crate::error::{OracleError, OracleResult};
use crate::geometry::{BoundingBox, GeoTransform};

/// Pixel access to an 8-bit multi-band raster
pub trait RasterSource {
    fn bands(&self) -> usize;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn sample(&self, band: usize, x: usize, y: usize) -> Option<u8>;
}

/// Georeferenced raster held in memory.
///
/// Pixels are stored row-major and band-interleaved with shape
/// `(height, width, bands)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRaster {
    data: Array3<u8>,
    geo_transform: GeoTransform,
    epsg: u16,
}

impl GeoRaster {
    pub fn new(data: Array3<u8>, geo_transform: GeoTransform, epsg: u16) -> OracleResult<Self> {
        let (height, width, bands) = data.dim();
        if height == 0 || width == 0 || bands == 0 {
            return Err(OracleError::InvalidRaster(format!(
                "Raster has zero dimensions: {width}x{height}x{bands}"
            )));
        }
        Ok(Self { data, geo_transform, epsg })
    }

    #[must_use]
    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    #[must_use]
    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    /// EPSG code of the raster's spatial reference
    #[must_use]
    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    #[must_use]
    pub fn extent(&self) -> BoundingBox {
        self.geo_transform.extent(self.width(), self.height())
    }

    /// All band values of pixel (`col`, `row`), or `None` outside the raster
    #[must_use]
    pub fn pixel(&self, col: usize, row: usize) -> Option<ArrayView1<'_, u8>> {
        if col >= self.width() || row >= self.height() {
            return None;
        }
        Some(self.data.slice(ndarray::s![row, col, ..]))
    }

    /// Nearest pixel containing world point (`x`, `y`).
    ///
    /// Fractional pixel indices are floored, so a point on a shared pixel edge
    /// belongs to the pixel to its right and below. Non-finite coordinates
    /// lie outside every raster.
    #[must_use]
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.geo_transform.world_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        let (col, row) = (col.floor(), row.floor());
        if col < 0.0 || row < 0.0 || col >= self.width() as f64 || row >= self.height() as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }
}

impl RasterSource for GeoRaster {
    fn bands(&self) -> usize {
        self.data.dim().2
    }

    fn width(&self) -> usize {
        self.data.dim().1
    }

    fn height(&self) -> usize {
        self.data.dim().0
    }

    fn sample(&self, band: usize, x: usize, y: usize) -> Option<u8> {
        self.data.get((y, x, band)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_raster() -> GeoRaster {
        // 2x3 raster, 10 units per pixel, origin (100, 50)
        let data = Array3::from_shape_fn((2, 3, 3), |(r, c, b)| (r * 100 + c * 10 + b) as u8);
        let gt = GeoTransform::from_coefficients([100.0, 10.0, 0.0, 50.0, 0.0, -10.0]).unwrap();
        GeoRaster::new(data, gt, 3857).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let raster = tiny_raster();
        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.bands(), 3);
        assert_eq!(raster.extent(), BoundingBox::new(100.0, 30.0, 130.0, 50.0));
    }

    #[test]
    fn test_sample_bounds() {
        let raster = tiny_raster();
        assert_eq!(raster.sample(2, 1, 1), Some(112));
        assert_eq!(raster.sample(3, 0, 0), None);
        assert_eq!(raster.sample(0, 3, 0), None);
        assert_eq!(raster.sample(0, 0, 2), None);
    }

    #[test]
    fn test_pixel_at_floors() {
        let raster = tiny_raster();
        assert_eq!(raster.pixel_at(100.0, 50.0), Some((0, 0)));
        assert_eq!(raster.pixel_at(109.99, 40.01), Some((0, 0)));
        // Shared edge goes to the right/lower pixel
        assert_eq!(raster.pixel_at(110.0, 40.0), Some((1, 1)));
        assert_eq!(raster.pixel_at(129.9, 30.1), Some((2, 1)));
    }

    #[test]
    fn test_pixel_at_outside() {
        let raster = tiny_raster();
        assert_eq!(raster.pixel_at(99.9, 45.0), None);
        assert_eq!(raster.pixel_at(130.0, 45.0), None);
        assert_eq!(raster.pixel_at(105.0, 50.1), None);
        assert_eq!(raster.pixel_at(105.0, 30.0), None);
    }

    #[test]
    fn test_pixel_at_non_finite() {
        let raster = tiny_raster();
        // NaN would otherwise saturate to index 0
        assert_eq!(raster.pixel_at(f64::NAN, 45.0), None);
        assert_eq!(raster.pixel_at(105.0, f64::NAN), None);
        assert_eq!(raster.pixel_at(f64::INFINITY, 45.0), None);
        assert_eq!(raster.pixel_at(105.0, f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_pixel_view() {
        let raster = tiny_raster();
        let px = raster.pixel(2, 1).unwrap();
        assert_eq!(px.to_vec(), vec![120, 121, 122]);
        assert!(raster.pixel(3, 0).is_none());
    }

    #[test]
    fn test_rejects_empty() {
        let gt = GeoTransform::from_coefficients([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]).unwrap();
        assert!(GeoRaster::new(Array3::zeros((0, 4, 3)), gt, 3857).is_err());
    }
}
