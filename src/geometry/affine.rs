//! Six-coefficient affine geo-transform.
//!
//! Coefficients follow the GDAL ordering:
//! `[origin_x, pixel_width, row_rotation, origin_y, column_rotation, pixel_height]`.
//! A north-up raster has `pixel_height < 0` and both rotations zero, which is
//! the only shape the oracle inverts.

use crate::error::{OracleError, OracleResult};
use crate::geometry::{BoundingBox, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    coefficients: [f64; 6],
}

impl GeoTransform {
    /// Build a transform from its six coefficients.
    ///
    /// Rejects rotated or degenerate transforms since the inverse is only
    /// defined here for axis-aligned rasters.
    pub fn from_coefficients(coefficients: [f64; 6]) -> OracleResult<Self> {
        let [_, pixel_width, row_rotation, _, column_rotation, pixel_height] = coefficients;
        if row_rotation != 0.0 || column_rotation != 0.0 {
            return Err(OracleError::InvalidRaster(
                "Rotated geo-transforms are not supported".to_string(),
            ));
        }
        if !pixel_width.is_finite()
            || pixel_width <= 0.0
            || !pixel_height.is_finite()
            || pixel_height == 0.0
        {
            return Err(OracleError::InvalidRaster(format!(
                "Degenerate pixel size: {pixel_width} x {pixel_height}"
            )));
        }
        Ok(Self { coefficients })
    }

    /// North-up transform covering `extent` with `width` x `height` pixels
    pub fn north_up(extent: &BoundingBox, width: usize, height: usize) -> OracleResult<Self> {
        if width == 0 || height == 0 {
            return Err(OracleError::InvalidRaster(
                "Raster has zero dimensions".to_string(),
            ));
        }
        let pixel_width = extent.width() / width as f64;
        let pixel_height = (extent.miny - extent.maxy) / height as f64;
        Self::from_coefficients([extent.minx, pixel_width, 0.0, extent.maxy, 0.0, pixel_height])
    }

    /// Rebuild from GeoTIFF `ModelPixelScale` and `ModelTiepoint` tags.
    ///
    /// The tiepoint maps raster (i, j) to world (x, y); GeoTIFF stores the Y
    /// scale as a positive number for north-up images.
    pub fn from_geotiff_tags(pixel_scale: [f64; 3], tiepoint: [f64; 6]) -> OracleResult<Self> {
        let origin_x = tiepoint[3] - tiepoint[0] * pixel_scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * pixel_scale[1];
        Self::from_coefficients([origin_x, pixel_scale[0], 0.0, origin_y, 0.0, -pixel_scale[1]])
    }

    #[must_use]
    pub fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.coefficients[0], self.coefficients[3])
    }

    #[must_use]
    pub fn pixel_width(&self) -> f64 {
        self.coefficients[1]
    }

    /// Signed pixel height (negative for north-up)
    #[must_use]
    pub fn pixel_height(&self) -> f64 {
        self.coefficients[5]
    }

    /// Pixel corner (column, row) to world coordinates
    #[must_use]
    pub fn pixel_to_world(&self, col: f64, row: f64) -> Point {
        let [ox, pw, rr, oy, cr, ph] = self.coefficients;
        Point::new(ox + col * pw + row * rr, oy + col * cr + row * ph)
    }

    /// World coordinates to fractional (column, row).
    ///
    /// Divides by the pixel size instead of multiplying by its reciprocal so
    /// that exact grid coordinates land on exact pixel edges.
    #[must_use]
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let [ox, pw, _, oy, _, ph] = self.coefficients;
        ((x - ox) / pw, (y - oy) / ph)
    }

    /// Extent of a `width` x `height` raster
    #[must_use]
    pub fn extent(&self, width: usize, height: usize) -> BoundingBox {
        let a = self.pixel_to_world(0.0, 0.0);
        let b = self.pixel_to_world(width as f64, height as f64);
        BoundingBox::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// GeoTIFF `ModelPixelScale` tag value
    #[must_use]
    pub fn pixel_scale_tag(&self) -> [f64; 3] {
        [self.pixel_width(), -self.pixel_height(), 0.0]
    }

    /// GeoTIFF `ModelTiepoint` tag value tying pixel (0, 0) to the origin
    #[must_use]
    pub fn tiepoint_tag(&self) -> [f64; 6] {
        let origin = self.origin();
        [0.0, 0.0, 0.0, origin.x, origin.y, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_512() -> GeoTransform {
        let extent = BoundingBox::new(-500_000.0, -500_000.0, 500_000.0, 500_000.0);
        GeoTransform::north_up(&extent, 512, 512).unwrap()
    }

    #[test]
    fn test_north_up_coefficients() {
        let gt = synthetic_512();
        assert_eq!(
            gt.coefficients(),
            [-500_000.0, 1953.125, 0.0, 500_000.0, 0.0, -1953.125]
        );
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let gt = synthetic_512();
        let p = gt.pixel_to_world(17.5, 300.25);
        let (col, row) = gt.world_to_pixel(p.x, p.y);
        assert!((col - 17.5).abs() < 1e-9);
        assert!((row - 300.25).abs() < 1e-9);
    }

    #[test]
    fn test_corners_map_to_extent() {
        let gt = synthetic_512();
        assert_eq!(gt.pixel_to_world(0.0, 0.0), Point::new(-500_000.0, 500_000.0));
        assert_eq!(gt.pixel_to_world(512.0, 512.0), Point::new(500_000.0, -500_000.0));
        assert_eq!(
            gt.extent(512, 512),
            BoundingBox::new(-500_000.0, -500_000.0, 500_000.0, 500_000.0)
        );
    }

    #[test]
    fn test_geotiff_tags_roundtrip() {
        let gt = synthetic_512();
        let rebuilt = GeoTransform::from_geotiff_tags(gt.pixel_scale_tag(), gt.tiepoint_tag()).unwrap();
        assert_eq!(rebuilt, gt);
    }

    #[test]
    fn test_tiepoint_not_at_origin_pixel() {
        // Tiepoint on pixel (10, 20) instead of the corner
        let gt = GeoTransform::from_geotiff_tags(
            [2.0, 2.0, 0.0],
            [10.0, 20.0, 0.0, 100.0, 200.0, 0.0],
        )
        .unwrap();
        assert_eq!(gt.origin(), Point::new(80.0, 240.0));
    }

    #[test]
    fn test_rejects_rotation() {
        let result = GeoTransform::from_coefficients([0.0, 1.0, 0.5, 0.0, 0.0, -1.0]);
        assert!(matches!(result, Err(OracleError::InvalidRaster(_))));
    }

    #[test]
    fn test_rejects_zero_pixel_size() {
        assert!(GeoTransform::from_coefficients([0.0, 0.0, 0.0, 0.0, 0.0, -1.0]).is_err());
        assert!(GeoTransform::from_coefficients([0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_rejects_non_finite_pixel_size() {
        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(GeoTransform::from_coefficients([0.0, bad, 0.0, 0.0, 0.0, -1.0]).is_err());
            assert!(GeoTransform::from_coefficients([0.0, 1.0, 0.0, 0.0, 0.0, bad]).is_err());
        }
    }
}
