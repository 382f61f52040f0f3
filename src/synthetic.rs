//! Synthetic GeoTIFF generation with self-describing pixels.
//!
//! Every pixel encodes its own position:
//!
//! | band | value                   |
//! |------|-------------------------|
//! | 0    | `row % 256`             |
//! | 1    | `col % 256`             |
//! | 2    | `(row + col) % 256`     |
//!
//! A shifted, transposed, flipped or band-swapped tile is therefore visible by
//! inspection, and the expected value of any source pixel is known without
//! reading the file.
//!
//! # Example
//!
//! ```rust,no_run
//! use tilecheck::SyntheticRaster;
//!
//! SyntheticRaster::new(512, 512).write("/tmp/synthetic_test_data.tif")?;
//! # Ok::<(), tilecheck::OracleError>(())
//! ```

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use ndarray::Array3;
use tiff::encoder::colortype::RGB8;
use tiff::encoder::{Compression, DeflateLevel, TiffEncoder};
use tiff::tags::Tag;
use tracing::info;

use crate::error::{OracleError, OracleResult};
use crate::geometry::{BoundingBox, GeoTransform, Point};
use crate::raster::GeoRaster;

/// Side length of the default synthetic extent, in map units
pub const DEFAULT_EXTENT_SIZE: f64 = 1_000_000.0;

/// EPSG code written when none is configured (Web Mercator)
pub const DEFAULT_EPSG: u16 = 3857;

/// Number of bands in every synthetic raster
pub const SYNTHETIC_BANDS: usize = 3;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

// GeoKey values
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Band values of synthetic pixel (`row`, `col`)
#[inline]
#[must_use]
pub fn encode_pixel(row: usize, col: usize) -> [u8; 3] {
    [(row % 256) as u8, (col % 256) as u8, ((row + col) % 256) as u8]
}

/// Compression for the synthetic GeoTIFF
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyntheticCompression {
    #[default]
    None,
    Lzw,
    Deflate,
}

/// Parameters of a synthetic source raster
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRaster {
    width: usize,
    height: usize,
    extent: BoundingBox,
    epsg: u16,
    compression: SyntheticCompression,
}

impl SyntheticRaster {
    /// Raster of `width` x `height` pixels over the default extent: a
    /// 1,000,000 unit square centered on (0, 0) in EPSG:3857.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            extent: BoundingBox::centered(Point::origin(), DEFAULT_EXTENT_SIZE),
            epsg: DEFAULT_EPSG,
            compression: SyntheticCompression::default(),
        }
    }

    #[must_use]
    pub fn extent(mut self, extent: BoundingBox) -> Self {
        self.extent = extent;
        self
    }

    #[must_use]
    pub fn epsg(mut self, epsg: u16) -> Self {
        self.epsg = epsg;
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: SyntheticCompression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.extent
    }

    pub fn geo_transform(&self) -> OracleResult<GeoTransform> {
        GeoTransform::north_up(&self.extent, self.width, self.height)
    }

    /// Interleaved pixel buffer, row-major
    #[must_use]
    pub fn pixels(&self) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(self.width * self.height * SYNTHETIC_BANDS);
        for row in 0..self.height {
            for col in 0..self.width {
                pixels.extend_from_slice(&encode_pixel(row, col));
            }
        }
        pixels
    }

    /// Build the raster in memory without writing a file
    pub fn to_raster(&self) -> OracleResult<GeoRaster> {
        let geo_transform = self.geo_transform()?;
        let data = Array3::from_shape_vec((self.height, self.width, SYNTHETIC_BANDS), self.pixels())?;
        GeoRaster::new(data, geo_transform, self.epsg)
    }

    /// Write the raster as a GeoTIFF file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> OracleResult<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(
            path = %path.display(),
            width = self.width,
            height = self.height,
            "Created synthetic GeoTIFF"
        );
        Ok(())
    }

    /// Write the GeoTIFF to any seekable writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> OracleResult<()> {
        let geo_transform = self.geo_transform()?;
        let width = u32::try_from(self.width)
            .map_err(|_| OracleError::InvalidRaster(format!("Width {} too large", self.width)))?;
        let height = u32::try_from(self.height)
            .map_err(|_| OracleError::InvalidRaster(format!("Height {} too large", self.height)))?;

        let compression = match self.compression {
            SyntheticCompression::None => Compression::Uncompressed,
            SyntheticCompression::Lzw => Compression::Lzw,
            SyntheticCompression::Deflate => Compression::Deflate(DeflateLevel::Fast),
        };

        let mut encoder = TiffEncoder::new(writer)
            .map_err(encode_error)?
            .with_compression(compression);
        let mut image = encoder.new_image::<RGB8>(width, height).map_err(encode_error)?;

        let dir = image.encoder();
        dir.write_tag(Tag::ModelPixelScaleTag, geo_transform.pixel_scale_tag().as_slice())
            .map_err(encode_error)?;
        dir.write_tag(Tag::ModelTiepointTag, geo_transform.tiepoint_tag().as_slice())
            .map_err(encode_error)?;
        dir.write_tag(Tag::GeoKeyDirectoryTag, geokey_directory(self.epsg).as_slice())
            .map_err(encode_error)?;

        image.write_data(&self.pixels()).map_err(encode_error)?;
        Ok(())
    }
}

/// Generate the synthetic GeoTIFF with default extent and CRS
pub fn generate_synthetic_geotiff<P: AsRef<Path>>(
    path: P,
    width: usize,
    height: usize,
) -> OracleResult<GeoRaster> {
    let spec = SyntheticRaster::new(width, height);
    spec.write(path)?;
    spec.to_raster()
}

fn encode_error(e: tiff::TiffError) -> OracleError {
    OracleError::TiffEncode(e.to_string())
}

/// Geographic CRS codes live in the 4000-4999 range
fn is_geographic_epsg(epsg: u16) -> bool {
    (4000..5000).contains(&epsg)
}

fn geokey_directory(epsg: u16) -> Vec<u16> {
    // [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys, keys...]
    let geographic = is_geographic_epsg(epsg);
    let model_type = if geographic { MODEL_TYPE_GEOGRAPHIC } else { MODEL_TYPE_PROJECTED };
    let crs_key = if geographic { GEOGRAPHIC_TYPE_GEO_KEY } else { PROJECTED_CS_TYPE_GEO_KEY };

    vec![
        1, 1, 0, 3,
        GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
        crs_key, 0, 1, epsg,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterSource;

    #[test]
    fn test_encode_pixel() {
        assert_eq!(encode_pixel(0, 0), [0, 0, 0]);
        assert_eq!(encode_pixel(3, 7), [3, 7, 10]);
        assert_eq!(encode_pixel(300, 10), [44, 10, 54]);
        assert_eq!(encode_pixel(255, 255), [255, 255, 254]);
        assert_eq!(encode_pixel(511, 511), [255, 255, 254]);
    }

    #[test]
    fn test_default_extent() {
        let spec = SyntheticRaster::new(512, 512);
        assert_eq!(
            spec.bounds(),
            BoundingBox::new(-500_000.0, -500_000.0, 500_000.0, 500_000.0)
        );
        let gt = spec.geo_transform().unwrap();
        assert_eq!(gt.pixel_width(), 1953.125);
        assert_eq!(gt.pixel_height(), -1953.125);
    }

    #[test]
    fn test_in_memory_raster_matches_encoding() {
        let raster = SyntheticRaster::new(300, 270).to_raster().unwrap();
        assert_eq!(raster.width(), 300);
        assert_eq!(raster.height(), 270);
        for &(row, col) in &[(0, 0), (1, 2), (269, 299), (256, 44), (100, 255)] {
            let expected = encode_pixel(row, col);
            for band in 0..3 {
                assert_eq!(raster.sample(band, col, row), Some(expected[band]));
            }
        }
    }

    #[test]
    fn test_non_square_transform() {
        let spec = SyntheticRaster::new(200, 100)
            .extent(BoundingBox::new(0.0, 0.0, 2000.0, 500.0));
        let gt = spec.geo_transform().unwrap();
        assert_eq!(gt.pixel_width(), 10.0);
        assert_eq!(gt.pixel_height(), -5.0);
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut buf = std::io::Cursor::new(Vec::new());
        let result = SyntheticRaster::new(0, 10).write_to(&mut buf);
        assert!(matches!(result, Err(OracleError::InvalidRaster(_))));
    }

    #[test]
    fn test_geokeys_projected() {
        let keys = geokey_directory(3857);
        assert_eq!(keys[3], 3);
        assert_eq!(&keys[4..8], &[GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
        assert_eq!(&keys[12..16], &[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, 3857]);
    }

    #[test]
    fn test_geokeys_geographic() {
        let keys = geokey_directory(4326);
        assert_eq!(keys[7], MODEL_TYPE_GEOGRAPHIC);
        assert_eq!(keys[12], GEOGRAPHIC_TYPE_GEO_KEY);
    }

    #[test]
    fn test_write_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("synthetic.tif");
        let result = SyntheticRaster::new(8, 8).write(&path);
        assert!(matches!(result, Err(OracleError::Io(_))));
    }
}
