//! Read a GeoTIFF source raster back into memory.
//!
//! The oracle samples the same file the system under test was configured with,
//! so that any drift between the generated metadata and the pixel encoding is
//! caught instead of assumed away. The file handle is released before
//! returning.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{OracleError, OracleResult};
use crate::geometry::GeoTransform;
use crate::raster::GeoRaster;
use crate::synthetic::DEFAULT_EPSG;

const GEO_KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const GEO_KEY_PROJECTED_CRS: u16 = 3072;

/// Open an 8-bit RGB GeoTIFF with pixel-scale/tiepoint georeferencing
pub fn open_geotiff<P: AsRef<Path>>(path: P) -> OracleResult<GeoRaster> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let bands = match decoder.colortype()? {
        tiff::ColorType::RGB(8) => 3,
        tiff::ColorType::RGBA(8) => 4,
        other => {
            return Err(OracleError::InvalidRaster(format!(
                "Unsupported color type {other:?} (expected 8-bit RGB)"
            )));
        }
    };

    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .ok()
        .and_then(|v| if v.len() >= 3 { Some([v[0], v[1], v[2]]) } else { None })
        .ok_or_else(|| OracleError::InvalidRaster("Missing ModelPixelScale tag".to_string()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .ok()
        .and_then(|v| if v.len() >= 6 { Some([v[0], v[1], v[2], v[3], v[4], v[5]]) } else { None })
        .ok_or_else(|| OracleError::InvalidRaster("Missing ModelTiepoint tag".to_string()))?;

    let epsg = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .ok()
        .and_then(|keys| epsg_from_geokeys(&keys))
        .unwrap_or(DEFAULT_EPSG);

    let pixels = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf,
        _ => {
            return Err(OracleError::InvalidRaster(
                "Expected 8-bit unsigned samples".to_string(),
            ));
        }
    };
    drop(decoder);

    let data = Array3::from_shape_vec((height, width, bands), pixels)?;
    let data = if bands == 4 {
        data.slice(ndarray::s![.., .., ..3]).to_owned()
    } else {
        data
    };

    let geo_transform = GeoTransform::from_geotiff_tags(pixel_scale, tiepoint)?;
    debug!(
        path = %path.display(),
        width,
        height,
        epsg,
        transform = ?geo_transform.coefficients(),
        "Opened source raster"
    );

    GeoRaster::new(data, geo_transform, epsg)
}

/// Projected or geographic CRS code from a GeoKeyDirectory tag
fn epsg_from_geokeys(keys: &[u16]) -> Option<u16> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // Location 0 means the value is stored inline
        if location != 0 {
            continue;
        }
        match key {
            GEO_KEY_PROJECTED_CRS => return Some(value),
            GEO_KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }
    geographic
}
