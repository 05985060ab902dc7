//! GeoTIFF reading/writing through the `tiff` crate
//!
//! Georeferencing is carried by ModelPixelScale + ModelTiepoint tags, the
//! no-data value by the GDAL_NODATA ASCII tag, and the EPSG code (when known)
//! by a minimal GeoKey directory. Rotated grids are not supported.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray64Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Read the first band of a GeoTIFF file
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    debug!("reading GeoTIFF {}", path.as_ref().display());
    decode_geotiff(file)
}

/// Read a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::nodata_sentinel))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let tiff_err = |what: &str, e: tiff::TiffError| Error::Other(format!("{}: {}", what, e));

    let mut decoder = Decoder::new(reader).map_err(|e| tiff_err("TIFF decode error", e))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| tiff_err("Cannot read dimensions", e))?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<T> = match decoder
        .read_image()
        .map_err(|e| tiff_err("Cannot read image data", e))?
    {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    if let Ok(text) = decoder.get_tag_ascii_string(Tag::GdalNodata) {
        let nodata = text
            .trim_matches(char::from(0))
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(num_traits::cast);
        raster.set_nodata(nodata);
    }
    if let Ok(keys) = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) {
        raster.set_crs(epsg_from_geokeys(&keys).map(CRS::from_epsg));
    }

    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Extract a geographic or projected EPSG code from a GeoKey directory
fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    keys[4..]
        .chunks_exact(4)
        .take(count)
        .find(|entry| {
            (entry[0] == PROJECTED_CS_TYPE_KEY || entry[0] == GEOGRAPHIC_TYPE_KEY)
                && entry[1] == 0
                && entry[3] != 0
                && entry[3] != 32767
        })
        .map(|entry| u32::from(entry[3]))
}

/// Write a raster to a GeoTIFF file as 64-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    debug!("writing GeoTIFF {}", path.as_ref().display());
    encode_geotiff(raster, BufWriter::new(file))
}

/// Write a raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let tiff_err = |what: &str, e: tiff::TiffError| Error::Other(format!("{}: {}", what, e));

    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_err("TIFF encoder error", e))?;
    let (rows, cols) = raster.shape();

    let data: Vec<f64> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                f64::NAN
            } else {
                v.as_f64().unwrap_or(f64::NAN)
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray64Float>(cols as u32, rows as u32)
        .map_err(|e| tiff_err("Cannot create TIFF image", e))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| tiff_err("Cannot write scale tag", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| tiff_err("Cannot write tiepoint tag", e))?;

    let geokeys = geokey_directory(raster.crs());
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(|e| tiff_err("Cannot write geokey tag", e))?;

    // Output no-data is always NaN after the conversion above
    image
        .encoder()
        .write_tag(Tag::GdalNodata, "nan")
        .map_err(|e| tiff_err("Cannot write nodata tag", e))?;

    image
        .write_data(&data)
        .map_err(|e| tiff_err("Cannot write image data", e))?;

    Ok(())
}

/// GeoKey directory: model type, raster type and the EPSG code when known
fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).and_then(|code| u16::try_from(code).ok());
    let geographic = crs.is_some_and(|c| c.is_geographic());

    let mut keys = vec![
        GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 },
        GT_RASTER_TYPE_KEY, 0, 1, 1,
    ];
    if let Some(code) = epsg {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }

    let count = (keys.len() / 4) as u16;
    let mut directory = vec![1, 1, 0, count];
    directory.extend(keys);
    directory
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![0.0, 0.25, f64::NAN, 1.0, 0.5, 0.75], 2, 3).unwrap();
        r.set_transform(GeoTransform::new(440_720.0, 3_751_320.0, 30.0, -30.0));
        r.set_crs(Some(CRS::from_epsg(32611)));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_buffer_roundtrip() {
        let raster = sample();
        let bytes = write_geotiff_to_buffer(&raster).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_relative_eq!(back.get(0, 1).unwrap(), 0.25);
        assert!(back.get(0, 2).unwrap().is_nan());
        assert_relative_eq!(back.transform().origin_x, 440_720.0);
        assert_relative_eq!(back.transform().pixel_height, -30.0);
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32611));
    }

    #[test]
    fn test_georeference_survives_roundtrip() {
        let mut raster = Raster::from_vec(vec![812.0, 815.5, 809.25, -9999.0], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, 25.0, -25.0));
        raster.set_crs(Some(CRS::from_epsg(25830)));
        raster.set_nodata(Some(-9999.0));

        let bytes = write_geotiff_to_buffer(&raster).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();

        let gt = back.transform();
        assert_relative_eq!(gt.origin_x, 500_000.0);
        assert_relative_eq!(gt.origin_y, 4_000_000.0);
        assert_relative_eq!(gt.pixel_width, 25.0);
        assert_relative_eq!(gt.pixel_height, -25.0);
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(25830));
        assert!(back.nodata().is_some_and(|nd| nd.is_nan()));
        assert!(back.get(1, 1).unwrap().is_nan());
        assert_relative_eq!(back.get(1, 0).unwrap(), 809.25);
    }

    #[test]
    fn test_file_roundtrip() {
        let raster = sample();
        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path()).unwrap();

        let back: Raster<f64> = read_geotiff(tmp.path()).unwrap();
        assert_relative_eq!(back.get(1, 2).unwrap(), 0.75);
    }

    #[test]
    fn test_geokeys_parse() {
        let dir = geokey_directory(Some(&CRS::from_epsg(25830)));
        assert_eq!(epsg_from_geokeys(&dir), Some(25830));
        assert_eq!(epsg_from_geokeys(&geokey_directory(None)), None);
    }
}
