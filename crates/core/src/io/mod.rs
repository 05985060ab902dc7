//! Reading and writing materialized inputs and engine outputs
//!
//! - GeoTIFF rasters (`tiff` crate)
//! - GeoJSON feature collections (`geojson` crate)
//! - JSON indicator tables

mod features;
mod indicators;
mod native;

pub use features::{parse_geojson, read_geojson, to_geojson, write_geojson};
pub use indicators::read_indicator_table;
pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
