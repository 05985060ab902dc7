//! Error types for GeoFuse

use thiserror::Error;

/// Main error type for GeoFuse operations.
///
/// Empty inputs are not errors: engines report them through
/// [`Outcome::Empty`](crate::Outcome). A flat raster layer is not an error
/// either; it normalizes to a zero field.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster grid mismatch: layer '{layer}' is not aligned with the reference grid")]
    GridMismatch { layer: String },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Geographic CRS {crs} cannot be used for planar {operation}; project to a metric CRS first")]
    GeographicCrs { crs: String, operation: &'static str },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Indicator '{indicator}' declares granularity '{tag}', which has no truncation rule")]
    GranularityMismatch { indicator: String, tag: String },

    #[error("Indicator '{indicator}' has conflicting values for key '{key}' in period {period}")]
    DuplicateObservation {
        indicator: String,
        key: String,
        period: i32,
    },

    #[error("Duplicate feature id '{0}' in collection")]
    DuplicateFeatureId(String),

    #[error("Invalid geometry for feature '{id}': {reason}")]
    InvalidGeometry { id: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

/// Result type alias for GeoFuse operations
pub type Result<T> = std::result::Result<T, Error>;
