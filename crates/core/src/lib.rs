//! # GeoFuse Core
//!
//! Core types and I/O for the GeoFuse indicator-fusion toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with no-data handling
//! - `Feature` / `FeatureCollection`: keyed vector features with attributes
//! - `IndicatorTable`: per-region observations over time
//! - `Outcome<T>`: typed empty-result marker returned by every engine
//! - `CRS`: coordinate reference system tags (no reprojection)
//! - I/O for GeoTIFF, GeoJSON and JSON indicator tables

pub mod crs;
pub mod error;
pub mod indicator;
pub mod io;
pub mod outcome;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use indicator::{IndicatorRecord, IndicatorTable};
pub use outcome::{EmptyReason, EmptyResult, Outcome};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::indicator::{IndicatorRecord, IndicatorTable};
    pub use crate::outcome::{EmptyReason, EmptyResult, Outcome};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Common interface of the engines.
///
/// Each algorithm is a pure function of its input and parameters; no state is
/// carried between calls.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
