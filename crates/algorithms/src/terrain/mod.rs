//! Terrain derivatives used as suitability layers
//!
//! - Slope: rate of change of elevation (Horn 1981)

mod slope;

pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
