//! # GeoFuse Algorithms
//!
//! Indicator-fusion engines over GeoFuse core types.
//!
//! ## Engines
//!
//! - **fusion**: join indicators across administrative levels, rank-normalize,
//!   score and band regions by composite need
//! - **filter**: ordered containment, area and distance stages
//! - **suitability**: weighted overlay of normalized rasters with exclusion masking
//!
//! ## Layer builders
//!
//! - **terrain**: slope from a DEM
//! - **proximity**: distance from every cell to the nearest feature
//! - **vector**: planar area, geometry validation, envelopes
//!
//! Every engine is a pure function of its inputs and returns an
//! [`Outcome`](geofuse_core::Outcome): either the result or a typed empty
//! marker naming the stage, indicator or layer that produced it.

pub(crate) mod maybe_rayon;

pub mod filter;
pub mod fusion;
pub mod proximity;
pub mod suitability;
pub mod terrain;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::filter::{FilterPipeline, FilterReport, SpatialFilter, StageCount, StageKind, StageSpec};
    pub use crate::fusion::{
        need_score, Granularity, GranularityScheme, IndicatorSpec, NeedScore, NeedScoreParams, NeedScoreRun,
        SkippedIndicator,
    };
    pub use crate::proximity::distance_to_features;
    pub use crate::suitability::{
        exclusion_mask, minmax_normalize, weighted_suitability, Suitability, SuitabilityLayer, SuitabilityParams,
    };
    pub use crate::terrain::{slope, Slope, SlopeParams, SlopeUnits};
    pub use geofuse_core::prelude::*;
}
