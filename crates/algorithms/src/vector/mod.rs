//! Vector helpers shared by the engines
//!
//! - Area: planar area of areal geometries
//! - Validation: finite, non-degenerate, non-self-intersecting geometries
//! - Bounding box: envelopes for cheap predicate rejection

mod measurements;
mod spatial;

pub use measurements::{area, validate_geometry};
pub use spatial::BoundingBox;
