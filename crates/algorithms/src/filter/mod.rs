//! Spatial filter engine
//!
//! An ordered pipeline of named stages, each narrowing the candidate set:
//!
//! - **containment**: candidate lies within a reference polygon (DE-9IM
//!   *within*, so touching the boundary from outside does not count)
//! - **area threshold**: planar area at least the threshold
//! - **distance threshold**: farther than the threshold from every reference
//!   geometry; an empty reference admits nothing
//!
//! A stage that empties the candidate set ends the run with a typed empty
//! result naming that stage.

mod pipeline;
mod stage;

pub use pipeline::{FilterPipeline, FilterReport, SpatialFilter, StageCount};
pub use stage::{StageKind, StageSpec};
