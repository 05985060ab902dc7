//! Raster suitability engine
//!
//! Continuous layers (slope, distance to roads, ...) are min-max normalized,
//! optionally inverted, combined with fixed weights and masked by exclusion
//! zones. Output no-data is NaN, distinct from a computed suitability of 0.

mod mask;
mod normalize;
mod overlay;

pub use mask::exclusion_mask;
pub use normalize::minmax_normalize;
pub use overlay::{weighted_suitability, Suitability, SuitabilityLayer, SuitabilityParams};
