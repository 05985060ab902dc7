//! Join & normalize engine
//!
//! Indicator tables at mixed administrative levels and publication periods
//! are joined onto region features and reduced to a composite need score.

mod granularity;
mod need_score;
mod period;
mod rank;

pub use granularity::{Granularity, GranularityScheme, FEATURE_LEVEL};
pub use need_score::{
    need_score, IndicatorSpec, NeedScore, NeedScoreParams, NeedScoreRun, SkippedIndicator,
    BAND_FIELD, INDICATOR_COUNT_FIELD, PRIORITY_FIELD, RANK_PREFIX, SCORE_FIELD,
};
pub use period::latest_per_key;
pub use rank::{assign_bands, percentile_ranks};
