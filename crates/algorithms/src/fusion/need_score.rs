//! Composite need score over administrative regions
//!
//! Joins indicator tables (possibly published at coarser administrative
//! levels) onto region features, rank-normalizes each indicator, averages the
//! available ranks into a composite score and classifies the scored regions
//! into equal-count bands. The top band is flagged as priority.
//!
//! Ranking needs the whole population, so every call recomputes all ranks and
//! bands from the complete input; there is no incremental mode.

use std::collections::HashSet;

use geofuse_core::{
    Algorithm, EmptyReason, Error, Feature, FeatureCollection, IndicatorTable, Outcome, Result,
};
use tracing::{debug, warn};

use super::granularity::{GranularityScheme, FEATURE_LEVEL};
use super::period::latest_per_key;
use super::rank::{assign_bands, percentile_ranks};

/// Attribute holding the composite score
pub const SCORE_FIELD: &str = "score";
/// Attribute holding the 1-based band
pub const BAND_FIELD: &str = "band";
/// Attribute flagging the top band
pub const PRIORITY_FIELD: &str = "priority";
/// Attribute holding how many indicators contributed to the score
pub const INDICATOR_COUNT_FIELD: &str = "indicator_count";
/// Prefix of the per-indicator normalized rank attributes
pub const RANK_PREFIX: &str = "rank_";

/// One indicator source and how to join it
#[derive(Debug, Clone)]
pub struct IndicatorSpec {
    pub table: IndicatorTable,
    /// Level tag resolved through [`GranularityScheme`]
    pub granularity: String,
    /// Higher raw values mean lower need
    pub reverse: bool,
}

impl IndicatorSpec {
    /// Indicator keyed at the features' own level
    pub fn new(table: IndicatorTable) -> Self {
        Self {
            table,
            granularity: FEATURE_LEVEL.to_string(),
            reverse: false,
        }
    }

    pub fn at_level(mut self, tag: impl Into<String>) -> Self {
        self.granularity = tag.into();
        self
    }

    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn name(&self) -> &str {
        &self.table.name
    }
}

/// Parameters for the need score
#[derive(Debug, Clone)]
pub struct NeedScoreParams {
    /// Number of equal-count bands (default 10, deciles)
    pub bands: u32,
    /// Known administrative levels
    pub scheme: GranularityScheme,
}

impl Default for NeedScoreParams {
    fn default() -> Self {
        Self {
            bands: 10,
            scheme: GranularityScheme::default(),
        }
    }
}

/// An indicator excluded from the run, with the reason
#[derive(Debug)]
pub struct SkippedIndicator {
    pub name: String,
    pub error: Error,
}

/// Result of a need-score run
#[derive(Debug)]
pub struct NeedScoreRun {
    /// Scored regions (input order, unscored regions dropped) or the empty marker
    pub outcome: Outcome<FeatureCollection>,
    /// Indicators that failed independently of the others
    pub skipped: Vec<SkippedIndicator>,
}

/// Normalized ranks of one indicator, aligned with the feature order
struct JoinedIndicator<'a> {
    name: &'a str,
    ranks: Vec<Option<f64>>,
}

/// Join one indicator onto the features and rank the joined values
fn join_indicator<'a>(
    features: &FeatureCollection,
    spec: &'a IndicatorSpec,
    scheme: &GranularityScheme,
) -> Result<JoinedIndicator<'a>> {
    let rule = scheme.resolve(spec.name(), &spec.granularity)?;
    let latest = latest_per_key(&spec.table)?;

    let joined: Vec<Option<f64>> = features
        .iter()
        .map(|f| rule.derive_key(&f.id).and_then(|key| latest.get(key).copied()))
        .collect();

    let (slots, values): (Vec<usize>, Vec<f64>) = joined
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .unzip();

    debug!(
        "indicator '{}' ({:?}): {} keys, joined onto {} of {} features",
        spec.name(),
        rule,
        latest.len(),
        values.len(),
        features.len()
    );
    if values.is_empty() {
        warn!("indicator '{}' matched no feature", spec.name());
    }

    let mut ranks = vec![None; features.len()];
    for (slot, rank) in slots.into_iter().zip(percentile_ranks(&values, spec.reverse)) {
        ranks[slot] = Some(rank);
    }

    Ok(JoinedIndicator {
        name: spec.name(),
        ranks,
    })
}

/// Compute the composite need score.
///
/// Configuration problems (zero bands, two indicators with the same name)
/// fail before any work. An indicator whose granularity tag is unknown or
/// whose table holds conflicting observations is skipped and reported in
/// [`NeedScoreRun::skipped`]; the remaining indicators still score.
///
/// A feature's score is the mean of the ranks it has, so a region covered by
/// `k` of `N` indicators averages exactly `k` ranks. Regions with no
/// indicator value are left out of the output.
pub fn need_score(
    features: &FeatureCollection,
    indicators: &[IndicatorSpec],
    params: &NeedScoreParams,
) -> Result<NeedScoreRun> {
    if params.bands == 0 {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: "0".into(),
            reason: "at least one band is required".into(),
        });
    }
    let mut names = HashSet::new();
    for spec in indicators {
        if !names.insert(spec.name()) {
            return Err(Error::Configuration(format!(
                "indicator '{}' is declared more than once",
                spec.name()
            )));
        }
    }

    if features.is_empty() {
        return Ok(NeedScoreRun {
            outcome: Outcome::empty("regions", EmptyReason::NoFeatures),
            skipped: Vec::new(),
        });
    }

    let mut joined = Vec::with_capacity(indicators.len());
    let mut skipped = Vec::new();
    for spec in indicators {
        match join_indicator(features, spec, &params.scheme) {
            Ok(j) => joined.push(j),
            Err(error) => {
                warn!("skipping indicator '{}': {}", spec.name(), error);
                skipped.push(SkippedIndicator {
                    name: spec.name().to_string(),
                    error,
                });
            }
        }
    }

    // (feature index, composite score, contributing indicator count)
    let scored: Vec<(usize, f64, usize)> = (0..features.len())
        .filter_map(|i| {
            let available: Vec<f64> = joined.iter().filter_map(|j| j.ranks[i]).collect();
            if available.is_empty() {
                return None;
            }
            let mean = available.iter().sum::<f64>() / available.len() as f64;
            Some((i, mean, available.len()))
        })
        .collect();

    if scored.is_empty() {
        return Ok(NeedScoreRun {
            outcome: Outcome::empty("need_score", EmptyReason::NoScoredFeatures),
            skipped,
        });
    }

    let scores: Vec<f64> = scored.iter().map(|&(_, s, _)| s).collect();
    let bands = assign_bands(&scores, params.bands)?;

    let source = features.features();
    let mut output = FeatureCollection::with_crs(features.crs().cloned());
    for (&(i, score, count), band) in scored.iter().zip(bands) {
        let mut feature: Feature = source[i].clone();
        for j in &joined {
            if let Some(rank) = j.ranks[i] {
                feature.set_property(format!("{}{}", RANK_PREFIX, j.name), rank);
            }
        }
        feature.set_property(INDICATOR_COUNT_FIELD, count as i64);
        feature.set_property(SCORE_FIELD, score);
        feature.set_property(BAND_FIELD, band);
        feature.set_property(PRIORITY_FIELD, band == params.bands);
        output.push(feature)?;
    }

    debug!(
        "need score: {} of {} features scored, {} indicators used, {} skipped",
        output.len(),
        features.len(),
        joined.len(),
        skipped.len()
    );

    Ok(NeedScoreRun {
        outcome: Outcome::Complete(output),
        skipped,
    })
}

/// Need-score algorithm
#[derive(Debug, Clone, Default)]
pub struct NeedScore;

impl Algorithm for NeedScore {
    type Input = (FeatureCollection, Vec<IndicatorSpec>);
    type Output = NeedScoreRun;
    type Params = NeedScoreParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "NeedScore"
    }

    fn description(&self) -> &'static str {
        "Join indicators across administrative levels, rank-normalize and band regions by composite need"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (features, indicators) = input;
        need_score(&features, &indicators, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::Granularity;
    use approx::assert_relative_eq;
    use geo::{polygon, Polygon};

    fn cell(x: f64) -> Polygon<f64> {
        polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 1.0)]
    }

    fn regions(ids: &[&str]) -> FeatureCollection {
        FeatureCollection::from_features(
            ids.iter().enumerate().map(|(i, id)| Feature::new(*id, cell(i as f64))),
            None,
        )
        .unwrap()
    }

    fn scored(run: &NeedScoreRun) -> &FeatureCollection {
        run.outcome.as_complete().expect("expected scored regions")
    }

    #[test]
    fn test_single_indicator_bands() {
        let fc = regions(&["A1", "A2", "A3", "A4"]);
        let density = IndicatorTable::single_period(
            "density",
            2023,
            [("A1", 10.0), ("A2", 20.0), ("A3", 30.0), ("A4", 40.0)],
        );
        let params = NeedScoreParams {
            bands: 4,
            ..Default::default()
        };

        let run = need_score(&fc, &[IndicatorSpec::new(density)], &params).unwrap();
        let out = scored(&run);

        let bands: Vec<f64> = out.iter().map(|f| f.get_f64(BAND_FIELD).unwrap()).collect();
        assert_eq!(bands, vec![1.0, 2.0, 3.0, 4.0]);
        let priority: Vec<&str> = out
            .iter()
            .filter(|f| f.get_property(PRIORITY_FIELD).and_then(|v| v.as_bool()) == Some(true))
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(priority, vec!["A4"]);
    }

    #[test]
    fn test_coarse_indicator_joins_by_prefix() {
        let fc = regions(&["ES511", "ES512", "ES521"]);
        let unemployment = IndicatorTable::single_period("unemployment", 2022, [("ES51", 9.0), ("ES52", 14.0)]);
        let params = NeedScoreParams {
            bands: 2,
            scheme: GranularityScheme::default()
                .with_level("region", Granularity::Prefix(4))
                .unwrap(),
        };

        let run = need_score(&fc, &[IndicatorSpec::new(unemployment).at_level("region")], &params).unwrap();
        let out = scored(&run);
        assert_eq!(out.len(), 3);

        // ES511 and ES512 share the ES51 value and tie on rank
        let r511 = out.get("ES511").unwrap().get_f64("rank_unemployment").unwrap();
        let r512 = out.get("ES512").unwrap().get_f64("rank_unemployment").unwrap();
        let r521 = out.get("ES521").unwrap().get_f64("rank_unemployment").unwrap();
        assert_relative_eq!(r511, r512);
        assert_relative_eq!(r511, 0.25);
        assert_relative_eq!(r521, 1.0);
    }

    #[test]
    fn test_missing_indicator_excluded_from_mean() {
        let fc = regions(&["A", "B", "C"]);
        let density = IndicatorTable::single_period("density", 2023, [("A", 1.0), ("B", 2.0), ("C", 3.0)]);
        let poverty = IndicatorTable::single_period("poverty", 2021, [("A", 5.0), ("C", 1.0)]);

        let run = need_score(
            &fc,
            &[IndicatorSpec::new(density), IndicatorSpec::new(poverty)],
            &NeedScoreParams::default(),
        )
        .unwrap();
        let out = scored(&run);

        let b = out.get("B").unwrap();
        assert_eq!(b.get_f64(INDICATOR_COUNT_FIELD), Some(1.0));
        assert_relative_eq!(b.get_f64(SCORE_FIELD).unwrap(), 0.5);

        let a = out.get("A").unwrap();
        assert_eq!(a.get_f64(INDICATOR_COUNT_FIELD), Some(2.0));
        // density rank 0, poverty rank 1
        assert_relative_eq!(a.get_f64(SCORE_FIELD).unwrap(), 0.5);
    }

    #[test]
    fn test_reverse_indicator() {
        let fc = regions(&["A", "B"]);
        let income = IndicatorTable::single_period("income", 2023, [("A", 30_000.0), ("B", 18_000.0)]);

        let run = need_score(&fc, &[IndicatorSpec::new(income).reversed(true)], &NeedScoreParams::default()).unwrap();
        let out = scored(&run);
        assert_relative_eq!(out.get("A").unwrap().get_f64(SCORE_FIELD).unwrap(), 0.0);
        assert_relative_eq!(out.get("B").unwrap().get_f64(SCORE_FIELD).unwrap(), 1.0);
    }

    #[test]
    fn test_unscored_features_are_dropped() {
        let fc = regions(&["A", "B", "C"]);
        let density = IndicatorTable::single_period("density", 2023, [("A", 1.0), ("C", 3.0)]);

        let run = need_score(&fc, &[IndicatorSpec::new(density)], &NeedScoreParams::default()).unwrap();
        let out = scored(&run);
        assert_eq!(out.len(), 2);
        assert!(out.get("B").is_none());
    }

    #[test]
    fn test_unknown_granularity_is_isolated() {
        let fc = regions(&["ES511", "ES512"]);
        let density = IndicatorTable::single_period("density", 2023, [("ES511", 3.0), ("ES512", 1.0)]);
        let poverty = IndicatorTable::single_period("poverty", 2023, [("ES51", 20.0)]);

        let run = need_score(
            &fc,
            &[IndicatorSpec::new(density), IndicatorSpec::new(poverty).at_level("province")],
            &NeedScoreParams::default(),
        )
        .unwrap();

        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].name, "poverty");
        assert!(matches!(run.skipped[0].error, Error::GranularityMismatch { .. }));
        assert_eq!(scored(&run).len(), 2);
    }

    #[test]
    fn test_empty_collection_is_typed_empty() {
        let fc = FeatureCollection::new();
        let density = IndicatorTable::single_period("density", 2023, [("A", 1.0)]);
        let run = need_score(&fc, &[IndicatorSpec::new(density)], &NeedScoreParams::default()).unwrap();

        let empty = run.outcome.empty_result().unwrap();
        assert_eq!(empty.reason, EmptyReason::NoFeatures);
    }

    #[test]
    fn test_no_match_is_typed_empty() {
        let fc = regions(&["A", "B"]);
        let density = IndicatorTable::single_period("density", 2023, [("Z", 1.0)]);
        let run = need_score(&fc, &[IndicatorSpec::new(density)], &NeedScoreParams::default()).unwrap();

        let empty = run.outcome.empty_result().unwrap();
        assert_eq!(empty.reason, EmptyReason::NoScoredFeatures);
    }

    #[test]
    fn test_duplicate_indicator_name_fails_fast() {
        let fc = regions(&["A"]);
        let t = IndicatorTable::single_period("density", 2023, [("A", 1.0)]);
        let err = need_score(
            &fc,
            &[IndicatorSpec::new(t.clone()), IndicatorSpec::new(t)],
            &NeedScoreParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_algorithm_trait() {
        let fc = regions(&["A", "B"]);
        let t = IndicatorTable::single_period("density", 2023, [("A", 1.0), ("B", 2.0)]);
        let run = NeedScore.execute_default((fc, vec![IndicatorSpec::new(t)])).unwrap();
        assert_eq!(run.outcome.complete().map(|fc| fc.len()), Some(2));
    }
}
