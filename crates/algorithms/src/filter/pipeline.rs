//! Ordered stage pipeline

use std::collections::HashSet;

use geofuse_core::crs::compatible;
use geofuse_core::{Algorithm, EmptyReason, Error, FeatureCollection, Outcome, Result, CRS};
use serde::Serialize;
use tracing::{debug, warn};

use super::stage::{Reference, Stage, StageKind, StageSpec};
use crate::vector::validate_geometry;

/// Features entering and leaving one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: String,
    pub kind: StageKind,
    pub input: usize,
    pub output: usize,
}

/// Result of a pipeline run
#[derive(Debug)]
pub struct FilterReport {
    /// One entry per stage that ran
    pub counts: Vec<StageCount>,
    /// Surviving features, or the stage that emptied the candidate set
    pub outcome: Outcome<FeatureCollection>,
}

/// Validated sequence of filter stages.
///
/// Built once from [`StageSpec`]s; every configuration problem is reported by
/// [`FilterPipeline::from_specs`] so that no stage starts on a broken pipeline.
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    stages: Vec<Stage>,
}

impl FilterPipeline {
    pub fn from_specs(specs: Vec<StageSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::Configuration("filter pipeline has no stages".into()));
        }

        let mut names = HashSet::new();
        let mut reference_crs: Option<CRS> = None;
        let mut stages = Vec::with_capacity(specs.len());

        for spec in specs {
            let StageSpec {
                name,
                kind,
                reference,
                threshold,
            } = spec;

            if name.trim().is_empty() {
                return Err(Error::Configuration(format!("{} stage has an empty name", kind)));
            }
            if !names.insert(name.clone()) {
                return Err(Error::Configuration(format!("stage name '{}' is used twice", name)));
            }

            let threshold = match (kind.needs_threshold(), threshold) {
                (true, None) => {
                    return Err(Error::Configuration(format!("stage '{}' ({}) needs a threshold", name, kind)))
                }
                (true, Some(t)) if !t.is_finite() || t < 0.0 => {
                    return Err(Error::InvalidParameter {
                        name: "threshold",
                        value: t.to_string(),
                        reason: format!("stage '{}' needs a finite, non-negative threshold", name),
                    })
                }
                (false, Some(t)) => {
                    warn!("stage '{}' ({}) ignores threshold {}", name, kind, t);
                    0.0
                }
                (_, t) => t.unwrap_or_default(),
            };

            let reference = match (kind.needs_reference(), reference) {
                (true, None) => {
                    return Err(Error::Configuration(format!(
                        "stage '{}' ({}) needs a reference collection",
                        name, kind
                    )))
                }
                (true, Some(collection)) => {
                    for feature in collection.iter() {
                        validate_geometry(&feature.id, &feature.geometry)?;
                    }
                    if let Some(crs) = collection.crs() {
                        match &reference_crs {
                            Some(seen) if !seen.is_equivalent(crs) => {
                                return Err(Error::CrsMismatch(seen.identifier(), crs.identifier()))
                            }
                            Some(_) => {}
                            None => reference_crs = Some(crs.clone()),
                        }
                    }
                    Some(Reference::new(collection))
                }
                (false, _) => None,
            };

            let stage = match (kind, reference) {
                (StageKind::Containment, Some(reference)) => Stage::Containment { name, reference },
                (StageKind::DistanceThreshold, Some(reference)) => Stage::DistanceThreshold {
                    name,
                    reference,
                    min_distance: threshold,
                },
                (StageKind::AreaThreshold, _) => Stage::AreaThreshold {
                    name,
                    min_area: threshold,
                },
                (kind, None) => {
                    return Err(Error::Other(format!("{} stage compiled without a reference", kind)))
                }
            };
            stages.push(stage);
        }

        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(Stage::name)
    }

    /// Checks that need the candidates; run before the first stage
    fn check_candidates(&self, candidates: &FeatureCollection) -> Result<()> {
        for stage in &self.stages {
            if let Some(reference) = stage.reference() {
                let reference_crs = reference.collection.crs();
                if !compatible(candidates.crs(), reference_crs) {
                    return Err(Error::CrsMismatch(
                        candidates.crs().map(CRS::identifier).unwrap_or_default(),
                        reference_crs.map(CRS::identifier).unwrap_or_default(),
                    ));
                }
            }

            if stage.kind().is_metric() {
                let crs = candidates
                    .crs()
                    .or_else(|| stage.reference().and_then(|r| r.collection.crs()));
                if let Some(crs) = crs.filter(|c| c.is_geographic()) {
                    return Err(Error::GeographicCrs {
                        crs: crs.identifier(),
                        operation: stage.kind().as_str(),
                    });
                }
            }
        }

        for feature in candidates.iter() {
            validate_geometry(&feature.id, &feature.geometry)?;
        }
        Ok(())
    }

    /// Run every stage in order over the candidates.
    ///
    /// The candidates are not modified; survivors are cloned into the output
    /// with each stage's attributes added. The first stage that leaves no
    /// survivor ends the run, and its name is the origin of the empty result.
    pub fn run(&self, candidates: &FeatureCollection) -> Result<FilterReport> {
        self.check_candidates(candidates)?;

        let mut counts = Vec::with_capacity(self.stages.len());
        if candidates.is_empty() {
            warn!("filter: no candidate features");
            return Ok(FilterReport {
                counts,
                outcome: Outcome::empty("candidates", EmptyReason::NoCandidates),
            });
        }

        let mut current = candidates.features().to_vec();
        for stage in &self.stages {
            let input = current.len();
            current = stage.apply(current);

            debug!("stage '{}' ({}): {} -> {}", stage.name(), stage.kind(), input, current.len());
            counts.push(StageCount {
                stage: stage.name().to_string(),
                kind: stage.kind(),
                input,
                output: current.len(),
            });

            if current.is_empty() {
                let reason = match stage.reference() {
                    Some(reference) if reference.is_empty() => EmptyReason::NoReference,
                    _ => EmptyReason::NoCandidates,
                };
                warn!("stage '{}' left no candidates ({})", stage.name(), reason.as_str());
                return Ok(FilterReport {
                    counts,
                    outcome: Outcome::empty(stage.name(), reason),
                });
            }
        }

        let survivors = FeatureCollection::from_features(current, candidates.crs().cloned())?;
        Ok(FilterReport {
            counts,
            outcome: Outcome::Complete(survivors),
        })
    }
}

/// Spatial filter algorithm
#[derive(Debug, Clone, Default)]
pub struct SpatialFilter;

impl Algorithm for SpatialFilter {
    type Input = (FeatureCollection, Vec<StageSpec>);
    type Output = FilterReport;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "SpatialFilter"
    }

    fn description(&self) -> &'static str {
        "Narrow a feature collection through containment, area and distance stages"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        let (candidates, specs) = input;
        FilterPipeline::from_specs(specs)?.run(&candidates)
    }
}
