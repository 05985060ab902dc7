//! Filter stage kinds and their predicates

use std::fmt;
use std::str::FromStr;

use geo::{Distance, Euclidean, Relate};
use geofuse_core::{Error, Feature, FeatureCollection, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::vector::{area, BoundingBox};

/// Predicate family of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Candidate lies within a reference polygon
    Containment,
    /// Candidate area is at least the threshold
    AreaThreshold,
    /// Candidate is farther than the threshold from every reference geometry
    DistanceThreshold,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Containment => "containment",
            StageKind::AreaThreshold => "area_threshold",
            StageKind::DistanceThreshold => "distance_threshold",
        }
    }

    /// Stage needs a reference collection
    pub fn needs_reference(&self) -> bool {
        matches!(self, StageKind::Containment | StageKind::DistanceThreshold)
    }

    /// Stage needs a threshold
    pub fn needs_threshold(&self) -> bool {
        matches!(self, StageKind::AreaThreshold | StageKind::DistanceThreshold)
    }

    /// Stage measures lengths or areas and so requires a projected CRS
    pub fn is_metric(&self) -> bool {
        self.needs_threshold()
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "containment" | "within" => Ok(StageKind::Containment),
            "area" | "area_threshold" => Ok(StageKind::AreaThreshold),
            "distance" | "distance_threshold" => Ok(StageKind::DistanceThreshold),
            other => Err(Error::Configuration(format!("unknown stage kind '{}'", other))),
        }
    }
}

impl Serialize for StageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Declarative description of a stage, as read from a job file.
///
/// The reference collection is attached after loading; it is never part of
/// the serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub kind: StageKind,
    #[serde(skip)]
    pub reference: Option<FeatureCollection>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl StageSpec {
    pub fn containment(name: impl Into<String>, reference: FeatureCollection) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Containment,
            reference: Some(reference),
            threshold: None,
        }
    }

    pub fn area(name: impl Into<String>, min_area: f64) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::AreaThreshold,
            reference: None,
            threshold: Some(min_area),
        }
    }

    pub fn distance(name: impl Into<String>, reference: FeatureCollection, min_distance: f64) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::DistanceThreshold,
            reference: Some(reference),
            threshold: Some(min_distance),
        }
    }
}

/// Reference geometries with their envelopes precomputed
#[derive(Debug, Clone)]
pub(crate) struct Reference {
    pub(crate) collection: FeatureCollection,
    envelopes: Vec<Option<BoundingBox>>,
}

impl Reference {
    pub(crate) fn new(collection: FeatureCollection) -> Self {
        let envelopes = collection.iter().map(|f| BoundingBox::of(&f.geometry)).collect();
        Self { collection, envelopes }
    }

    /// No reference geometry has an extent, so nothing can match it
    pub(crate) fn is_empty(&self) -> bool {
        self.envelopes.iter().all(Option::is_none)
    }

    fn entries(&self) -> impl Iterator<Item = (&Feature, BoundingBox)> {
        self.collection
            .iter()
            .zip(&self.envelopes)
            .filter_map(|(f, bb)| bb.map(|bb| (f, bb)))
    }
}

/// A validated, ready-to-run stage
#[derive(Debug, Clone)]
pub(crate) enum Stage {
    Containment { name: String, reference: Reference },
    AreaThreshold { name: String, min_area: f64 },
    DistanceThreshold { name: String, reference: Reference, min_distance: f64 },
}

impl Stage {
    pub(crate) fn name(&self) -> &str {
        match self {
            Stage::Containment { name, .. }
            | Stage::AreaThreshold { name, .. }
            | Stage::DistanceThreshold { name, .. } => name,
        }
    }

    pub(crate) fn kind(&self) -> StageKind {
        match self {
            Stage::Containment { .. } => StageKind::Containment,
            Stage::AreaThreshold { .. } => StageKind::AreaThreshold,
            Stage::DistanceThreshold { .. } => StageKind::DistanceThreshold,
        }
    }

    pub(crate) fn reference(&self) -> Option<&Reference> {
        match self {
            Stage::Containment { reference, .. } | Stage::DistanceThreshold { reference, .. } => {
                Some(reference)
            }
            Stage::AreaThreshold { .. } => None,
        }
    }

    /// Keep the features that satisfy the predicate, annotated with the
    /// stage's diagnostic attributes. Order is preserved.
    pub(crate) fn apply(&self, features: Vec<Feature>) -> Vec<Feature> {
        match self {
            Stage::Containment { name, reference } => features
                .into_iter()
                .filter_map(|f| contained(name, reference, f))
                .collect(),
            Stage::AreaThreshold { name, min_area } => features
                .into_iter()
                .filter_map(|mut f| {
                    let a = area(&f.geometry);
                    (a >= *min_area).then(|| {
                        f.set_property(name.as_str(), a);
                        f
                    })
                })
                .collect(),
            Stage::DistanceThreshold {
                name,
                reference,
                min_distance,
            } => {
                // Nothing can be farther than a threshold from a reference that does not exist
                if reference.is_empty() {
                    return Vec::new();
                }
                features
                    .into_iter()
                    .filter_map(|mut f| {
                        let d = nearest_distance(reference, &f)?;
                        (d > *min_distance).then(|| {
                            f.set_property(name.as_str(), d);
                            f
                        })
                    })
                    .collect()
            }
        }
    }
}

/// Join the first reference the candidate lies within.
///
/// Uses the DE-9IM *within* relation: the interiors intersect and no part of
/// the candidate lies outside the reference. A candidate that only touches a
/// reference along its boundary is not within it.
fn contained(stage: &str, reference: &Reference, mut feature: Feature) -> Option<Feature> {
    let envelope = BoundingBox::of(&feature.geometry)?;
    let (matched, _) = reference
        .entries()
        .filter(|(_, bb)| bb.contains_box(&envelope))
        .find(|(r, _)| feature.geometry.relate(&r.geometry).is_within())?;

    feature.set_property(format!("{}_id", stage), matched.id.as_str());
    feature.set_property(format!("{}_area", stage), area(&matched.geometry));
    for (key, value) in &matched.properties {
        feature.set_property(format!("{}.{}", stage, key), value.clone());
    }
    Some(feature)
}

/// Minimum Euclidean distance from the feature to any reference geometry,
/// equal to the distance to their union. `None` for an empty candidate geometry.
fn nearest_distance(reference: &Reference, feature: &Feature) -> Option<f64> {
    let envelope = BoundingBox::of(&feature.geometry)?;
    let mut nearest = f64::INFINITY;
    for (r, bb) in reference.entries() {
        if envelope.distance(&bb) >= nearest {
            continue;
        }
        nearest = nearest.min(Euclidean::distance(&feature.geometry, &r.geometry));
        if nearest == 0.0 {
            break;
        }
    }
    nearest.is_finite().then_some(nearest)
}
