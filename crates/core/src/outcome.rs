//! Typed empty-result marker shared by all engines.
//!
//! An engine that runs out of input (no features, no candidates left after a
//! filter stage, a raster without valid cells) returns [`Outcome::Empty`]
//! instead of computing statistics over nothing. Callers match on it and
//! report the origin; it is never an `Err`.

use serde::Serialize;
use std::fmt;

/// Why an engine produced no result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The input feature collection had no features
    NoFeatures,
    /// Features existed but none received a defined score
    NoScoredFeatures,
    /// A filter stage eliminated every candidate
    NoCandidates,
    /// A reference collection had no geometry, so no candidate can qualify
    NoReference,
    /// The raster has zero cells
    NoCells,
    /// The raster has cells but all of them are no-data
    NoValidCells,
}

impl EmptyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyReason::NoFeatures => "no input features",
            EmptyReason::NoScoredFeatures => "no feature has a defined score",
            EmptyReason::NoCandidates => "no candidates survived",
            EmptyReason::NoReference => "reference collection is empty",
            EmptyReason::NoCells => "raster has no cells",
            EmptyReason::NoValidCells => "raster has no valid cells",
        }
    }
}

/// Description of an empty result: which stage, indicator or layer produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyResult {
    /// Name of the stage, indicator or layer that produced the empty state
    pub origin: String,
    pub reason: EmptyReason,
}

impl EmptyResult {
    pub fn new(origin: impl Into<String>, reason: EmptyReason) -> Self {
        Self {
            origin: origin.into(),
            reason,
        }
    }
}

impl fmt::Display for EmptyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.reason.as_str())
    }
}

/// Result of an engine run: either a complete value or a typed empty marker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Complete(T),
    Empty(EmptyResult),
}

impl<T> Outcome<T> {
    /// Shorthand for `Outcome::Empty(EmptyResult::new(origin, reason))`
    pub fn empty(origin: impl Into<String>, reason: EmptyReason) -> Self {
        Outcome::Empty(EmptyResult::new(origin, reason))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty(_))
    }

    /// The complete value, if any
    pub fn complete(self) -> Option<T> {
        match self {
            Outcome::Complete(v) => Some(v),
            Outcome::Empty(_) => None,
        }
    }

    pub fn as_complete(&self) -> Option<&T> {
        match self {
            Outcome::Complete(v) => Some(v),
            Outcome::Empty(_) => None,
        }
    }

    /// The empty marker, if any
    pub fn empty_result(&self) -> Option<&EmptyResult> {
        match self {
            Outcome::Complete(_) => None,
            Outcome::Empty(e) => Some(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Complete(v) => Outcome::Complete(f(v)),
            Outcome::Empty(e) => Outcome::Empty(e),
        }
    }
}
