//! Declared key-truncation rules between administrative levels
//!
//! Region codes are hierarchical: a coarser unit's code is a fixed-length
//! prefix of its children's codes. Each indicator declares the level its keys
//! are at; the scheme maps that level to the rule that turns a feature key
//! into the indicator's key.

use geofuse_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Level tag that every scheme knows: indicator keys equal feature keys
pub const FEATURE_LEVEL: &str = "feature";

/// Rule mapping a feature key to the key of an indicator table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Same level as the features
    Identity,
    /// Coarser level: the first `n` characters of the feature key
    Prefix(usize),
}

impl Granularity {
    /// Key of the unit containing `feature_key` at this level.
    ///
    /// `None` when the key is shorter than the prefix, i.e. the feature has
    /// no unit at this level.
    pub fn derive_key<'a>(&self, feature_key: &'a str) -> Option<&'a str> {
        match *self {
            Granularity::Identity => Some(feature_key),
            Granularity::Prefix(len) => feature_key
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(feature_key.len()))
                .nth(len)
                .map(|end| &feature_key[..end]),
        }
    }
}

/// Named levels and their truncation rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranularityScheme {
    levels: BTreeMap<String, Granularity>,
}

impl Default for GranularityScheme {
    fn default() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(FEATURE_LEVEL.to_string(), Granularity::Identity);
        Self { levels }
    }
}

impl GranularityScheme {
    /// Default scheme plus one prefix level per `(tag, length)` entry
    pub fn from_prefix_lengths<K: Into<String>>(
        levels: impl IntoIterator<Item = (K, usize)>,
    ) -> Result<Self> {
        let mut scheme = Self::default();
        for (tag, len) in levels {
            scheme.insert(tag, Granularity::Prefix(len))?;
        }
        Ok(scheme)
    }

    /// Declare a level. A zero-length prefix would collapse every key into
    /// one unit and is rejected.
    pub fn insert(&mut self, tag: impl Into<String>, rule: Granularity) -> Result<()> {
        let tag = tag.into();
        if rule == Granularity::Prefix(0) {
            return Err(Error::InvalidParameter {
                name: "granularity",
                value: tag,
                reason: "prefix length must be at least 1".into(),
            });
        }
        self.levels.insert(tag, rule);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_level(mut self, tag: impl Into<String>, rule: Granularity) -> Result<Self> {
        self.insert(tag, rule)?;
        Ok(self)
    }

    /// Rule for `tag`, or [`Error::GranularityMismatch`] naming the indicator
    pub fn resolve(&self, indicator: &str, tag: &str) -> Result<Granularity> {
        self.levels
            .get(tag)
            .copied()
            .ok_or_else(|| Error::GranularityMismatch {
                indicator: indicator.to_string(),
                tag: tag.to_string(),
            })
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }
}
