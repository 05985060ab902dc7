//! Keyed vector features
//!
//! A [`Feature`] is a geometry identified by a string key (typically a
//! hierarchical administrative code) plus named attributes. Keys are unique
//! within a [`FeatureCollection`].

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value, `None` for non-numeric values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Int(i64::from(v))
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

/// A keyed feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Unique key within a collection
    pub id: String,
    pub geometry: Geometry<f64>,
    /// Attributes, ordered by name for deterministic output
    pub properties: BTreeMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Numeric attribute, `None` if missing or non-numeric
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(AttributeValue::as_f64)
    }
}

/// Collection of features with unique ids and a shared CRS
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<Feature>,
    ids: HashSet<String>,
    crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty collection in the given CRS
    pub fn with_crs(crs: Option<CRS>) -> Self {
        Self {
            crs,
            ..Self::default()
        }
    }

    /// Build a collection, rejecting duplicate ids
    pub fn from_features(features: impl IntoIterator<Item = Feature>, crs: Option<CRS>) -> Result<Self> {
        let mut collection = Self::with_crs(crs);
        for feature in features {
            collection.push(feature)?;
        }
        Ok(collection)
    }

    /// Append a feature. Fails with [`Error::DuplicateFeatureId`] if the id is taken.
    pub fn push(&mut self, feature: Feature) -> Result<()> {
        if !self.ids.insert(feature.id.clone()) {
            return Err(Error::DuplicateFeatureId(feature.id));
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        if !self.ids.contains(id) {
            return None;
        }
        self.features.iter().find(|f| f.id == id)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, Point};

    #[test]
    fn test_duplicate_id_rejected() {
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new("ES511", Point::new(0.0, 0.0))).unwrap();
        let err = fc.push(Feature::new("ES511", point!(x: 1.0, y: 1.0))).unwrap_err();
        assert!(matches!(err, Error::DuplicateFeatureId(id) if id == "ES511"));
        assert_eq!(fc.len(), 1);
    }

    #[test]
    fn test_properties() {
        let f = Feature::new("a", Point::new(0.0, 0.0))
            .with_property("score", 0.75)
            .with_property("band", 4u32)
            .with_property("name", "Alto");

        assert_eq!(f.get_f64("score"), Some(0.75));
        assert_eq!(f.get_f64("band"), Some(4.0));
        assert_eq!(f.get_f64("name"), None);
        assert_eq!(f.get_property("name").and_then(|v| v.as_str()), Some("Alto"));
    }

    #[test]
    fn test_lookup_by_id() {
        let fc = FeatureCollection::from_features(
            vec![
                Feature::new("a", Point::new(0.0, 0.0)),
                Feature::new("b", Point::new(1.0, 0.0)),
            ],
            Some(CRS::from_epsg(3035)),
        )
        .unwrap();

        assert!(fc.contains_id("b"));
        assert_eq!(fc.get("b").map(|f| f.id.as_str()), Some("b"));
        assert!(fc.get("c").is_none());
        assert_eq!(fc.crs().and_then(|c| c.epsg()), Some(3035));
    }
}
