//! GeoJSON feature collections
//!
//! GeoJSON carries no CRS member in RFC 7946; the caller states which CRS the
//! coordinates are in. The feature key comes from a named property (numbers
//! are formatted as text) or, when no key field is given, from the GeoJSON
//! feature id.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Read a GeoJSON FeatureCollection from disk
pub fn read_geojson<P: AsRef<Path>>(
    path: P,
    key_field: Option<&str>,
    crs: Option<CRS>,
) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    debug!("parsing GeoJSON {}", path.as_ref().display());
    parse_geojson(&text, key_field, crs)
}

/// Parse GeoJSON text into a keyed feature collection.
///
/// Features without geometry are skipped with a warning; features without a
/// usable key are an error.
pub fn parse_geojson(text: &str, key_field: Option<&str>, crs: Option<CRS>) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;
    let source = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(Error::GeoJson(
                "expected a Feature or FeatureCollection, found a bare geometry".into(),
            ))
        }
    };

    let mut collection = FeatureCollection::with_crs(crs);
    for (index, feature) in source.into_iter().enumerate() {
        let id = feature_key(&feature, key_field)
            .ok_or_else(|| Error::GeoJson(format!("feature #{} has no key", index)))?;

        let Some(geometry) = feature.geometry else {
            warn!("skipping feature '{}' without geometry", id);
            continue;
        };
        let geometry: geo_types::Geometry<f64> = geometry.value.try_into()?;

        let mut out = Feature::new(id, geometry);
        if let Some(props) = feature.properties {
            for (name, value) in props {
                out.set_property(name, json_to_attribute(value));
            }
        }
        collection.push(out)?;
    }

    Ok(collection)
}

fn feature_key(feature: &geojson::Feature, key_field: Option<&str>) -> Option<String> {
    match key_field {
        Some(field) => match feature.property(field)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        },
        None => match feature.id.as_ref()? {
            Id::String(s) => Some(s.clone()),
            Id::Number(n) => Some(n.to_string()),
        },
    }
}

fn json_to_attribute(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        // Non-finite floats have no JSON representation
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(JsonValue::Null, JsonValue::Number),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

/// Convert a collection into a GeoJSON FeatureCollection.
///
/// The key is written both as the feature id and, when `key_field` is given,
/// as that property.
pub fn to_geojson(collection: &FeatureCollection, key_field: Option<&str>) -> geojson::FeatureCollection {
    let features = collection
        .iter()
        .map(|f| {
            let mut properties: JsonObject = f
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                .collect();
            if let Some(field) = key_field {
                properties.insert(field.to_string(), JsonValue::String(f.id.clone()));
            }

            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                id: Some(Id::String(f.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Write a collection as a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(
    collection: &FeatureCollection,
    path: P,
    key_field: Option<&str>,
) -> Result<()> {
    let fc = to_geojson(collection, key_field);
    let text = serde_json::to_string_pretty(&fc)?;
    fs::write(path.as_ref(), text)?;
    debug!("wrote {} features to {}", collection.len(), path.as_ref().display());
    Ok(())
}
