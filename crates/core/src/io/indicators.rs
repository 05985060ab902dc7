//! Indicator tables stored as JSON arrays of `{key, value, period}` records

use crate::error::Result;
use crate::indicator::{IndicatorRecord, IndicatorTable};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Raw record as found on disk. Keys may be numeric; values may be null.
#[derive(Debug, Deserialize)]
struct RawRecord {
    key: serde_json::Value,
    value: Option<f64>,
    period: i32,
}

/// Read an indicator table. Records with a null value or an unusable key are
/// dropped as missing observations.
pub fn read_indicator_table<P: AsRef<Path>>(path: P, name: &str) -> Result<IndicatorTable> {
    let file = File::open(path.as_ref())?;
    let raw: Vec<RawRecord> = serde_json::from_reader(BufReader::new(file))?;
    let total = raw.len();

    let records: Vec<IndicatorRecord> = raw
        .into_iter()
        .filter_map(|r| {
            let key = match r.key {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(IndicatorRecord::new(key, r.value?, r.period))
        })
        .collect();

    debug!(
        "indicator '{}': {} of {} records usable from {}",
        name,
        records.len(),
        total,
        path.as_ref().display()
    );
    Ok(IndicatorTable::new(name, records))
}
