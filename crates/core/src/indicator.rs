//! Indicator observations keyed by region code

use serde::{Deserialize, Serialize};

/// One observation of an indicator: `value` for region `key` in `period`.
///
/// A table holds at most one value per (key, period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub key: String,
    pub value: f64,
    /// Observation period, usually a year. Larger is more recent.
    pub period: i32,
}

impl IndicatorRecord {
    pub fn new(key: impl Into<String>, value: f64, period: i32) -> Self {
        Self {
            key: key.into(),
            value,
            period,
        }
    }
}

/// All observations of one named indicator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorTable {
    pub name: String,
    pub records: Vec<IndicatorRecord>,
}

impl IndicatorTable {
    pub fn new(name: impl Into<String>, records: Vec<IndicatorRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    /// Table from (key, value) pairs that all share one period
    pub fn single_period<K: Into<String>>(
        name: impl Into<String>,
        period: i32,
        values: impl IntoIterator<Item = (K, f64)>,
    ) -> Self {
        let records = values
            .into_iter()
            .map(|(key, value)| IndicatorRecord::new(key, value, period))
            .collect();
        Self::new(name, records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
