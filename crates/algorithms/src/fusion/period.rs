//! Most-recent-period selection.
//!
//! Indicators are published on their own schedules. Each indicator keeps,
//! per key, the value of its latest period; indicators are never aligned to
//! a shared reference period and periods are never averaged.

use geofuse_core::{Error, IndicatorTable, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Latest value per key.
///
/// Non-finite values count as missing observations and are skipped. Two
/// records with the same key and period must agree; a conflicting pair is
/// [`Error::DuplicateObservation`].
pub fn latest_per_key(table: &IndicatorTable) -> Result<BTreeMap<String, f64>> {
    let mut seen: HashMap<(&str, i32), f64> = HashMap::with_capacity(table.len());
    let mut latest: BTreeMap<String, (i32, f64)> = BTreeMap::new();
    let mut missing = 0usize;

    for record in &table.records {
        if !record.value.is_finite() {
            missing += 1;
            continue;
        }

        if let Some(previous) = seen.insert((record.key.as_str(), record.period), record.value) {
            if previous != record.value {
                return Err(Error::DuplicateObservation {
                    indicator: table.name.clone(),
                    key: record.key.clone(),
                    period: record.period,
                });
            }
        }

        latest
            .entry(record.key.clone())
            .and_modify(|(period, value)| {
                if record.period > *period {
                    *period = record.period;
                    *value = record.value;
                }
            })
            .or_insert((record.period, record.value));
    }

    if missing > 0 {
        debug!("indicator '{}': skipped {} non-finite values", table.name, missing);
    }
    Ok(latest.into_iter().map(|(key, (_, value))| (key, value)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofuse_core::IndicatorRecord;

    fn table(records: Vec<IndicatorRecord>) -> IndicatorTable {
        IndicatorTable::new("unemployment", records)
    }

    #[test]
    fn test_keeps_latest_period_per_key() {
        let t = table(vec![
            IndicatorRecord::new("ES51", 10.0, 2021),
            IndicatorRecord::new("ES51", 12.0, 2023),
            IndicatorRecord::new("ES51", 11.0, 2022),
            IndicatorRecord::new("ES52", 8.0, 2019),
        ]);
        let latest = latest_per_key(&t).unwrap();
        assert_eq!(latest.get("ES51"), Some(&12.0));
        // Each key takes its own latest period
        assert_eq!(latest.get("ES52"), Some(&8.0));
    }

    #[test]
    fn test_conflicting_duplicate_is_error() {
        let t = table(vec![
            IndicatorRecord::new("ES51", 10.0, 2020),
            IndicatorRecord::new("ES51", 12.0, 2023),
            IndicatorRecord::new("ES51", 10.5, 2020),
        ]);
        let err = latest_per_key(&t).unwrap_err();
        assert!(matches!(err, Error::DuplicateObservation { period: 2020, .. }));
    }

    #[test]
    fn test_identical_duplicate_is_tolerated() {
        let t = table(vec![
            IndicatorRecord::new("ES51", 10.0, 2020),
            IndicatorRecord::new("ES51", 10.0, 2020),
        ]);
        assert_eq!(latest_per_key(&t).unwrap().get("ES51"), Some(&10.0));
    }

    #[test]
    fn test_non_finite_values_are_missing() {
        let t = table(vec![
            IndicatorRecord::new("ES51", 7.0, 2020),
            IndicatorRecord::new("ES51", f64::NAN, 2023),
            IndicatorRecord::new("ES53", f64::INFINITY, 2023),
        ]);
        let latest = latest_per_key(&t).unwrap();
        assert_eq!(latest.get("ES51"), Some(&7.0));
        assert!(!latest.contains_key("ES53"));
    }
}
