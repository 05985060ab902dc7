//! Percentile ranks and equal-count bands

use geofuse_core::{Error, Result};

/// Percentile rank of every value within the population, in [0, 1].
///
/// Ties share their average rank. With 1-based average rank `r` over `n`
/// values the percentile is `(r - 1) / (n - 1)`, so the smallest value maps to
/// 0 and the largest to 1. A population of one (or of identical values) maps
/// to 0.5.
///
/// With `reverse` the result is `1 - rank`, so a higher raw value yields a
/// lower normalized score.
///
/// Values must be finite; the caller filters missing observations out first.
pub fn percentile_ranks(values: &[f64], reverse: bool) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.5; n];
    if n > 1 {
        let span = (n - 1) as f64;
        let mut start = 0;
        while start < n {
            let mut end = start;
            while end + 1 < n && values[order[end + 1]] == values[order[start]] {
                end += 1;
            }
            // Average of 0-based positions start..=end equals (average rank - 1)
            let pct = (start + end) as f64 / 2.0 / span;
            for &idx in &order[start..=end] {
                ranks[idx] = pct;
            }
            start = end + 1;
        }
    }

    if reverse {
        ranks.iter_mut().for_each(|r| *r = 1.0 - *r);
    }
    ranks
}

/// Assign each score to one of `k` equal-count bands, numbered 1..=k.
///
/// Scores are ordered ascending with a stable sort, so exact ties keep their
/// input order. Position `p` (0-based) of `n` gets band `ceil((p + 1) * k / n)`:
/// band sizes differ by at most one and the highest score is always in band
/// `k`. With fewer scores than bands some bands stay empty.
pub fn assign_bands(scores: &[f64], k: u32) -> Result<Vec<u32>> {
    if k == 0 {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: k.to_string(),
            reason: "at least one band is required".into(),
        });
    }

    let n = scores.len() as u64;
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut bands = vec![0u32; scores.len()];
    for (position, &idx) in order.iter().enumerate() {
        let p = position as u64 + 1;
        bands[idx] = ((p * u64::from(k) + n - 1) / n) as u32;
    }
    Ok(bands)
}
