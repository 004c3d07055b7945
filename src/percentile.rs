//! Nearest-rank percentiles.
//!
//! No interpolation between ranks: the result is always one of the samples.
//! The median uses the same rule instead of averaging the two middle values
//! of an even-length sample.

use crate::models::{PercentileSummary, TipSummary};

/// The `q`-th percentile (`q` in `[0, 1]`, clamped) of `samples`, or `0.0`
/// for an empty sample.
pub fn percentile(samples: &[f64], q: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_of_sorted(&sorted, q)
}

fn percentile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
    let index = ((q * last as f64).round() as usize).min(last);
    sorted[index]
}

pub fn summarize(samples: &[f64]) -> PercentileSummary {
    if samples.is_empty() {
        return PercentileSummary::default();
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    PercentileSummary {
        p50: percentile_of_sorted(&sorted, 0.50),
        p95: percentile_of_sorted(&sorted, 0.95),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        count: sorted.len(),
    }
}

/// Percentiles over tips plus how many of them were exactly zero.
pub fn summarize_tips(tips: &[f64]) -> TipSummary {
    let count_zero = tips.iter().filter(|tip| **tip == 0.0).count();
    let zero_share_pct = if tips.is_empty() {
        0.0
    } else {
        count_zero as f64 / tips.len() as f64 * 100.0
    };
    TipSummary {
        stats: summarize(tips),
        count_zero,
        zero_share_pct,
    }
}
