//! Column transforms used by the feature set
//!
//! Every function returns a vector of the same length as its input, with
//! NaN where the value is undefined (e.g. the first element of a diff).

use crate::data::{mean, sample_std};

/// Difference to the value `lag` steps earlier
pub fn diff(data: &[f64], lag: usize) -> Vec<f64> {
    data.iter()
        .enumerate()
        .map(|(i, &x)| if i >= lag && lag > 0 { x - data[i - lag] } else { f64::NAN })
        .collect()
}

/// Relative change to the previous value, in percent
///
/// A zero previous value yields an infinite or NaN change, which the
/// processor drops together with NaN rows.
pub fn pct_change(data: &[f64]) -> Vec<f64> {
    data.iter()
        .enumerate()
        .map(|(i, &x)| {
            if i == 0 {
                f64::NAN
            } else {
                (x - data[i - 1]) / data[i - 1] * 100.0
            }
        })
        .collect()
}

/// Trailing rolling mean with a minimum window of one
///
/// The first `window - 1` points use the shorter window available.
pub fn rolling_mean_min1(data: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..data.len())
        .map(|i| mean(&data[(i + 1).saturating_sub(window)..=i]))
        .collect()
}

/// Trailing rolling sample std (ddof = 1) with a minimum window of one
///
/// A window holding a single value yields NaN.
pub fn rolling_std_min1(data: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..data.len())
        .map(|i| sample_std(&data[(i + 1).saturating_sub(window)..=i]))
        .collect()
}
