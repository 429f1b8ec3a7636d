//! Column statistics and standardization
//!
//! Shared numeric helpers for the detectors and the data processor.

use log::warn;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Standard deviations below this are treated as zero
pub const MIN_STD: f64 = 1e-10;

/// Arithmetic mean, NaN for empty input
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (ddof = 0)
pub fn population_std(data: &[f64]) -> f64 {
    std_with_ddof(data, 0)
}

/// Sample standard deviation (ddof = 1), NaN for fewer than two values
pub fn sample_std(data: &[f64]) -> f64 {
    std_with_ddof(data, 1)
}

fn std_with_ddof(data: &[f64], ddof: usize) -> f64 {
    if data.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (data.len() - ddof) as f64).sqrt()
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is in percent (0..=100). Matches the default method of numpy's
/// `percentile`. NaN for empty input.
pub fn percentile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, q)
}

/// Same as [`percentile`] for already sorted input
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// First and third quartiles of a column
pub fn quartiles(column: ArrayView1<f64>) -> (f64, f64) {
    let mut sorted: Vec<f64> = column.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    (percentile_sorted(&sorted, 25.0), percentile_sorted(&sorted, 75.0))
}

/// Per-column zero mean / unit variance scaling
///
/// Columns whose population std is below [`MIN_STD`] are only centered.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit per-column statistics
    pub fn fit(data: &Array2<f64>) -> Self {
        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(data.ncols()));
        let mut scale = data.std_axis(Axis(0), 0.0);
        for (j, s) in scale.iter_mut().enumerate() {
            if *s <= MIN_STD {
                warn!("Column {} has no spread, scaling by 1.0", j);
                *s = 1.0;
            }
        }
        Self { mean, scale }
    }

    /// Scale data with the fitted parameters, returning a new matrix
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut result = data.clone();
        for (i, mut col) in result.columns_mut().into_iter().enumerate() {
            let (m, s) = (self.mean[i], self.scale[i]);
            col.mapv_inplace(|x| (x - m) / s);
        }
        result
    }

    /// Fit and transform in one step
    pub fn fit_transform(data: &Array2<f64>) -> Array2<f64> {
        Self::fit(data).transform(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_std_variants() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(mean(&data), 5.0);
        assert_abs_diff_eq!(population_std(&data), 2.0);
        assert_abs_diff_eq!(sample_std(&data), 2.138_089_935, epsilon = 1e-8);
        assert!(sample_std(&[1.0]).is_nan());
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(percentile(&data, 25.0), 1.75);
        assert_abs_diff_eq!(percentile(&data, 75.0), 3.25);
        assert_abs_diff_eq!(percentile(&data, 50.0), 2.5);
        assert_abs_diff_eq!(percentile(&[4.0, 1.0, 3.0, 2.0], 100.0), 4.0);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_scaler_centers_columns() {
        let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let scaled = StandardScaler::fit_transform(&data);
        let mean = scaled.mean_axis(Axis(0)).unwrap();

        assert_abs_diff_eq!(mean[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mean[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled.std_axis(Axis(0), 0.0)[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scaler_constant_column_uses_floor() {
        let data = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let scaler = StandardScaler::fit(&data);
        assert_eq!(scaler.scale[0], 1.0);

        let scaled = scaler.transform(&data);
        assert!(scaled.iter().all(|v| v.is_finite()));
        assert_eq!(scaled[[0, 0]], 0.0);
    }
}
