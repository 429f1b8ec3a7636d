//! Rolling deviation anomaly detection
//!
//! Compares each value with the mean and standard deviation of the trailing
//! window ending at that value. Unlike the other detectors the result
//! depends on the order of the observations.

use super::{Detector, DetectorResult, Method};
use crate::error::{Error, Result};
use crate::features::{rolling_mean_min1, rolling_std_min1, FeatureMatrix};

/// Added to the rolling std to keep the deviation finite
pub const DEVIATION_EPSILON: f64 = 1e-8;

/// Rolling deviation detector
#[derive(Clone, Debug)]
pub struct RollingDeviationDetector {
    /// Trailing window size (the first `window - 1` points use a shorter window)
    pub window: usize,
    /// Deviation threshold in rolling standard deviations
    pub threshold: f64,
}

impl RollingDeviationDetector {
    /// Create a new rolling deviation detector
    pub fn new(window: usize, threshold: f64) -> Self {
        Self { window, threshold }
    }

    /// Detect anomalies in a time-ordered series
    pub fn detect_series(&self, data: &[f64]) -> Result<DetectorResult> {
        if self.window == 0 {
            return Err(Error::InvalidParameter(
                "rolling window must be at least 1".to_string(),
            ));
        }

        let means = rolling_mean_min1(data, self.window);
        let stds = rolling_std_min1(data, self.window);

        let scores: Vec<f64> = data
            .iter()
            .zip(means.iter().zip(stds.iter()))
            .map(|(&value, (&mean, &std))| {
                // a one-value window has no spread
                let std = if std.is_nan() { 0.0 } else { std };
                (value - mean).abs() / (std + DEVIATION_EPSILON)
            })
            .collect();

        let is_anomaly: Vec<bool> = scores.iter().map(|&d| d > self.threshold).collect();

        Ok(DetectorResult::new(Method::RollingDeviation, is_anomaly, scores))
    }
}

impl Default for RollingDeviationDetector {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}

impl Detector for RollingDeviationDetector {
    fn method(&self) -> Method {
        Method::RollingDeviation
    }

    /// Runs on the first matrix column (the target series)
    fn detect(&self, matrix: &FeatureMatrix) -> Result<DetectorResult> {
        let series = matrix.column(0).to_vec();
        self.detect_series(&series)
    }
}
