//! IQR (Interquartile Range) based anomaly detection
//!
//! Detects outliers based on the interquartile range method.
//! Values below Q1 - k*IQR or above Q3 + k*IQR are considered anomalies.

use super::{Detector, DetectorResult, Method};
use crate::data::quartiles;
use crate::error::Result;
use crate::features::FeatureMatrix;
use log::warn;
use ndarray::ArrayView1;

/// Outlier fences of a single column
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Compute fences for a column with the given multiplier
    pub fn from_column(column: ArrayView1<f64>, k: f64) -> Self {
        let (q1, q3) = quartiles(column);
        let iqr = q3 - q1;
        Self {
            q1,
            q3,
            iqr,
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
        }
    }

    /// Value lies strictly outside the fences
    pub fn is_outside(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }

    /// Distance past the violated fence in IQR units
    ///
    /// Zero inside the fences, and zero for a column with IQR = 0.
    pub fn score(&self, value: f64) -> f64 {
        if self.iqr <= 0.0 {
            return 0.0;
        }
        let distance = (self.lower - value).max(value - self.upper).max(0.0);
        distance / self.iqr
    }
}

/// IQR-based anomaly detector
///
/// An observation is anomalous when any feature falls outside its own
/// column's fences. The score is the largest normalized fence distance.
#[derive(Clone, Debug)]
pub struct IqrDetector {
    /// Multiplier for IQR (1.5 for outliers, 3.0 for extreme outliers)
    pub k: f64,
}

impl IqrDetector {
    /// Create a new IQR detector
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    /// Create for extreme outliers (k=3.0)
    pub fn extreme() -> Self {
        Self::new(3.0)
    }

    /// Fences of every matrix column
    pub fn bounds(&self, matrix: &FeatureMatrix) -> Vec<IqrBounds> {
        (0..matrix.ncols())
            .map(|j| IqrBounds::from_column(matrix.column(j), self.k))
            .collect()
    }
}

impl Default for IqrDetector {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl Detector for IqrDetector {
    fn method(&self) -> Method {
        Method::Iqr
    }

    fn detect(&self, matrix: &FeatureMatrix) -> Result<DetectorResult> {
        let n = matrix.nrows();
        let mut is_anomaly = vec![false; n];
        let mut scores = vec![0.0; n];

        for (j, bounds) in self.bounds(matrix).iter().enumerate() {
            if bounds.iqr <= 0.0 {
                warn!("Column {} has zero IQR, scores set to 0", j);
            }
            for (i, &value) in matrix.column(j).iter().enumerate() {
                if bounds.is_outside(value) {
                    is_anomaly[i] = true;
                }
                scores[i] = f64::max(scores[i], bounds.score(value));
            }
        }

        Ok(DetectorResult::new(Method::Iqr, is_anomaly, scores))
    }
}
