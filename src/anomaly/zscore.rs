//! Z-Score based anomaly detection
//!
//! Detects anomalies based on how many standard deviations
//! a value is from its column mean.

use super::{Detector, DetectorResult, Method};
use crate::data::MIN_STD;
use crate::error::Result;
use crate::features::FeatureMatrix;
use log::warn;
use ndarray::{Array2, Axis};

/// Global Z-Score detector (uses statistics of the whole batch)
///
/// An observation is anomalous when any of its features lies at least
/// `threshold` population standard deviations from that feature's mean.
/// The score is the largest absolute z-score across features.
#[derive(Clone, Debug)]
pub struct ZScoreDetector {
    /// Threshold in standard deviations
    pub threshold: f64,
}

impl ZScoreDetector {
    /// Create a new Z-Score detector
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Absolute z-score of every cell
    ///
    /// Columns with zero standard deviation score 0 everywhere.
    pub fn compute_zscores(&self, matrix: &FeatureMatrix) -> Array2<f64> {
        let data = matrix.data();
        let mut zscores = data.clone();

        for (j, mut col) in zscores.axis_iter_mut(Axis(1)).enumerate() {
            let n = col.len() as f64;
            let mean = col.sum() / n;
            let std = (col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();

            if std > MIN_STD {
                col.mapv_inplace(|x| (x - mean).abs() / std);
            } else {
                warn!("Column {} has zero variance, z-scores set to 0", j);
                col.fill(0.0);
            }
        }

        zscores
    }
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl Detector for ZScoreDetector {
    fn method(&self) -> Method {
        Method::ZScore
    }

    fn detect(&self, matrix: &FeatureMatrix) -> Result<DetectorResult> {
        let zscores = self.compute_zscores(matrix);

        let scores: Vec<f64> = zscores
            .rows()
            .into_iter()
            .map(|row| row.iter().copied().fold(0.0, f64::max))
            .collect();

        // OR across features: the worst feature decides
        let is_anomaly: Vec<bool> = scores.iter().map(|&s| s >= self.threshold).collect();

        Ok(DetectorResult::new(Method::ZScore, is_anomaly, scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_spike_flagged() {
        let mut values = vec![10.0; 9];
        values.push(100.0);
        let matrix = FeatureMatrix::from_series("close", &values).unwrap();

        let result = ZScoreDetector::new(3.0).detect(&matrix).unwrap();

        assert_eq!(result.anomaly_indices(), vec![9]);
        assert!((result.scores[9] - 3.0).abs() < 1e-12);
        assert!((result.scores[0] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_any_column_triggers() {
        let mut quiet: Vec<f64> = (0..50).map(|i| (i % 5) as f64).collect();
        let mut loud = quiet.clone();
        loud[20] = 1000.0;
        quiet.reverse();

        let matrix = FeatureMatrix::from_columns(vec![
            ("quiet".to_string(), quiet),
            ("loud".to_string(), loud),
        ])
        .unwrap();

        let result = ZScoreDetector::default().detect(&matrix).unwrap();
        assert_eq!(result.anomaly_indices(), vec![20]);
    }

    #[test]
    fn test_constant_column_scores_zero() {
        let matrix = FeatureMatrix::from_series("flat", &[5.0; 100]).unwrap();
        let result = ZScoreDetector::default().detect(&matrix).unwrap();

        assert_eq!(result.anomaly_count(), 0);
        assert!(result.scores.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_deterministic() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64).collect();
        let matrix = FeatureMatrix::from_series("x", &values).unwrap();
        let detector = ZScoreDetector::new(1.5);

        assert_eq!(detector.detect(&matrix).unwrap(), detector.detect(&matrix).unwrap());
    }
}
