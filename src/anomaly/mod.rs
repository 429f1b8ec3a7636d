//! Anomaly detection algorithms
//!
//! This module provides the detectors combined by the ensemble:
//! - Machine learning: Isolation Forest
//! - Statistical: Z-score, IQR
//! - Sequential: rolling deviation from a trailing mean
//! - Ensemble: minimum-vote aggregation of detector labels

mod ensemble;
mod iqr;
mod isolation_forest;
mod rolling;
mod zscore;

pub use ensemble::*;
pub use iqr::*;
pub use isolation_forest::*;
pub use rolling::*;
pub use zscore::*;

use crate::config::DetectionConfig;
use crate::error::{Error, Result};
use crate::features::FeatureMatrix;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available detection methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "isolation_forest")]
    IsolationForest,
    #[serde(rename = "z_score")]
    ZScore,
    #[serde(rename = "iqr")]
    Iqr,
    #[serde(rename = "moving_average", alias = "rolling")]
    RollingDeviation,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::IsolationForest,
        Method::ZScore,
        Method::Iqr,
        Method::RollingDeviation,
    ];

    /// Canonical name used in configs and output columns
    pub fn name(&self) -> &'static str {
        match self {
            Method::IsolationForest => "isolation_forest",
            Method::ZScore => "z_score",
            Method::Iqr => "iqr",
            Method::RollingDeviation => "moving_average",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "isolation_forest" => Ok(Method::IsolationForest),
            "z_score" => Ok(Method::ZScore),
            "iqr" => Ok(Method::Iqr),
            "moving_average" | "rolling" => Ok(Method::RollingDeviation),
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }
}

/// Labels and scores of one detector over a batch
///
/// `is_anomaly` and `scores` are parallel arrays with one entry per
/// observation. Score scale and direction depend on the method and are not
/// comparable across detectors.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorResult {
    pub method: Method,
    pub is_anomaly: Vec<bool>,
    pub scores: Vec<f64>,
}

impl DetectorResult {
    /// Create a new detector result
    pub fn new(method: Method, is_anomaly: Vec<bool>, scores: Vec<f64>) -> Self {
        debug_assert_eq!(is_anomaly.len(), scores.len());
        Self {
            method,
            is_anomaly,
            scores,
        }
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.is_anomaly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_anomaly.is_empty()
    }

    /// Get indices of anomalies
    pub fn anomaly_indices(&self) -> Vec<usize> {
        self.is_anomaly
            .iter()
            .enumerate()
            .filter_map(|(i, &is_anom)| if is_anom { Some(i) } else { None })
            .collect()
    }

    /// Get the number of detected anomalies
    pub fn anomaly_count(&self) -> usize {
        self.is_anomaly.iter().filter(|&&x| x).count()
    }

    /// Get the anomaly rate
    pub fn anomaly_rate(&self) -> f64 {
        if self.is_anomaly.is_empty() {
            0.0
        } else {
            self.anomaly_count() as f64 / self.is_anomaly.len() as f64
        }
    }

    /// Get the maximum score
    pub fn max_score(&self) -> f64 {
        self.scores.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// A detection strategy over a feature matrix
///
/// Implementations are pure: they hold only configuration and never keep
/// state between calls.
pub trait Detector: Send + Sync {
    /// Method implemented by this detector
    fn method(&self) -> Method;

    /// Label and score every observation of the matrix
    fn detect(&self, matrix: &FeatureMatrix) -> Result<DetectorResult>;
}

/// Run the configured methods over a matrix, in configuration order
pub fn run_methods(matrix: &FeatureMatrix, config: &DetectionConfig) -> Result<Vec<DetectorResult>> {
    config.validate()?;

    info!(
        "Running {} detection methods over {} observations",
        config.methods.len(),
        matrix.nrows()
    );

    let mut results = Vec::with_capacity(config.methods.len());
    for &method in &config.methods {
        let result = config.detector(method).detect(matrix)?;
        info!(
            "{}: {} anomalies ({:.2}%)",
            method,
            result.anomaly_count(),
            result.anomaly_rate() * 100.0
        );
        results.push(result);
    }

    Ok(results)
}
