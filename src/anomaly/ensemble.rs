//! Ensemble anomaly detection
//!
//! Combines the labels of several detectors by counting votes.

use super::DetectorResult;
use crate::error::{Error, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Consolidated verdict of several detectors
///
/// `votes[i]` counts the detectors that flagged observation `i`, and
/// `is_anomaly[i]` holds exactly when `votes[i] >= min_votes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleVerdict {
    pub is_anomaly: Vec<bool>,
    pub votes: Vec<usize>,
    pub min_votes: usize,
    /// Number of detectors that voted
    pub detectors: usize,
}

impl EnsembleVerdict {
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

    /// Number of flagged observations per vote count
    ///
    /// More votes means more detectors agree, i.e. a more reliable anomaly.
    pub fn vote_distribution(&self) -> BTreeMap<usize, usize> {
        let mut distribution = BTreeMap::new();
        for (&votes, &is_anom) in self.votes.iter().zip(&self.is_anomaly) {
            if is_anom {
                *distribution.entry(votes).or_insert(0) += 1;
            }
        }
        distribution
    }
}

/// Combine detector labels with a minimum-vote rule
///
/// Every result must cover the same observations. `min_votes` must lie in
/// `1..=results.len()`; `min_votes = 2` of three detectors asks for a
/// majority. The outcome does not depend on the order of `results`.
pub fn vote(results: &[DetectorResult], min_votes: usize) -> Result<EnsembleVerdict> {
    let first = results.first().ok_or(Error::NoDetectorResults)?;
    let n = first.len();

    if let Some(bad) = results
        .iter()
        .find(|r| r.is_anomaly.len() != n || r.scores.len() != n)
    {
        let found = if bad.is_anomaly.len() != n {
            bad.is_anomaly.len()
        } else {
            bad.scores.len()
        };
        return Err(Error::LengthMismatch {
            method: bad.method.to_string(),
            expected: n,
            found,
        });
    }

    if min_votes == 0 || min_votes > results.len() {
        return Err(Error::InvalidMinVotes {
            min_votes,
            detectors: results.len(),
        });
    }

    let mut votes = vec![0usize; n];
    for result in results {
        for (v, &flagged) in votes.iter_mut().zip(&result.is_anomaly) {
            if flagged {
                *v += 1;
            }
        }
    }

    let is_anomaly: Vec<bool> = votes.iter().map(|&v| v >= min_votes).collect();

    let verdict = EnsembleVerdict {
        is_anomaly,
        votes,
        min_votes,
        detectors: results.len(),
    };

    info!(
        "Ensemble (min_votes={}): {} anomalies from {} detectors",
        min_votes,
        verdict.anomaly_count(),
        results.len()
    );
    for result in results {
        info!("  {}: {}", result.method, result.anomaly_count());
    }

    Ok(verdict)
}
