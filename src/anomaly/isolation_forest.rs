//! Isolation Forest anomaly detection
//!
//! Implements the Isolation Forest algorithm for unsupervised anomaly detection.
//! Key insight: Anomalies are easier to isolate and require fewer splits.

use super::{Detector, DetectorResult, Method};
use crate::data::{percentile, StandardScaler};
use crate::error::{Error, Result};
use crate::features::FeatureMatrix;
use log::debug;
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use rayon::prelude::*;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Smallest batch the forest accepts
pub const MIN_SAMPLES: usize = 3;

/// A node in an isolation tree
#[derive(Debug, Clone)]
enum IsolationNode {
    /// Internal node with split information
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Leaf node with size (number of samples)
    Leaf { size: usize },
}

/// Single isolation tree
#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    /// Build an isolation tree over the given rows of `data`
    fn build(data: &Array2<f64>, indices: &[usize], max_depth: usize, rng: &mut impl Rng) -> Self {
        let root = Self::build_node(data, indices, 0, max_depth, rng);
        Self { root }
    }

    /// Recursively build tree nodes
    fn build_node(
        data: &Array2<f64>,
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut impl Rng,
    ) -> IsolationNode {
        let n_samples = indices.len();

        // Stop conditions: max depth reached or only one sample
        if depth >= max_depth || n_samples <= 1 {
            return IsolationNode::Leaf { size: n_samples };
        }

        // Randomly select a feature
        let feature = rng.gen_range(0..data.ncols());

        let (min_val, max_val) = indices.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &i| (lo.min(data[[i, feature]]), hi.max(data[[i, feature]])),
        );

        // If all values are the same, return leaf
        if (max_val - min_val).abs() < 1e-10 {
            return IsolationNode::Leaf { size: n_samples };
        }

        // Random threshold between min and max
        let threshold = rng.gen_range(min_val..max_val);

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| data[[i, feature]] < threshold);

        // If one side is empty, return leaf
        if left.is_empty() || right.is_empty() {
            return IsolationNode::Leaf { size: n_samples };
        }

        let left = Self::build_node(data, &left, depth + 1, max_depth, rng);
        let right = Self::build_node(data, &right, depth + 1, max_depth, rng);

        IsolationNode::Internal {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Compute path length for a single sample
    fn path_length(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;

        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold { &**left } else { &**right };
                    depth += 1;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation Forest for anomaly detection
///
/// Holds configuration only. Every call to [`Detector::detect`] standardizes
/// the matrix, grows a fresh forest and discards it afterwards, so no fitted
/// state leaks between batches.
///
/// Scores lie in (0, 1]; higher means easier to isolate, i.e. more anomalous.
/// The top `contamination` share of scores is labeled anomalous.
#[derive(Clone, Debug)]
pub struct IsolationForest {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum number of samples per tree
    pub max_samples: usize,
    /// Contamination rate (expected proportion of anomalies)
    pub contamination: f64,
    /// Random seed
    pub seed: u64,
}

impl IsolationForest {
    /// Create a new Isolation Forest
    ///
    /// # Arguments
    /// * `n_estimators` - Number of trees (default: 100)
    /// * `contamination` - Expected anomaly rate (default: 0.05)
    pub fn new(n_estimators: usize, contamination: f64) -> Self {
        Self {
            n_estimators,
            max_samples: 256,
            contamination,
            seed: 42,
        }
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set max samples per tree
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    fn validate(&self, n_samples: usize) -> Result<()> {
        if n_samples < MIN_SAMPLES {
            return Err(Error::InsufficientSamples {
                required: MIN_SAMPLES,
                found: n_samples,
            });
        }
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "contamination must be in (0, 1), got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(Error::InvalidParameter(
                "isolation forest needs at least one tree".to_string(),
            ));
        }
        if self.max_samples < 2 {
            return Err(Error::InvalidParameter(format!(
                "max_samples must be at least 2, got {}",
                self.max_samples
            )));
        }
        Ok(())
    }

    /// Grow the forest on standardized data
    ///
    /// Tree `i` draws from its own generator seeded with `seed + i`, so the
    /// forest does not depend on how rayon schedules the work.
    fn grow(&self, data: &Array2<f64>, sample_size: usize) -> Vec<IsolationTree> {
        let n_samples = data.nrows();
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let indices: Vec<usize> = (0..n_samples).choose_multiple(&mut rng, sample_size);
                IsolationTree::build(data, &indices, max_depth, &mut rng)
            })
            .collect()
    }

    /// Anomaly score of every observation, higher = more anomalous
    pub fn score_samples(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        let n_samples = matrix.nrows();
        self.validate(n_samples)?;

        let scaled = StandardScaler::fit_transform(matrix.data());
        let sample_size = self.max_samples.min(n_samples);
        let trees = self.grow(&scaled, sample_size);
        let norm = average_path_length(sample_size);

        debug!(
            "Grew {} isolation trees on {} of {} samples",
            trees.len(),
            sample_size,
            n_samples
        );

        let scores = (0..n_samples)
            .into_par_iter()
            .map(|i| {
                let row = scaled.row(i);
                let avg_path_length =
                    trees.iter().map(|tree| tree.path_length(row)).sum::<f64>() / trees.len() as f64;

                // Anomaly score: 2^(-E[h(x)] / c(n))
                2.0_f64.powf(-avg_path_length / norm)
            })
            .collect();

        Ok(scores)
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(100, 0.05)
    }
}

impl Detector for IsolationForest {
    fn method(&self) -> Method {
        Method::IsolationForest
    }

    fn detect(&self, matrix: &FeatureMatrix) -> Result<DetectorResult> {
        let scores = self.score_samples(matrix)?;

        let threshold = percentile(&scores, 100.0 * (1.0 - self.contamination));
        let is_anomaly: Vec<bool> = scores.iter().map(|&s| s > threshold).collect();

        debug!("Isolation forest threshold: {:.6}", threshold);

        Ok(DetectorResult::new(Method::IsolationForest, is_anomaly, scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_matrix(seed: u64) -> FeatureMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let n_normal = 198;

        let mut a: Vec<f64> = (0..n_normal).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mut b: Vec<f64> = (0..n_normal).map(|_| rng.gen_range(-1.0..1.0) * 1000.0).collect();

        // Anomalies far from the cluster
        a.extend([10.0, -10.0]);
        b.extend([10_000.0, -10_000.0]);

        FeatureMatrix::from_columns(vec![("a".to_string(), a), ("b".to_string(), b)]).unwrap()
    }

    #[test]
    fn test_isolation_forest_basic() {
        let matrix = clustered_matrix(7);
        let result = IsolationForest::new(100, 0.05).detect(&matrix).unwrap();

        assert_eq!(result.len(), 200);
        assert!(result.is_anomaly[198]);
        assert!(result.is_anomaly[199]);
        assert!(result.scores[198] > result.scores[0]);
        assert!(result.scores.iter().all(|&s| s > 0.0 && s <= 1.0));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let matrix = clustered_matrix(11);
        let forest = IsolationForest::new(50, 0.05).with_seed(123);

        assert_eq!(forest.detect(&matrix).unwrap(), forest.detect(&matrix).unwrap());
    }

    #[test]
    fn test_anomaly_count_tracks_contamination() {
        let matrix = clustered_matrix(3);

        for seed in [1, 2, 3, 42] {
            let result = IsolationForest::new(100, 0.05)
                .with_seed(seed)
                .detect(&matrix)
                .unwrap();
            let count = result.anomaly_count() as i64;
            assert!((count - 10).abs() <= 2, "seed {seed}: {count} anomalies");
        }
    }

    #[test]
    fn test_constant_column_is_harmless() {
        let matrix = FeatureMatrix::from_columns(vec![
            ("flat".to_string(), vec![3.0; 50]),
            ("x".to_string(), (0..50).map(|i| i as f64).collect()),
        ])
        .unwrap();

        let result = IsolationForest::default().detect(&matrix).unwrap();
        assert!(result.scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_rejects_tiny_batches() {
        let matrix = FeatureMatrix::from_series("x", &[1.0, 2.0]).unwrap();
        let err = IsolationForest::default().detect(&matrix).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { required: 3, found: 2 }));
    }

    #[test]
    fn test_rejects_bad_contamination() {
        let matrix = FeatureMatrix::from_series("x", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        for c in [0.0, 1.0, -0.1] {
            let err = IsolationForest::new(10, c).detect(&matrix).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter(_)));
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(10));
    }

    #[test]
    fn test_independent_of_thread_count() {
        let matrix = clustered_matrix(5);
        let forest = IsolationForest::new(100, 0.05).with_seed(9);

        let run = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| forest.detect(&matrix).unwrap())
        };

        assert_eq!(run(1), run(8));
    }

    #[test]
    fn test_subsampled_trees_flag_outliers() {
        let matrix = clustered_matrix(7);
        let result = IsolationForest::new(100, 0.05)
            .with_max_samples(64)
            .detect(&matrix)
            .unwrap();

        assert_eq!(result.len(), 200);
        assert!(result.is_anomaly[198]);
        assert!(result.is_anomaly[199]);
    }

    #[test]
    fn test_rejects_tiny_subsample() {
        let matrix = clustered_matrix(7);
        let err = IsolationForest::default()
            .with_max_samples(1)
            .detect(&matrix)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
