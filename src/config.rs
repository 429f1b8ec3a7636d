//! Configuration management
//!
//! Detection, data and output settings, loadable from a TOML file. Every
//! field has a default so partial files are accepted.

use crate::anomaly::{
    Detector, IqrDetector, IsolationForest, Method, RollingDeviationDetector, ZScoreDetector,
};
use crate::data::DataProcessor;
use crate::error::{Error, Result};
use crate::features::FeatureKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Detector parameters and the voting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Expected share of anomalies for the isolation forest
    pub contamination: f64,
    /// Number of isolation trees
    pub tree_count: usize,
    /// Seed for every randomized detector
    pub random_seed: u64,
    /// Z-score cutoff in standard deviations
    pub z_threshold: f64,
    /// IQR fence multiplier
    pub iqr_multiplier: f64,
    pub rolling_window: usize,
    pub rolling_threshold: f64,
    /// Detectors that must agree before an observation is anomalous
    pub min_votes: usize,
    /// Detectors to run, in order
    pub methods: Vec<Method>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            tree_count: 100,
            random_seed: 42,
            z_threshold: 3.0,
            iqr_multiplier: 1.5,
            rolling_window: 20,
            rolling_threshold: 2.0,
            min_votes: 2,
            methods: vec![Method::IsolationForest, Method::ZScore, Method::Iqr],
        }
    }
}

impl DetectionConfig {
    /// Check parameter ranges and the voting rule
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(invalid(format!(
                "contamination must be in (0, 1), got {}",
                self.contamination
            )));
        }
        if self.tree_count == 0 {
            return Err(invalid("tree_count must be at least 1".to_string()));
        }
        if !(self.z_threshold > 0.0) {
            return Err(invalid(format!(
                "z_threshold must be positive, got {}",
                self.z_threshold
            )));
        }
        if !(self.iqr_multiplier >= 0.0 && self.iqr_multiplier.is_finite()) {
            return Err(invalid(format!(
                "iqr_multiplier must be non-negative, got {}",
                self.iqr_multiplier
            )));
        }
        if self.rolling_window == 0 {
            return Err(invalid("rolling_window must be at least 1".to_string()));
        }
        if !(self.rolling_threshold > 0.0) {
            return Err(invalid(format!(
                "rolling_threshold must be positive, got {}",
                self.rolling_threshold
            )));
        }
        if self.methods.is_empty() {
            return Err(invalid("at least one method is required".to_string()));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.methods.iter().find(|m| !seen.insert(**m)) {
            return Err(invalid(format!("method {} listed twice", dup)));
        }

        if self.min_votes == 0 || self.min_votes > self.methods.len() {
            return Err(Error::InvalidMinVotes {
                min_votes: self.min_votes,
                detectors: self.methods.len(),
            });
        }

        Ok(())
    }

    /// Build the detector for a method from these parameters
    pub fn detector(&self, method: Method) -> Box<dyn Detector> {
        match method {
            Method::IsolationForest => Box::new(
                IsolationForest::new(self.tree_count, self.contamination)
                    .with_seed(self.random_seed),
            ),
            Method::ZScore => Box::new(ZScoreDetector::new(self.z_threshold)),
            Method::Iqr => Box::new(IqrDetector::new(self.iqr_multiplier)),
            Method::RollingDeviation => Box::new(RollingDeviationDetector::new(
                self.rolling_window,
                self.rolling_threshold,
            )),
        }
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidParameter(message)
}

/// Input data settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Trading pair, used for reporting only
    pub symbol: String,
    /// Candle timeframe, used for reporting only
    pub timeframe: String,
    /// First matrix column
    pub target_column: String,
    /// Further matrix columns (raw fields or feature names)
    pub additional_columns: Vec<String>,
    /// Features derived before building the matrix
    pub features: Vec<FeatureKind>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: "15m".to_string(),
            target_column: "close".to_string(),
            additional_columns: Vec::new(),
            features: DataProcessor::default_features(),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub data: DataConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from file or use default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
