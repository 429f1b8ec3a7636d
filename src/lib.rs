//! Ensemble Anomaly Detection for Price Candles
//!
//! Flags anomalous candles in a static batch of market data by running
//! several independent detectors over a feature matrix and reconciling
//! their verdicts with a minimum-vote rule.
//!
//! # Modules
//!
//! - `data`: candle structures, CSV/JSON loading, cleaning, statistics
//! - `features`: feature columns and the `FeatureMatrix`
//! - `anomaly`: isolation forest, z-score, IQR and rolling-deviation detectors, voting
//! - `report`: CSV/JSON persistence of detection results
//! - `config`: TOML configuration
//!
//! # Example
//!
//! ```no_run
//! use rust_anomaly_ensemble::anomaly::{run_methods, vote};
//! use rust_anomaly_ensemble::config::DetectionConfig;
//! use rust_anomaly_ensemble::data::{DataLoader, DataProcessor};
//!
//! let candles = DataLoader::load_candles("data/btc_15m.csv").unwrap();
//! let mut processor = DataProcessor::new(candles).unwrap();
//! processor.clean();
//! processor.add_features(&DataProcessor::default_features());
//!
//! let matrix = processor.feature_matrix("close", &[]).unwrap();
//! let config = DetectionConfig::default();
//! let results = run_methods(&matrix, &config).unwrap();
//! let verdict = vote(&results, config.min_votes).unwrap();
//! println!("{} anomalies", verdict.anomaly_count());
//! ```

pub mod anomaly;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod report;

pub use anomaly::*;
pub use config::*;
pub use data::*;
pub use error::{Error, Result};
pub use features::*;
pub use report::*;
