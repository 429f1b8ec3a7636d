//! Candle cleaning and feature enrichment
//!
//! Turns raw candles into a clean, time-ordered table of named columns and
//! extracts the feature matrix handed to the detectors.

use super::ohlcv::Candle;
use super::stats::{mean, sample_std};
use crate::error::{Error, Result};
use crate::features::{FeatureKind, FeatureMatrix};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Time span covered by the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: i64,
}

/// Summary statistics of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub range: f64,
}

impl ColumnStats {
    fn from_values(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            min,
            max,
            mean: mean(values),
            std: sample_std(values),
            range: max - min,
        }
    }
}

/// Overview of the processed data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_rows: usize,
    pub date_range: Option<DateRange>,
    pub price: ColumnStats,
    pub volume: ColumnStats,
}

/// Cleans candles and derives feature columns
///
/// Candles and feature columns always stay row-aligned: dropping a row
/// removes it everywhere.
#[derive(Debug, Clone)]
pub struct DataProcessor {
    candles: Vec<Candle>,
    features: Vec<(FeatureKind, Vec<f64>)>,
}

impl DataProcessor {
    /// Create a processor over a copy of the candles
    pub fn new(candles: Vec<Candle>) -> Result<Self> {
        if candles.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(Self {
            candles,
            features: Vec::new(),
        })
    }

    /// Features added when none are configured
    pub fn default_features() -> Vec<FeatureKind> {
        vec![
            FeatureKind::PriceChange,
            FeatureKind::PricePctChange,
            FeatureKind::VolumeChange,
            FeatureKind::Volatility,
            FeatureKind::PriceMomentum,
        ]
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Names and values of the added feature columns
    pub fn features(&self) -> impl Iterator<Item = (&'static str, &[f64])> {
        self.features.iter().map(|(k, v)| (k.name(), v.as_slice()))
    }

    /// Remove invalid candles
    ///
    /// Drops candles with non-finite fields, non-positive prices and
    /// repeated timestamps (the first occurrence is kept). Returns the number
    /// of removed rows.
    pub fn clean(&mut self) -> usize {
        let initial = self.len();

        let finite: Vec<bool> = self.candles.iter().map(|c| c.is_finite()).collect();
        let dropped = self.retain_rows(&finite);
        if dropped > 0 {
            warn!("Dropped {} candles with missing values", dropped);
        }

        let positive: Vec<bool> = self.candles.iter().map(|c| c.has_positive_prices()).collect();
        let dropped = self.retain_rows(&positive);
        if dropped > 0 {
            warn!("Dropped {} candles with non-positive prices", dropped);
        }

        let mut seen = HashSet::new();
        let unique: Vec<bool> = self
            .candles
            .iter()
            .map(|c| seen.insert(c.timestamp))
            .collect();
        let dropped = self.retain_rows(&unique);
        if dropped > 0 {
            warn!("Dropped {} candles with duplicate timestamps", dropped);
        }

        let removed = initial - self.len();
        info!("Cleaned data: {} rows removed, {} remaining", removed, self.len());
        removed
    }

    /// Compute feature columns and drop rows left undefined
    ///
    /// Rows where any feature is NaN or infinite (diff warm-up, division by a
    /// zero volume) are removed from candles and every column. Returns the
    /// number of removed rows.
    pub fn add_features(&mut self, kinds: &[FeatureKind]) -> usize {
        for &kind in kinds {
            let values = kind.compute(&self.candles);
            match self.features.iter_mut().find(|(k, _)| *k == kind) {
                Some(entry) => entry.1 = values,
                None => self.features.push((kind, values)),
            }
        }

        let keep: Vec<bool> = (0..self.len())
            .map(|i| self.features.iter().all(|(_, col)| col[i].is_finite()))
            .collect();
        let removed = self.retain_rows(&keep);

        info!(
            "Added {} features ({} undefined rows removed, {} remaining)",
            kinds.len(),
            removed,
            self.len()
        );
        removed
    }

    /// Values of a raw candle field or an added feature
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        if let Some((_, values)) = self.features.iter().find(|(k, _)| k.name() == name) {
            return Some(values.clone());
        }
        self.candles.iter().map(|c| c.field(name)).collect()
    }

    /// Summary of the current rows
    pub fn statistics(&self) -> Statistics {
        let closes: Vec<f64> = self.candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = self.candles.iter().map(|c| c.volume).collect();

        let date_range = match (self.candles.first(), self.candles.last()) {
            (Some(first), Some(last)) => Some(DateRange {
                start: first.timestamp,
                end: last.timestamp,
                days: (last.timestamp - first.timestamp).num_days(),
            }),
            _ => None,
        };

        Statistics {
            total_rows: self.len(),
            date_range,
            price: ColumnStats::from_values(&closes),
            volume: ColumnStats::from_values(&volumes),
        }
    }

    /// Build the detector input
    ///
    /// The target column comes first, followed by `additional` in order.
    pub fn feature_matrix(&self, target: &str, additional: &[String]) -> Result<FeatureMatrix> {
        let mut columns = Vec::with_capacity(additional.len() + 1);

        for name in std::iter::once(target).chain(additional.iter().map(String::as_str)) {
            let values = self
                .column(name)
                .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
            columns.push((name.to_string(), values));
        }

        let matrix = FeatureMatrix::from_columns(columns)?;
        info!(
            "Prepared matrix: {} observations x {} features",
            matrix.nrows(),
            matrix.ncols()
        );
        Ok(matrix)
    }

    fn retain_rows(&mut self, keep: &[bool]) -> usize {
        let before = self.candles.len();

        let mut mask = keep.iter();
        self.candles.retain(|_| *mask.next().unwrap_or(&true));
        for (_, col) in &mut self.features {
            let mut mask = keep.iter();
            col.retain(|_| *mask.next().unwrap_or(&true));
        }

        before - self.candles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_candles(n: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let price = 100.0 + (i as f64 * 0.3).sin() * 5.0;
                Candle::new(
                    start + Duration::minutes(15 * i as i64),
                    price - 0.5,
                    price + 1.0,
                    price - 1.0,
                    price,
                    1000.0 + i as f64,
                )
            })
            .collect()
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(DataProcessor::new(vec![]), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_clean_removes_invalid_rows() {
        let mut candles = make_candles(10);
        candles[2].close = f64::NAN;
        candles[4].low = 0.0;
        candles[6].timestamp = candles[5].timestamp;

        let mut processor = DataProcessor::new(candles).unwrap();
        let removed = processor.clean();

        assert_eq!(removed, 3);
        assert_eq!(processor.len(), 7);
    }

    #[test]
    fn test_add_features_drops_warmup_rows() {
        let mut processor = DataProcessor::new(make_candles(50)).unwrap();
        let removed = processor.add_features(&DataProcessor::default_features());

        // price_momentum needs 14 previous closes
        assert_eq!(removed, 14);
        assert_eq!(processor.len(), 36);
        for (_, values) in processor.features() {
            assert_eq!(values.len(), 36);
            assert!(values.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_zero_volume_rows_dropped() {
        let mut candles = make_candles(5);
        candles[1].volume = 0.0;

        let mut processor = DataProcessor::new(candles).unwrap();
        processor.add_features(&[FeatureKind::VolumeChange]);

        // row 0 has no predecessor, row 2 divides by the zero volume
        assert_eq!(processor.len(), 3);
    }

    #[test]
    fn test_feature_matrix_column_order() {
        let mut processor = DataProcessor::new(make_candles(30)).unwrap();
        processor.add_features(&[FeatureKind::PriceChange, FeatureKind::BodySize]);

        let matrix = processor
            .feature_matrix("close", &["volume".to_string(), "price_change".to_string()])
            .unwrap();

        assert_eq!(matrix.names(), &["close", "volume", "price_change"]);
        assert_eq!(matrix.nrows(), 29);

        let err = processor.feature_matrix("close", &["rsi".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnknownColumn(name) if name == "rsi"));
    }

    #[test]
    fn test_statistics() {
        let processor = DataProcessor::new(make_candles(97)).unwrap();
        let stats = processor.statistics();

        assert_eq!(stats.total_rows, 97);
        assert_eq!(stats.date_range.unwrap().days, 1);
        assert!(stats.price.min <= stats.price.mean && stats.price.mean <= stats.price.max);
        assert_eq!(stats.volume.min, 1000.0);
        assert_eq!(stats.volume.max, 1096.0);
    }
}
