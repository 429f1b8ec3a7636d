//! OHLCV (Open, High, Low, Close, Volume) data structures
//!
//! Core data structures for representing candlestick data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Calculate the range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Absolute size of the body |close - open|
    pub fn body_size(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Distance from the top of the body to the high
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Distance from the bottom of the body to the low
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// All numeric fields are finite
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }

    /// All prices are strictly positive
    pub fn has_positive_prices(&self) -> bool {
        self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0
    }

    /// Look up a raw column by name
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "volume" => Some(self.volume),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_candle_calculations() {
        let candle = Candle::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            100.0,
            110.0,
            90.0,
            105.0,
            1000.0,
        );

        assert_eq!(candle.range(), 20.0);
        assert_eq!(candle.body_size(), 5.0);
        assert_eq!(candle.upper_shadow(), 5.0);
        assert_eq!(candle.lower_shadow(), 10.0);
        assert!(candle.is_finite());
        assert!(candle.has_positive_prices());
        assert_eq!(candle.field("close"), Some(105.0));
        assert_eq!(candle.field("vwap"), None);
    }

    #[test]
    fn test_invalid_candles() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(!Candle::new(ts, 100.0, f64::NAN, 90.0, 95.0, 1.0).is_finite());
        assert!(!Candle::new(ts, 0.0, 110.0, 90.0, 95.0, 1.0).has_positive_prices());
    }
}
