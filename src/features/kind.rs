//! Named candle features

use super::indicators::{diff, pct_change, rolling_std_min1};
use crate::data::Candle;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Window of the close-price volatility feature
pub const VOLATILITY_WINDOW: usize = 20;

/// Lag of the momentum feature
pub const MOMENTUM_PERIOD: usize = 14;

/// Features derivable from a candle sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Absolute close-to-close change
    PriceChange,
    /// Close-to-close change in percent
    PricePctChange,
    /// Volume change in percent
    VolumeChange,
    /// Rolling sample std of the close
    Volatility,
    /// Close change over [`MOMENTUM_PERIOD`] candles
    PriceMomentum,
    /// High minus low
    HighLowRange,
    /// High minus low as percent of low
    HighLowPct,
    /// |close - open|
    BodySize,
    UpperShadow,
    LowerShadow,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 10] = [
        FeatureKind::PriceChange,
        FeatureKind::PricePctChange,
        FeatureKind::VolumeChange,
        FeatureKind::Volatility,
        FeatureKind::PriceMomentum,
        FeatureKind::HighLowRange,
        FeatureKind::HighLowPct,
        FeatureKind::BodySize,
        FeatureKind::UpperShadow,
        FeatureKind::LowerShadow,
    ];

    /// Column name of the feature
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::PriceChange => "price_change",
            FeatureKind::PricePctChange => "price_pct_change",
            FeatureKind::VolumeChange => "volume_change",
            FeatureKind::Volatility => "volatility",
            FeatureKind::PriceMomentum => "price_momentum",
            FeatureKind::HighLowRange => "high_low_range",
            FeatureKind::HighLowPct => "high_low_pct",
            FeatureKind::BodySize => "body_size",
            FeatureKind::UpperShadow => "upper_shadow",
            FeatureKind::LowerShadow => "lower_shadow",
        }
    }

    /// Compute the feature column for a candle sequence
    pub fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        match self {
            FeatureKind::PriceChange => diff(&closes, 1),
            FeatureKind::PricePctChange => pct_change(&closes),
            FeatureKind::VolumeChange => {
                let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
                pct_change(&volumes)
            }
            FeatureKind::Volatility => rolling_std_min1(&closes, VOLATILITY_WINDOW),
            FeatureKind::PriceMomentum => diff(&closes, MOMENTUM_PERIOD),
            FeatureKind::HighLowRange => candles.iter().map(Candle::range).collect(),
            FeatureKind::HighLowPct => candles
                .iter()
                .map(|c| c.range() / c.low * 100.0)
                .collect(),
            FeatureKind::BodySize => candles.iter().map(Candle::body_size).collect(),
            FeatureKind::UpperShadow => candles.iter().map(Candle::upper_shadow).collect(),
            FeatureKind::LowerShadow => candles.iter().map(Candle::lower_shadow).collect(),
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownColumn(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(
                    start + Duration::minutes(15 * i as i64),
                    c - 1.0,
                    c + 2.0,
                    c - 3.0,
                    c,
                    100.0 + i as f64,
                )
            })
            .collect()
    }

    #[test]
    fn test_name_round_trip() {
        for kind in FeatureKind::ALL {
            assert_eq!(kind.name().parse::<FeatureKind>().unwrap(), kind);
        }
        assert!("rsi".parse::<FeatureKind>().is_err());
    }

    #[test]
    fn test_candle_shape_features() {
        let data = candles(&[100.0, 101.0]);
        assert_eq!(FeatureKind::HighLowRange.compute(&data), vec![5.0, 5.0]);
        assert_eq!(FeatureKind::BodySize.compute(&data), vec![1.0, 1.0]);
        assert_eq!(FeatureKind::UpperShadow.compute(&data), vec![2.0, 2.0]);
        assert_eq!(FeatureKind::LowerShadow.compute(&data), vec![2.0, 2.0]);
    }

    #[test]
    fn test_momentum_warmup() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let momentum = FeatureKind::PriceMomentum.compute(&candles(&closes));

        assert!(momentum[..MOMENTUM_PERIOD].iter().all(|v| v.is_nan()));
        assert_eq!(momentum[MOMENTUM_PERIOD], MOMENTUM_PERIOD as f64);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FeatureKind::PricePctChange).unwrap();
        assert_eq!(json, "\"price_pct_change\"");
    }
}
