//! Data loading and saving utilities
//!
//! Reads already-fetched candles from CSV or JSON files and writes them back.

use super::ohlcv::Candle;
use crate::error::Result;
use csv::{Reader, Writer};
use log::info;
use std::fs::File;
use std::path::Path;

/// Data loader for candle files
pub struct DataLoader;

impl DataLoader {
    /// Load candles from a CSV file
    ///
    /// Expects the header `timestamp,open,high,low,close,volume` with RFC 3339
    /// timestamps. Candles are returned sorted by timestamp.
    pub fn load_candles<P: AsRef<Path>>(path: P) -> Result<Vec<Candle>> {
        let file = File::open(&path)?;
        let mut reader = Reader::from_reader(file);
        let mut candles = Vec::new();

        for result in reader.deserialize() {
            let candle: Candle = result?;
            candles.push(candle);
        }

        candles.sort_by_key(|c| c.timestamp);
        info!("Loaded {} candles from {:?}", candles.len(), path.as_ref());

        Ok(candles)
    }

    /// Save candles to a CSV file
    pub fn save_candles<P: AsRef<Path>>(candles: &[Candle], path: P) -> Result<()> {
        let file = File::create(&path)?;
        let mut writer = Writer::from_writer(file);

        for candle in candles {
            writer.serialize(candle)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load candles from JSON file
    pub fn load_candles_json<P: AsRef<Path>>(path: P) -> Result<Vec<Candle>> {
        let file = File::open(&path)?;
        let mut candles: Vec<Candle> = serde_json::from_reader(file)?;
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    /// Save candles to JSON file
    pub fn save_candles_json<P: AsRef<Path>>(candles: &[Candle], path: P) -> Result<()> {
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, candles)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn sample_candles() -> Vec<Candle> {
        vec![
            Candle::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 15, 0).unwrap(),
                105.0,
                115.0,
                100.0,
                110.0,
                1200.0,
            ),
            Candle::new(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                100.0,
                110.0,
                95.0,
                105.0,
                1000.0,
            ),
        ]
    }

    #[test]
    fn test_save_and_load_candles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candles.csv");

        DataLoader::save_candles(&sample_candles(), &path).unwrap();
        let loaded = DataLoader::load_candles(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        // sorted on load
        assert_eq!(loaded[0].close, 105.0);
        assert_eq!(loaded[1].close, 110.0);
    }

    #[test]
    fn test_load_rfc3339_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(
            &path,
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,100,110,95,105,1000\n\
             2024-01-01T00:15:00+00:00,105,115,100,110,1200\n",
        )
        .unwrap();

        let loaded = DataLoader::load_candles(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].volume, 1200.0);
    }

    #[test]
    fn test_json_round_trip_sorts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candles.json");

        DataLoader::save_candles_json(&sample_candles(), &path).unwrap();
        let loaded = DataLoader::load_candles_json(&path).unwrap();

        assert!(loaded[0].timestamp < loaded[1].timestamp);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DataLoader::load_candles("/nonexistent/candles.csv").unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
