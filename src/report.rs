//! Persistence of detection results
//!
//! Writes the per-candle result table, the ensemble-flagged subset and a
//! JSON summary into a results directory.

use crate::anomaly::{DetectorResult, EnsembleVerdict};
use crate::data::{Candle, ColumnStats, DataProcessor};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Timestamp format used in output file names
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A candle flagged by the ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRow {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub votes: usize,
}

/// Candles, features and detection outcome joined row by row
pub struct ResultTable<'a> {
    candles: &'a [Candle],
    features: Vec<(&'static str, &'a [f64])>,
    results: &'a [DetectorResult],
    verdict: &'a EnsembleVerdict,
}

impl<'a> ResultTable<'a> {
    /// Join processed data with detector results and the verdict
    ///
    /// Every result and the verdict must have one entry per candle.
    pub fn new(
        processor: &'a DataProcessor,
        results: &'a [DetectorResult],
        verdict: &'a EnsembleVerdict,
    ) -> Result<Self> {
        let n = processor.len();

        for result in results {
            if result.len() != n {
                return Err(Error::LengthMismatch {
                    method: result.method.to_string(),
                    expected: n,
                    found: result.len(),
                });
            }
        }
        if verdict.len() != n {
            return Err(Error::LengthMismatch {
                method: "ensemble".to_string(),
                expected: n,
                found: verdict.len(),
            });
        }

        Ok(Self {
            candles: processor.candles(),
            features: processor.features().collect(),
            results,
            verdict,
        })
    }

    fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = ["timestamp", "open", "high", "low", "close", "volume"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(self.features.iter().map(|(name, _)| name.to_string()));
        for result in self.results {
            header.push(format!("{}_anomaly", result.method));
            header.push(format!("{}_score", result.method));
        }
        header.push("ensemble_anomaly".to_string());
        header.push("ensemble_votes".to_string());
        header
    }

    fn record(&self, i: usize) -> Vec<String> {
        let c = &self.candles[i];
        let mut record = vec![
            c.timestamp.to_rfc3339(),
            c.open.to_string(),
            c.high.to_string(),
            c.low.to_string(),
            c.close.to_string(),
            c.volume.to_string(),
        ];
        record.extend(self.features.iter().map(|(_, values)| values[i].to_string()));
        for result in self.results {
            record.push(u8::from(result.is_anomaly[i]).to_string());
            record.push(result.scores[i].to_string());
        }
        record.push(u8::from(self.verdict.is_anomaly[i]).to_string());
        record.push(self.verdict.votes[i].to_string());
        record
    }

    fn write_rows<P: AsRef<Path>>(&self, path: P, rows: &[usize]) -> Result<()> {
        let file = File::create(&path)?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(self.header())?;
        for &i in rows {
            writer.write_record(self.record(i))?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Write every row
    pub fn write_all_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let rows: Vec<usize> = (0..self.candles.len()).collect();
        self.write_rows(path, &rows)
    }

    /// Write only the rows flagged by the ensemble
    pub fn write_anomalies_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_rows(path, &self.verdict.anomaly_indices())
    }

    /// Ensemble-flagged candles in time order
    pub fn anomaly_rows(&self) -> Vec<AnomalyRow> {
        self.verdict
            .anomaly_indices()
            .into_iter()
            .map(|i| AnomalyRow {
                index: i,
                timestamp: self.candles[i].timestamp,
                close: self.candles[i].close,
                votes: self.verdict.votes[i],
            })
            .collect()
    }
}

/// JSON summary of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub generated_at: DateTime<Utc>,
    pub symbol: String,
    pub timeframe: String,
    pub total_candles: usize,
    /// Anomalies flagged by each method on its own
    pub anomaly_counts: BTreeMap<String, usize>,
    /// Anomalies flagged by the ensemble
    pub total_anomalies: usize,
    pub min_votes: usize,
    /// Flagged observations per vote count
    pub vote_distribution: BTreeMap<usize, usize>,
    pub price_stats: ColumnStats,
}

impl Summary {
    pub fn new(
        symbol: &str,
        timeframe: &str,
        processor: &DataProcessor,
        results: &[DetectorResult],
        verdict: &EnsembleVerdict,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            total_candles: processor.len(),
            anomaly_counts: results
                .iter()
                .map(|r| (r.method.to_string(), r.anomaly_count()))
                .collect(),
            total_anomalies: verdict.anomaly_count(),
            min_votes: verdict.min_votes,
            vote_distribution: verdict.vote_distribution(),
            price_stats: processor.statistics().price,
        }
    }

    /// Save to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Paths of the files written by [`write_report`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFiles {
    pub all_results: PathBuf,
    /// Absent when the ensemble flagged nothing
    pub anomalies: Option<PathBuf>,
    pub summary: PathBuf,
}

/// Write the result table, anomaly subset and summary into `dir`
///
/// File names carry `stamp` (see [`FILE_STAMP_FORMAT`]). The directory is
/// created when missing.
pub fn write_report<P: AsRef<Path>>(
    dir: P,
    stamp: &str,
    table: &ResultTable<'_>,
    summary: &Summary,
) -> Result<ReportFiles> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let all_results = dir.join(format!("all_results_{stamp}.csv"));
    table.write_all_csv(&all_results)?;
    info!("Wrote results to {:?}", all_results);

    let anomalies = if summary.total_anomalies > 0 {
        let path = dir.join(format!("anomalies_{stamp}.csv"));
        table.write_anomalies_csv(&path)?;
        info!("Wrote {} anomalies to {:?}", summary.total_anomalies, path);
        Some(path)
    } else {
        None
    };

    let summary_path = dir.join(format!("summary_{stamp}.json"));
    summary.save_json(&summary_path)?;
    info!("Wrote summary to {:?}", summary_path);

    Ok(ReportFiles {
        all_results,
        anomalies,
        summary: summary_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{vote, Method};
    use crate::features::FeatureKind;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn processor(n: usize) -> DataProcessor {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let candles = (0..n)
            .map(|i| {
                let p = 50.0 + i as f64;
                Candle::new(start + Duration::hours(i as i64), p, p + 1.0, p - 1.0, p, 10.0)
            })
            .collect();
        let mut processor = DataProcessor::new(candles).unwrap();
        processor.add_features(&[FeatureKind::BodySize]);
        processor
    }

    fn results(n: usize) -> Vec<DetectorResult> {
        let flags = |idx: &[usize]| (0..n).map(|i| idx.contains(&i)).collect::<Vec<_>>();
        vec![
            DetectorResult::new(Method::ZScore, flags(&[1, 3]), vec![0.5; n]),
            DetectorResult::new(Method::Iqr, flags(&[3]), vec![0.0; n]),
        ]
    }

    #[test]
    fn test_write_report() {
        let processor = processor(5);
        let results = results(5);
        let verdict = vote(&results, 2).unwrap();

        let table = ResultTable::new(&processor, &results, &verdict).unwrap();
        let summary = Summary::new("BTC/USDT", "1h", &processor, &results, &verdict);

        let dir = tempdir().unwrap();
        let files = write_report(dir.path().join("out"), "20240301_000000", &table, &summary).unwrap();

        let all = fs::read_to_string(&files.all_results).unwrap();
        let mut lines = all.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,open,high,low,close,volume,body_size,z_score_anomaly,z_score_score,\
             iqr_anomaly,iqr_score,ensemble_anomaly,ensemble_votes"
        );
        assert_eq!(lines.count(), 5);

        let anomalies = fs::read_to_string(files.anomalies.unwrap()).unwrap();
        assert_eq!(anomalies.lines().count(), 2);
        assert!(anomalies.lines().nth(1).unwrap().ends_with(",1,2"));

        let summary: Summary =
            serde_json::from_reader(File::open(&files.summary).unwrap()).unwrap();
        assert_eq!(summary.total_anomalies, 1);
        assert_eq!(summary.anomaly_counts["z_score"], 2);
        assert_eq!(summary.vote_distribution.get(&2), Some(&1));
    }

    #[test]
    fn test_no_anomaly_file_without_anomalies() {
        let processor = processor(4);
        let results = vec![DetectorResult::new(Method::Iqr, vec![false; 4], vec![0.0; 4])];
        let verdict = vote(&results, 1).unwrap();

        let table = ResultTable::new(&processor, &results, &verdict).unwrap();
        let summary = Summary::new("BTC/USDT", "1h", &processor, &results, &verdict);

        let dir = tempdir().unwrap();
        let files = write_report(dir.path(), "stamp", &table, &summary).unwrap();

        assert!(files.anomalies.is_none());
        assert!(table.anomaly_rows().is_empty());
    }

    #[test]
    fn test_anomaly_rows() {
        let processor = processor(5);
        let results = results(5);
        let verdict = vote(&results, 1).unwrap();
        let table = ResultTable::new(&processor, &results, &verdict).unwrap();

        let rows = table.anomaly_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, 3);
        assert_eq!(rows[1].close, 53.0);
        assert_eq!(rows[1].votes, 2);
    }

    #[test]
    fn test_rejects_misaligned_results() {
        let processor = processor(5);
        let results = results(4);
        let verdict = vote(&results, 1).unwrap();

        assert!(matches!(
            ResultTable::new(&processor, &results, &verdict),
            Err(Error::LengthMismatch { expected: 5, found: 4, .. })
        ));
    }
}
