//! Detect anomalies in a file of price candles
//!
//! Usage: cargo run --bin detect_anomalies -- --input data/btc_15m.csv --min-votes 2

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::info;
use rust_anomaly_ensemble::{
    anomaly::{run_methods, vote, Method},
    config::AppConfig,
    data::{DataLoader, DataProcessor},
    report::{write_report, ResultTable, Summary, FILE_STAMP_FORMAT},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect anomalies in price candles with a detector ensemble")]
struct Args {
    /// Candle CSV file (timestamp,open,high,low,close,volume)
    #[arg(short, long)]
    input: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trading symbol shown in reports
    #[arg(short, long)]
    symbol: Option<String>,

    /// Candle timeframe shown in reports
    #[arg(long)]
    timeframe: Option<String>,

    /// Detection methods: isolation_forest, z_score, iqr, moving_average
    #[arg(short, long, value_delimiter = ',')]
    methods: Option<Vec<Method>>,

    /// Minimum detectors that must agree
    #[arg(long)]
    min_votes: Option<usize>,

    /// Expected anomaly share for the isolation forest
    #[arg(long)]
    contamination: Option<f64>,

    /// Number of isolation trees
    #[arg(long)]
    trees: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Z-score threshold
    #[arg(long)]
    z_threshold: Option<f64>,

    /// IQR multiplier
    #[arg(long)]
    iqr_multiplier: Option<f64>,

    /// Rolling window size
    #[arg(short, long)]
    window: Option<usize>,

    /// Rolling deviation threshold
    #[arg(long)]
    rolling_threshold: Option<f64>,

    /// Directory for result files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show top N anomalies
    #[arg(long, default_value_t = 10)]
    top: usize,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        let detection = &mut config.detection;
        if let Some(methods) = &self.methods {
            detection.methods = methods.clone();
        }
        if let Some(v) = self.min_votes {
            detection.min_votes = v;
        }
        if let Some(v) = self.contamination {
            detection.contamination = v;
        }
        if let Some(v) = self.trees {
            detection.tree_count = v;
        }
        if let Some(v) = self.seed {
            detection.random_seed = v;
        }
        if let Some(v) = self.z_threshold {
            detection.z_threshold = v;
        }
        if let Some(v) = self.iqr_multiplier {
            detection.iqr_multiplier = v;
        }
        if let Some(v) = self.window {
            detection.rolling_window = v;
        }
        if let Some(v) = self.rolling_threshold {
            detection.rolling_threshold = v;
        }
        if let Some(symbol) = &self.symbol {
            config.data.symbol = symbol.clone();
        }
        if let Some(timeframe) = &self.timeframe {
            config.data.timeframe = timeframe.clone();
        }
        if let Some(dir) = &self.output {
            config.output.results_dir = dir.clone();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    config.detection.validate().context("invalid detection settings")?;

    println!("Ensemble Anomaly Detection");
    println!("==========================");
    println!("Symbol: {} ({})", config.data.symbol, config.data.timeframe);
    let names: Vec<&str> = config.detection.methods.iter().map(Method::name).collect();
    println!("Methods: {}", names.join(", "));
    println!("Min votes: {}", config.detection.min_votes);
    println!();

    // Load and prepare
    let candles = DataLoader::load_candles(&args.input)
        .with_context(|| format!("failed to load candles from {}", args.input.display()))?;
    let mut processor = DataProcessor::new(candles).context("input file has no candles")?;
    let removed = processor.clean();
    let dropped = processor.add_features(&config.data.features);
    info!("Removed {} invalid rows, {} rows without features", removed, dropped);

    let stats = processor.statistics();
    println!("Loaded {} candles", stats.total_rows);
    if let Some(range) = &stats.date_range {
        println!(
            "  Period: {} to {} ({} days)",
            range.start.format("%Y-%m-%d %H:%M"),
            range.end.format("%Y-%m-%d %H:%M"),
            range.days
        );
    }
    println!(
        "  Price: {:.2} - {:.2} (mean {:.2})",
        stats.price.min, stats.price.max, stats.price.mean
    );

    let matrix = processor
        .feature_matrix(&config.data.target_column, &config.data.additional_columns)
        .context("failed to build feature matrix")?;
    println!("Feature matrix: {} x {} ({})", matrix.nrows(), matrix.ncols(), matrix.names().join(", "));

    // Detect
    let results = run_methods(&matrix, &config.detection)?;
    let verdict = vote(&results, config.detection.min_votes)?;

    println!("\nResults by method:");
    println!("{:>18} {:>10} {:>10} {:>10}", "Method", "Anomalies", "Rate %", "Max score");
    println!("{}", "-".repeat(51));
    for result in &results {
        println!(
            "{:>18} {:>10} {:>10.2} {:>10.4}",
            result.method.name(),
            result.anomaly_count(),
            result.anomaly_rate() * 100.0,
            result.max_score()
        );
    }

    println!("\nEnsemble (min {} of {} votes):", verdict.min_votes, verdict.detectors);
    println!("  Total anomalies: {}", verdict.anomaly_count());
    println!("  Anomaly rate: {:.2}%", verdict.anomaly_rate() * 100.0);

    let distribution = verdict.vote_distribution();
    if !distribution.is_empty() {
        println!("\nVote reliability:");
        for (votes, count) in &distribution {
            println!("  {}/{} detectors agree: {} anomalies", votes, verdict.detectors, count);
        }
    }

    // Persist
    let table = ResultTable::new(&processor, &results, &verdict)?;
    let summary = Summary::new(
        &config.data.symbol,
        &config.data.timeframe,
        &processor,
        &results,
        &verdict,
    );
    let stamp = Utc::now().format(FILE_STAMP_FORMAT).to_string();
    let files = write_report(&config.output.results_dir, &stamp, &table, &summary)
        .with_context(|| {
            format!("failed to write results to {}", config.output.results_dir.display())
        })?;

    // Strongest agreement first, latest first among equals
    let mut rows = table.anomaly_rows();
    rows.sort_by(|a, b| b.votes.cmp(&a.votes).then(b.index.cmp(&a.index)));

    if !rows.is_empty() {
        println!("\nTop {} anomalies:", args.top.min(rows.len()));
        println!("{:>6} {:>18} {:>12} {:>6}", "Index", "Time", "Close", "Votes");
        println!("{}", "-".repeat(45));
        for row in rows.iter().take(args.top) {
            println!(
                "{:>6} {:>18} {:>12.2} {:>6}",
                row.index,
                row.timestamp.format("%Y-%m-%d %H:%M"),
                row.close,
                row.votes
            );
        }
    }

    println!("\nSaved:");
    println!("  {}", files.all_results.display());
    if let Some(path) = &files.anomalies {
        println!("  {}", path.display());
    }
    println!("  {}", files.summary.display());

    Ok(())
}
