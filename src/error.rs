//! Error types for the anomaly detection library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
///
/// Degenerate statistics (zero-variance or zero-IQR columns) are never
/// reported here; detectors absorb them with a fallback.
#[derive(Error, Debug)]
pub enum Error {
    /// No candles were supplied
    #[error("Input contains no candles")]
    EmptyInput,

    /// Feature matrix has no rows or no columns
    #[error("Feature matrix is empty ({rows} rows x {cols} columns)")]
    EmptyMatrix { rows: usize, cols: usize },

    /// Feature matrix holds a NaN or infinite value
    #[error("Non-finite value at row {row}, column {column}")]
    NonFiniteValue { row: usize, column: usize },

    /// Column names do not match the matrix width
    #[error("Expected {expected} column names, got {found}")]
    ColumnNameMismatch { expected: usize, found: usize },

    /// Column length differs from the first column
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Requested column does not exist
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Not enough observations for the detector
    #[error("Insufficient samples: need at least {required}, got {found}")]
    InsufficientSamples { required: usize, found: usize },

    /// Parameter outside its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// min_votes outside 1..=detectors
    #[error("min_votes must be between 1 and {detectors}, got {min_votes}")]
    InvalidMinVotes { min_votes: usize, detectors: usize },

    /// Detector results disagree on the observation count
    #[error("Detector '{method}' returned {found} observations, expected {expected}")]
    LengthMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    /// Voting was requested without any detector results
    #[error("No detector results to combine")]
    NoDetectorResults,

    /// Detection method name not recognized
    #[error("Unsupported detection method: {0}")]
    UnknownMethod(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Whether the error comes from caller input rather than I/O
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Error::Io(_) | Error::Csv(_) | Error::Json(_) | Error::TomlDe(_) | Error::TomlSer(_)
        )
    }
}
