//! Validated feature matrix

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1};

/// Feature matrix (rows = observations in time order, columns = named features)
///
/// Always holds at least one row and one column, and only finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    data: Array2<f64>,
}

impl FeatureMatrix {
    /// Wrap an array after checking shape, names and finiteness
    pub fn new(names: Vec<String>, data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(Error::EmptyMatrix { rows, cols });
        }
        if names.len() != cols {
            return Err(Error::ColumnNameMismatch {
                expected: cols,
                found: names.len(),
            });
        }
        if let Some(((row, column), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::NonFiniteValue { row, column });
        }

        Ok(Self { names, data })
    }

    /// Build a matrix from named columns of equal length
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let rows = columns.first().map_or(0, |(_, c)| c.len());
        let cols = columns.len();

        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != rows) {
            return Err(Error::RaggedColumn {
                column: name.clone(),
                expected: rows,
                found: col.len(),
            });
        }

        let data = Array2::from_shape_fn((rows, cols), |(i, j)| columns[j].1[i]);
        let names = columns.into_iter().map(|(name, _)| name).collect();
        Self::new(names, data)
    }

    /// Single-column matrix
    pub fn from_series(name: impl Into<String>, values: &[f64]) -> Result<Self> {
        Self::from_columns(vec![(name.into(), values.to_vec())])
    }

    /// Number of observations
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.column(index)
    }

    /// Get a column by feature name
    pub fn column_by_name(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.data.column(idx))
    }
}
