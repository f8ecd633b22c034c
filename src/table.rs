//! In-memory row-major tables of named `f64` columns.
//!
//! A table is the boundary type exchanged with file readers and writers:
//! one row per record, NaN marks a missing value.

use crate::error::{KohonenError, Result};
use crate::norm::ColumnStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A dataset of named float columns stored as a flat row-major array.
///
/// Deserialization goes through [`Table::new`], so a decoded table always
/// has a consistent shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: usize,
    data: Vec<f64>,
}

/// Serialized form of a [`Table`], checked on conversion.
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    rows: usize,
    data: Vec<f64>,
}

impl TryFrom<RawTable> for Table {
    type Error = KohonenError;

    fn try_from(raw: RawTable) -> Result<Self> {
        let table = Table::new(raw.columns, raw.data)?;
        if table.rows != raw.rows {
            return Err(KohonenError::RowMismatch {
                expected: raw.rows,
                found: table.rows,
            });
        }
        Ok(table)
    }
}

impl Table {
    /// Creates a table from column names and row-major data.
    ///
    /// Fails if `data.len()` is not a multiple of the column count.
    pub fn new(columns: Vec<String>, data: Vec<f64>) -> Result<Self> {
        if columns.is_empty() {
            return Err(KohonenError::Config(
                "a table needs at least one column".to_string(),
            ));
        }
        if data.len() % columns.len() != 0 {
            return Err(KohonenError::Shape {
                len: data.len(),
                columns: columns.len(),
            });
        }

        let rows = data.len() / columns.len();
        Ok(Self {
            columns,
            rows,
            data,
        })
    }

    /// Creates a table with all values missing.
    pub fn missing(columns: Vec<String>, rows: usize) -> Result<Self> {
        let len = rows * columns.len();
        Self::new(columns, vec![f64::NAN; len])
    }

    /// Builds a one-hot class table from per-row labels.
    ///
    /// Columns are the distinct labels in sorted order. Unlabeled rows
    /// (`None`) are entirely missing.
    pub fn one_hot<S: AsRef<str>>(labels: &[Option<S>]) -> Result<Self> {
        let classes: BTreeSet<&str> = labels.iter().flatten().map(|l| l.as_ref()).collect();
        if classes.is_empty() {
            return Err(KohonenError::Config(
                "one-hot encoding needs at least one labeled row".to_string(),
            ));
        }
        let columns: Vec<String> = classes.iter().map(|c| c.to_string()).collect();

        let mut table = Self::missing(columns, labels.len())?;
        for (row, label) in labels.iter().enumerate() {
            if let Some(label) = label {
                let hot = table.column_index(label.as_ref()).unwrap_or(0);
                for col in 0..table.column_count() {
                    table.set(row, col, if col == hot { 1.0 } else { 0.0 });
                }
            }
        }

        Ok(table)
    }

    /// Column names, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The flat row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn offset(&self, row: usize, column: usize) -> usize {
        assert!(
            row < self.rows && column < self.columns.len(),
            "cell ({}, {}) outside a {}x{} table",
            row,
            column,
            self.rows,
            self.columns.len()
        );
        row * self.columns.len() + column
    }

    /// Value at a cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell is outside the table.
    #[inline]
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.data[self.offset(row, column)]
    }

    /// Sets the value at a cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell is outside the table.
    #[inline]
    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        let offset = self.offset(row, column);
        self.data[offset] = value;
    }

    /// One row as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows()`.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.columns.len()]
    }

    /// One row as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows()`.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let start = self.offset(row, 0);
        let width = self.columns.len();
        &mut self.data[start..start + width]
    }

    /// True if the row has at least one missing value.
    pub fn has_missing(&self, row: usize) -> bool {
        self.row(row).iter().any(|v| v.is_nan())
    }

    /// True if every value in the row is missing.
    pub fn is_row_missing(&self, row: usize) -> bool {
        self.row(row).iter().all(|v| v.is_nan())
    }

    /// Observed (non-NaN) values of a column.
    fn observed(&self, column: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.rows)
            .map(move |r| self.data[r * self.columns.len() + column])
            .filter(|v| !v.is_nan())
    }
}

impl ColumnStats for Table {
    /// Population mean and standard deviation over observed values; NaN
    /// for a column without observations.
    fn mean_std_dev(&self, column: usize) -> (f64, f64) {
        let (count, sum) = self
            .observed(column)
            .fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
        if count == 0 {
            return (f64::NAN, f64::NAN);
        }
        let mean = sum / count as f64;
        let var = self
            .observed(column)
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / count as f64;
        (mean, var.sqrt())
    }

    /// Minimum and maximum over observed values; NaN for a column without
    /// observations.
    fn range(&self, column: usize) -> (f64, f64) {
        self.observed(column).fold((f64::NAN, f64::NAN), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shape() {
        let t = Table::new(cols(&["a", "b"]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.get(1, 1), 4.0);
        assert_eq!(t.row(2), &[5.0, 6.0]);

        let err = Table::new(cols(&["a", "b"]), vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, KohonenError::Shape { len: 3, columns: 2 }));
        assert!(Table::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let t = Table::new(cols(&["a", "b"]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        // Declared rows disagree with the data.
        let bad = r#"{"columns":["a","b"],"rows":3,"data":[1.0,2.0]}"#;
        assert!(serde_json::from_str::<Table>(bad).is_err());
        // Data does not fill whole rows.
        let ragged = r#"{"columns":["a","b"],"rows":1,"data":[1.0,2.0,3.0]}"#;
        assert!(serde_json::from_str::<Table>(ragged).is_err());
        let no_columns = r#"{"columns":[],"rows":0,"data":[]}"#;
        assert!(serde_json::from_str::<Table>(no_columns).is_err());
    }

    #[test]
    fn test_set_and_missing() {
        let mut t = Table::missing(cols(&["a", "b"]), 2).unwrap();
        assert!(t.is_row_missing(0));
        t.set(0, 1, 3.0);
        assert!(t.has_missing(0));
        assert!(!t.is_row_missing(0));
        t.row_mut(1).copy_from_slice(&[1.0, 2.0]);
        assert!(!t.has_missing(1));
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds() {
        let t = Table::new(cols(&["a"]), vec![1.0]).unwrap();
        t.get(1, 0);
    }

    #[test]
    fn test_stats_skip_missing() {
        let t = Table::new(
            cols(&["a", "b"]),
            vec![1.0, f64::NAN, 3.0, f64::NAN, f64::NAN, f64::NAN, 5.0, f64::NAN],
        )
        .unwrap();
        let (mean, std) = t.mean_std_dev(0);
        assert!((mean - 3.0).abs() < 1e-10);
        assert!((std - (8.0f64 / 3.0).sqrt()).abs() < 1e-10);
        assert_eq!(t.range(0), (1.0, 5.0));

        let (mean, std) = t.mean_std_dev(1);
        assert!(mean.is_nan() && std.is_nan());
        let (lo, hi) = t.range(1);
        assert!(lo.is_nan() && hi.is_nan());
    }

    #[test]
    fn test_one_hot() {
        let labels = vec![Some("cat"), None, Some("dog"), Some("cat")];
        let t = Table::one_hot(&labels).unwrap();
        assert_eq!(t.columns(), &["cat".to_string(), "dog".to_string()]);
        assert_eq!(t.row(0), &[1.0, 0.0]);
        assert!(t.is_row_missing(1));
        assert_eq!(t.row(2), &[0.0, 1.0]);

        let none: Vec<Option<&str>> = vec![None, None];
        assert!(Table::one_hot(&none).is_err());
    }
}
