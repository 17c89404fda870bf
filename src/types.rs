//! # Value and Result-Set Representation
//!
//! This module provides the scalar value type and the column-oriented data
//! grid shared by the whole crate. Values are stored inline using enum
//! variants, mirroring SQLite's storage classes plus an explicit boolean for
//! import type inference.
//!
//! ## Value
//!
//! A closed tagged variant over {null, integer, real, boolean, text, blob}.
//! Keeping the set closed makes the import DDL type mapping an explicit,
//! testable lookup instead of runtime type sniffing:
//!
//! | Variant        | Inferred column type |
//! |----------------|----------------------|
//! | Integer, Real  | REAL                 |
//! | Bool           | INTEGER              |
//! | Text           | TEXT                 |
//! | Blob           | BLOB                 |
//! | Null           | TEXT (fallback)      |
//!
//! ## ResultSet
//!
//! Query output is column-oriented, not row-oriented:
//!
//! ```text
//! ResultSet {
//!     columns: ["id", "name"],            // projection order
//!     values:  { "id" => [1, 2], "name" => ["a", "b"] }
//! }
//! ```
//!
//! Every value column has identical length (the row count). Per-column
//! consumers (charting, pivoting) read a column as one contiguous slice.
//! The same shape serves as the input grid for bulk imports, which makes
//! import/select round-trip comparisons direct equality checks.

use hashbrown::HashMap;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::ToSql;

/// Scalar value crossing the engine boundary in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Bool(bool),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// SQL column type inferred from this value for generated DDL.
    ///
    /// `Null` has no usable sample, so it falls back to TEXT.
    pub fn sql_decl_type(&self) -> &'static str {
        match self {
            Value::Integer(_) | Value::Real(_) => "REAL",
            Value::Bool(_) => "INTEGER",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
            Value::Null => "TEXT",
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// Column-oriented data grid: query output and bulk-import input.
///
/// Invariants: `columns` holds unique names in projection order; every entry
/// in `values` has the same length, which is the row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub values: HashMap<String, Vec<Value>>,
}

impl ResultSet {
    /// Creates an empty grid with the given column names.
    pub fn with_columns(columns: Vec<String>) -> Self {
        let values = columns
            .iter()
            .map(|c| (c.clone(), Vec::new()))
            .collect::<HashMap<_, _>>();
        ResultSet { columns, values }
    }

    /// Number of rows, taken from the first column's value sequence.
    pub fn row_count(&self) -> usize {
        self.columns
            .first()
            .and_then(|c| self.values.get(c))
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Value sequence for one column, in row order.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Appends one row given in `columns` order. Length mismatches are a
    /// programming error on the caller's side.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        for (name, value) in self.columns.iter().zip(row) {
            if let Some(seq) = self.values.get_mut(name) {
                seq.push(value);
            }
        }
    }

    /// Materializes row `idx` in column order.
    pub fn row(&self, idx: usize) -> Vec<Value> {
        self.columns
            .iter()
            .filter_map(|c| self.values.get(c).and_then(|seq| seq.get(idx)).cloned())
            .collect()
    }
}

/// Out-of-band progress notification for a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Percentage completed, 0..=100.
    pub progress: u8,
    /// Progress-counter id the caller registered for this operation.
    pub id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decl_type_lookup() {
        assert_eq!(Value::Integer(1).sql_decl_type(), "REAL");
        assert_eq!(Value::Real(0.5).sql_decl_type(), "REAL");
        assert_eq!(Value::Bool(true).sql_decl_type(), "INTEGER");
        assert_eq!(Value::Text("x".into()).sql_decl_type(), "TEXT");
        assert_eq!(Value::Blob(vec![1]).sql_decl_type(), "BLOB");
        assert_eq!(Value::Null.sql_decl_type(), "TEXT");
    }

    #[test]
    fn test_push_row_keeps_columns_aligned() {
        let mut rs = ResultSet::with_columns(vec!["a".into(), "b".into()]);
        rs.push_row(vec![Value::Integer(1), Value::Text("x".into())]);
        rs.push_row(vec![Value::Integer(2), Value::Text("y".into())]);

        assert_eq!(rs.row_count(), 2);
        assert_eq!(
            rs.column("a").unwrap(),
            &[Value::Integer(1), Value::Integer(2)]
        );
        assert_eq!(rs.row(1), vec![Value::Integer(2), Value::Text("y".into())]);
    }

    #[test]
    fn test_empty_grid_has_zero_rows() {
        assert_eq!(ResultSet::default().row_count(), 0);
        assert!(ResultSet::with_columns(vec!["a".into()]).is_empty());
    }
}
