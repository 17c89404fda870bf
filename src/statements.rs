//! # Statement Builder
//!
//! Pure functions that turn column names and values into safe, correctly
//! quoted DDL and parameterized DML, plus the row-batching and
//! statement-boundary helpers the session layer builds on. Nothing here
//! touches an engine handle; everything is deterministic and unit-tested in
//! isolation.
//!
//! ## Chunking
//!
//! Bulk imports run one native transaction per chunk. `chunks` transposes
//! the column-oriented input into row batches of exactly `chunk_size` rows
//! (the final batch may be shorter), partitioned left to right. The iterator
//! is a pure function of its input: restartable and finite.
//!
//! ## Statement splitting
//!
//! The engine prepares one statement at a time, so multi-statement strings
//! are split on top-level `;` boundaries before execution. Single-quoted
//! strings, double-quoted and backtick identifiers, `--` line comments and
//! `/* */` block comments are opaque to the scan.

use crate::types::{ResultSet, Value};

/// Double-quote-escapes an identifier for embedding in generated SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builds the `CREATE TABLE` statement for a bulk import.
///
/// One SQL type is inferred per column from the first row's value via
/// [`Value::sql_decl_type`]. Zero-row input has no sample to infer from, so
/// every column falls back to TEXT.
pub fn build_create_table(table: &str, data: &ResultSet) -> String {
    let cols = data
        .columns
        .iter()
        .map(|name| {
            let decl_type = data
                .values
                .get(name)
                .and_then(|seq| seq.first())
                .map_or("TEXT", Value::sql_decl_type);
            format!("{} {}", quote_ident(name), decl_type)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("CREATE TABLE {}({})", quote_ident(table), cols)
}

/// Builds a parameterized `INSERT` with one positional placeholder per
/// column.
pub fn build_insert(table: &str, columns: &[String]) -> String {
    let col_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let params = vec!["?"; columns.len()].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        col_list,
        params
    )
}

/// Lazy left-to-right partition of a column-oriented grid into row batches.
///
/// `chunk_size` must be at least 1.
pub fn chunks(data: &ResultSet, chunk_size: usize) -> RowChunks<'_> {
    debug_assert!(chunk_size > 0, "chunk_size must be at least 1");
    RowChunks {
        data,
        chunk_size: chunk_size.max(1),
        next_row: 0,
    }
}

/// Iterator produced by [`chunks`]. Each item is a batch of rows, every row
/// materialized in `columns` order.
pub struct RowChunks<'a> {
    data: &'a ResultSet,
    chunk_size: usize,
    next_row: usize,
}

impl Iterator for RowChunks<'_> {
    type Item = Vec<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.data.row_count();
        if self.next_row >= total {
            return None;
        }
        let end = (self.next_row + self.chunk_size).min(total);
        let batch = (self.next_row..end).map(|i| self.data.row(i)).collect();
        self.next_row = end;
        Some(batch)
    }
}

/// Splits SQL text on top-level statement boundaries.
///
/// Returns trimmed, non-empty fragments in source order, each starting at
/// executable text (leading comments are dropped). The scan tracks quote and
/// comment state so `;` inside a string literal, quoted identifier, or
/// comment never splits.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        // doubled quote is an escape, stay inside
                        if i + 1 < bytes.len() && bytes[i + 1] == quote {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            b';' => {
                let fragment = strip_leading_comments(&sql[start..i]).trim_end();
                if !fragment.is_empty() {
                    statements.push(fragment);
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    let tail = strip_leading_comments(&sql[start.min(sql.len())..]).trim_end();
    if !tail.is_empty() {
        statements.push(tail);
    }
    statements
}

/// Advances past leading whitespace and `--`/`/* */` comments so a fragment
/// starts at its first executable byte.
fn strip_leading_comments(sql: &str) -> &str {
    let bytes = sql.as_bytes();
    let mut i = 0;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if bytes.get(i) == Some(&b'-') && bytes.get(i + 1) == Some(&b'-') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if bytes.get(i) == Some(&b'/') && bytes.get(i + 1) == Some(&b'*') {
            match sql[i + 2..].find("*/") {
                Some(end) => {
                    i += end + 4;
                    continue;
                }
                // unterminated comment swallows the rest
                None => return "",
            }
        }
        return &sql[i..];
    }
}
