//! # Database Builder
//!
//! Builder-pattern construction for [`Database`]. The only knob today is the
//! import chunk size; it exists so tests and callers with tiny or huge row
//! sets can tune how many rows share one native transaction.

use super::Database;
use crate::session::DEFAULT_CHUNK_SIZE;

/// Fluent configuration for a [`Database`] facade.
///
/// ```ignore
/// let db = Database::builder().chunk_size(500).build();
/// ```
pub struct DatabaseBuilder {
    chunk_size: usize,
}

impl DatabaseBuilder {
    pub(crate) fn new() -> Self {
        DatabaseBuilder {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Rows per import chunk (one native transaction each). Clamped to at
    /// least 1. Default is 1500.
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows.max(1);
        self
    }

    /// Spawns the worker pair and returns the facade.
    pub fn build(self) -> Database {
        Database::with_chunk_size(self.chunk_size)
    }
}
