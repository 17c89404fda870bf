//! # Engine Session
//!
//! Owns exactly one embedded-engine handle (an in-memory `rusqlite`
//! connection) and implements every operation the execution bridge can ask
//! for: open/replace/close, raw SQL execution returning column-oriented
//! result sets, chunked bulk import with per-chunk transactions and progress
//! emission, and whole-image export.
//!
//! ## Lifecycle
//!
//! ```text
//! Closed ──open(image?)──▶ Open ──close()──▶ Closed
//!            ▲                │
//!            └── open/import replace the live handle, closing it first ──┘
//! ```
//!
//! At most one handle is ever live. `exec` and `import` create a fresh empty
//! handle lazily when none is open. `close` is idempotent.
//!
//! ## Image round-trip
//!
//! `open(Some(bytes))` seeds the in-memory handle from a binary database
//! image; `export` produces one. Both go through the SQLite backup API with
//! a tempfile scratch path; the image is engine-native and opaque, it is
//! round-tripped, never parsed. Exporting a closed session yields an empty
//! image, not an error.
//!
//! ## Import transactions
//!
//! Each chunk's inserts run inside one `BEGIN`/`COMMIT`. A failing chunk is
//! rolled back, but chunks committed before it stay committed: there is no
//! retroactive rollback, and callers wanting to bound an import's duration
//! must do so externally.

use crate::error::DbError;
use crate::statements;
use crate::types::{ProgressEvent, ResultSet, Value};
use rusqlite::backup::Backup;
use rusqlite::{params_from_iter, Connection};
use std::time::Duration;

/// Rows per import chunk when the caller does not configure one.
pub const DEFAULT_CHUNK_SIZE: usize = 1500;

/// Pages copied per backup step during image export/seeding.
const BACKUP_PAGES_PER_STEP: i32 = 64;

/// Single-handle session over the embedded engine.
pub struct EngineSession {
    conn: Option<Connection>,
}

impl Default for EngineSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineSession {
    pub fn new() -> Self {
        EngineSession { conn: None }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens a fresh handle, closing any live one first. With an image, the
    /// new handle is seeded from it; a corrupt image fails with the native
    /// engine message and leaves the session closed.
    pub fn open(&mut self, image: Option<&[u8]>) -> Result<(), DbError> {
        self.close();
        self.conn = Some(Self::fresh_connection(image)?);
        Ok(())
    }

    /// Idempotent; safe to call when already closed.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.close();
        }
    }

    fn fresh_connection(image: Option<&[u8]>) -> Result<Connection, DbError> {
        let mut conn = Connection::open_in_memory()?;
        if let Some(image) = image {
            let scratch = tempfile::NamedTempFile::new()
                .map_err(|e| DbError::Engine(format!("cannot stage database image: {e}")))?;
            std::fs::write(scratch.path(), image)
                .map_err(|e| DbError::Engine(format!("cannot stage database image: {e}")))?;
            let src = Connection::open(scratch.path())?;
            let backup = Backup::new(&src, &mut conn)?;
            backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)?;
        }
        Ok(conn)
    }

    fn handle(&mut self) -> Result<&Connection, DbError> {
        if self.conn.is_none() {
            self.conn = Some(Self::fresh_connection(None)?);
        }
        Ok(self.conn.as_ref().unwrap())
    }

    /// Executes one or more `;`-separated statements in order.
    ///
    /// Only statements producing columns yield a [`ResultSet`]; DDL/DML run
    /// with nothing appended. All result sets return in execution order.
    /// Positional `params` bind to each statement that declares parameters.
    pub fn exec(&mut self, sql: &str, params: &[Value]) -> Result<Vec<ResultSet>, DbError> {
        let conn = self.handle()?;
        if sql.trim().is_empty() {
            return Err(DbError::InvalidArgument(
                "exec: Missing query string".to_string(),
            ));
        }

        let mut results = Vec::new();
        for fragment in statements::split_statements(sql) {
            let mut stmt = conn.prepare(fragment)?;
            let bound: &[Value] = if stmt.parameter_count() > 0 { params } else { &[] };

            if stmt.column_count() > 0 {
                let columns: Vec<String> =
                    stmt.column_names().iter().map(|c| c.to_string()).collect();
                let mut rs = ResultSet::with_columns(columns);
                let ncols = rs.columns.len();

                let mut rows = stmt.query(params_from_iter(bound.iter()))?;
                while let Some(row) = rows.next()? {
                    let mut materialized = Vec::with_capacity(ncols);
                    for i in 0..ncols {
                        materialized.push(Value::from(row.get_ref(i)?));
                    }
                    rs.push_row(materialized);
                }
                results.push(rs);
            } else {
                stmt.execute(params_from_iter(bound.iter()))?;
            }
        }
        Ok(results)
    }

    /// Bulk-imports a column-oriented grid into a newly created table.
    ///
    /// The table is always created from scratch; an existing table of the
    /// same name is an engine error, not suppressed. Emits `progress: 0`
    /// before the first chunk and `round(100 * done/total)` after each
    /// committed chunk; total chunks is `ceil(rows / chunk_size)`.
    pub fn import(
        &mut self,
        table: &str,
        data: &ResultSet,
        progress_id: u64,
        sink: &mut dyn FnMut(ProgressEvent),
        chunk_size: usize,
    ) -> Result<(), DbError> {
        let conn = self.handle()?;
        let chunk_size = chunk_size.max(1);

        conn.execute_batch(&statements::build_create_table(table, data))?;
        let mut insert = conn.prepare(&statements::build_insert(table, &data.columns))?;

        let total_chunks = data.row_count().div_ceil(chunk_size);
        let mut done = 0usize;
        sink(ProgressEvent {
            progress: 0,
            id: progress_id,
        });

        for batch in statements::chunks(data, chunk_size) {
            conn.execute_batch("BEGIN")?;
            let mut failed = None;
            for row in &batch {
                if let Err(e) = insert.execute(params_from_iter(row.iter())) {
                    failed = Some(e);
                    break;
                }
            }
            match failed {
                // earlier chunks stay committed; only this one rolls back
                Some(e) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    return Err(e.into());
                }
                None => conn.execute_batch("COMMIT")?,
            }

            done += 1;
            let progress = (100.0 * done as f64 / total_chunks as f64).round() as u8;
            sink(ProgressEvent {
                progress,
                id: progress_id,
            });
        }
        Ok(())
    }

    /// Binary image of the current handle; an empty image when closed.
    pub fn export(&self) -> Result<Vec<u8>, DbError> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(Vec::new());
        };

        let dir = tempfile::tempdir()
            .map_err(|e| DbError::Engine(format!("cannot stage exported image: {e}")))?;
        let path = dir.path().join("image.db");
        {
            let mut dst = Connection::open(&path)?;
            let backup = Backup::new(conn, &mut dst)?;
            backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)?;
        }
        std::fs::read(&path).map_err(|e| DbError::Engine(format!("cannot read exported image: {e}")))
    }
}
