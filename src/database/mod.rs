//! # Database Facade
//!
//! The object callers hold. It composes the execution bridge with schema
//! caching and the progress-counter registry, and is the only public surface
//! UI collaborators consume: open a database from bytes, execute SQL and get
//! a typed result set back, bulk-import tabular data with a progress
//! callback, export the current database to bytes, and query the current
//! schema.
//!
//! ## Schema cache
//!
//! `load_db`, `import_db` and `refresh_schema` populate the cached
//! descriptor by querying the catalog and parsing each table's DDL. The
//! cache is stale-safe only until the next DDL-mutating `execute`; callers
//! are responsible for calling `refresh_schema` after executing DDL.
//!
//! ## Concurrency
//!
//! All methods take `&self`; a facade can be shared across threads. Requests
//! are processed strictly in send order, and each call resolves with its own
//! result. Callers sharing one facade still race for the single engine
//! handle: `open`/`import` from one caller invalidates another's in-flight
//! session state. That is an accepted single-writer constraint, not a bug.
//!
//! ## Multi-statement policy
//!
//! `execute` returns only the **last** result set when several statements
//! are chained in one string. Callers wanting every result must split the
//! statements themselves. This mirrors the long-standing behavior of the
//! surrounding application and is preserved deliberately.

mod builder;

pub use builder::DatabaseBuilder;

use crate::bridge::{Action, Bridge, Payload};
use crate::error::DbError;
use crate::schema::{extract_columns, TableSchema};
use crate::statements::quote_ident;
use crate::types::{ResultSet, Value};
use eyre::{bail, Result, WrapErr};
use parking_lot::Mutex;

/// Catalog query listing user tables and their DDL.
pub const CATALOG_SQL: &str =
    "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'";

/// Database name used when the caller supplies none.
const DEFAULT_DB_NAME: &str = "database";

/// Name and schema descriptor of the currently open database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbMeta {
    pub name: String,
    pub schema: Vec<TableSchema>,
}

/// Caller-facing handle over one embedded-database session.
pub struct Database {
    bridge: Bridge,
    chunk_size: usize,
    name: Mutex<Option<String>>,
    schema: Mutex<Option<Vec<TableSchema>>>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Opens a facade with default configuration and a fresh worker.
    pub fn new() -> Database {
        Database::builder().build()
    }

    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn with_chunk_size(chunk_size: usize) -> Database {
        Database {
            bridge: Bridge::spawn(),
            chunk_size,
            name: Mutex::new(None),
            schema: Mutex::new(None),
        }
    }

    /// Name of the currently open database, if one was loaded.
    pub fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    /// Cached schema descriptor from the last load/import/refresh.
    pub fn schema(&self) -> Option<Vec<TableSchema>> {
        self.schema.lock().clone()
    }

    /// Opens a database, optionally seeded from an exported binary image.
    ///
    /// `name` defaults to `"database"`. Fails with the engine's message when
    /// the image is corrupt, or with a parse error when a table's DDL cannot
    /// be interpreted.
    pub fn load_db(&self, image: Option<Vec<u8>>, name: Option<&str>) -> Result<DbMeta> {
        match self.bridge.call(Action::Open { image })? {
            Payload::Opened => {}
            other => bail!("mismatched bridge reply: {other:?}"),
        }

        let schema = self.query_schema()?;
        let name = name.unwrap_or(DEFAULT_DB_NAME).to_string();
        *self.name.lock() = Some(name.clone());
        *self.schema.lock() = Some(schema.clone());
        Ok(DbMeta { name, schema })
    }

    /// Executes SQL and returns the last statement's result set (an empty
    /// one when no statement produced columns).
    pub fn execute(&self, sql: &str) -> Result<ResultSet> {
        self.execute_with(sql, &[])
    }

    /// Like [`execute`](Self::execute), binding positional parameters to
    /// each statement that declares them.
    pub fn execute_with(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let mut results = self.exec_all(sql, params)?;
        Ok(results.pop().unwrap_or_default())
    }

    fn exec_all(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultSet>, DbError> {
        match self.bridge.call(Action::Exec {
            sql: sql.to_string(),
            params: params.to_vec(),
        })? {
            Payload::Results(results) => Ok(results),
            other => Err(DbError::Bridge(format!("mismatched bridge reply: {other:?}"))),
        }
    }

    /// Bulk-imports a column-oriented grid as a new table, then re-derives
    /// the schema exactly like [`load_db`](Self::load_db).
    ///
    /// Progress events tagged with `progress_id` are delivered to the
    /// matching registered counter while the import runs.
    pub fn import_db(&self, table: &str, data: ResultSet, progress_id: u64) -> Result<DbMeta> {
        match self.bridge.call(Action::Import {
            table: table.to_string(),
            data,
            progress_id,
            chunk_size: self.chunk_size,
        })? {
            Payload::Imported => {}
            other => bail!("mismatched bridge reply: {other:?}"),
        }

        let schema = self.query_schema()?;
        let name = self
            .name
            .lock()
            .get_or_insert_with(|| DEFAULT_DB_NAME.to_string())
            .clone();
        *self.schema.lock() = Some(schema.clone());
        Ok(DbMeta { name, schema })
    }

    /// Binary image of the current database; empty when nothing is open.
    /// The image is engine-native and opaque; round-trip it, don't parse.
    pub fn export(&self) -> Result<Vec<u8>> {
        match self.bridge.call(Action::Export)? {
            Payload::Image(image) => Ok(image),
            other => bail!("mismatched bridge reply: {other:?}"),
        }
    }

    /// Re-runs the catalog query and updates the cached descriptor. Call
    /// after any DDL-mutating `execute`.
    pub fn refresh_schema(&self) -> Result<()> {
        let schema = self.query_schema()?;
        *self.schema.lock() = Some(schema);
        Ok(())
    }

    fn query_schema(&self) -> Result<Vec<TableSchema>> {
        let catalog = self
            .exec_all(CATALOG_SQL, &[])
            .wrap_err("catalog query failed")?
            .pop()
            .unwrap_or_default();

        let mut schema = Vec::with_capacity(catalog.row_count());
        for i in 0..catalog.row_count() {
            let row = catalog.row(i);
            let name = match row.first() {
                Some(Value::Text(name)) => name.clone(),
                other => bail!("unexpected catalog name entry: {other:?}"),
            };
            let ddl = match row.get(1) {
                Some(Value::Text(ddl)) => ddl.clone(),
                other => {
                    return Err(DbError::Parse(format!(
                        "catalog entry for table {name} has no DDL: {other:?}"
                    ))
                    .into())
                }
            };
            let columns = extract_columns(&ddl)
                .wrap_err_with(|| format!("cannot parse schema of table {name}"))?;
            schema.push(TableSchema { name, columns });
        }
        Ok(schema)
    }

    /// Registers a progress handler; returns the id to pass to
    /// [`import_db`](Self::import_db).
    ///
    /// The handler runs on the bridge's dispatcher thread and must not
    /// create or delete counters from within the callback.
    pub fn create_progress_counter(&self, handler: impl FnMut(u8) + Send + 'static) -> u64 {
        self.bridge.create_progress_counter(handler)
    }

    /// Removes a counter once its operation is done; later events for the
    /// id are dropped.
    pub fn delete_progress_counter(&self, id: u64) {
        self.bridge.delete_progress_counter(id);
    }

    /// Tears down the worker. Idempotent; subsequent calls on this facade
    /// fail with a bridge error.
    pub fn shut_down(&self) {
        self.bridge.shut_down();
    }

    /// Checks that `name` is usable as a table name: no `sqlite_` prefix,
    /// word characters only, no leading digit, and actually creatable
    /// (proven inside a rolled-back transaction).
    pub fn validate_table_name(&self, name: &str) -> Result<()> {
        if name.starts_with("sqlite_") {
            bail!("Table name can't start with sqlite_");
        }
        if name.chars().any(|c| !c.is_ascii_alphanumeric() && c != '_') {
            bail!("Table name can contain only letters, digits and underscores");
        }
        if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            bail!("Table name can't start with a digit");
        }
        let probe = format!("BEGIN; CREATE TABLE {}(id); ROLLBACK;", quote_ident(name));
        if let Err(e) = self.execute(&probe) {
            // a failed CREATE leaves the probe transaction open
            let _ = self.execute("ROLLBACK");
            return Err(e);
        }
        Ok(())
    }

    /// Rewrites an arbitrary label into a valid table name: non-word
    /// characters become `_`, a leading digit gets a `_` prefix, runs of
    /// `_` collapse.
    pub fn sanitize_table_name(raw: &str) -> String {
        let replaced: String = raw
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let mut out = String::with_capacity(replaced.len() + 1);
        if replaced.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            out.push('_');
        }
        let mut prev_underscore = false;
        for c in replaced.chars() {
            if c == '_' && prev_underscore {
                continue;
            }
            prev_underscore = c == '_';
            out.push(c);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_and_collapses() {
        assert_eq!(Database::sanitize_table_name("2 my.table"), "_2_my_table");
        assert_eq!(Database::sanitize_table_name("a  b"), "a_b");
        assert_eq!(Database::sanitize_table_name("clean_name"), "clean_name");
    }
}
