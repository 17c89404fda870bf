//! # sqldeck - Embedded SQL Execution Core
//!
//! sqldeck is the execution layer of a SQL workbench: it owns an in-process
//! SQLite instance, executes arbitrary SQL against it, extracts schema
//! metadata by parsing DDL, and performs bulk tabular imports with progress
//! feedback and chunked transactions.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sqldeck::{Database, ResultSet, Value};
//!
//! let db = Database::new();
//! db.load_db(None, Some("scratch"))?;
//!
//! db.execute("CREATE TABLE users (id integer, name text)")?;
//! db.execute("INSERT INTO users VALUES (1, 'Alice')")?;
//! db.refresh_schema()?;
//!
//! let rows = db.execute("SELECT name FROM users")?;
//! assert_eq!(rows.column("name").unwrap().len(), 1);
//!
//! let image = db.export()?;          // opaque SQLite image
//! db.load_db(Some(image), None)?;    // round-trips losslessly
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Database (facade)            │  schema cache, progress registry
//! ├─────────────────────────────────────┤
//! │        Bridge (message passing)     │  correlation ids, worker thread
//! ├─────────────────────────────────────┤
//! │        EngineSession                │  one live handle, exec/import
//! ├───────────────────┬─────────────────┤
//! │ Statement Builder │ Schema Extractor│  pure: DDL/DML text, DDL parsing
//! ├───────────────────┴─────────────────┤
//! │        SQLite (rusqlite, in-memory) │
//! └─────────────────────────────────────┘
//! ```
//!
//! The session runs on a dedicated worker thread; callers talk to it only
//! through the bridge's request/reply protocol, so there is no shared
//! mutable state apart from the id-keyed progress registry. Result sets are
//! column-oriented (`columns` in projection order, one value sequence per
//! column), a deliberate contract that keeps per-column consumers like
//! charting simple.
//!
//! ## Module Overview
//!
//! - [`database`]: caller-facing facade and builder
//! - [`bridge`]: request/reply protocol with the worker thread
//! - [`session`]: single-handle engine session (exec, import, export)
//! - [`schema`]: tolerant DDL-to-columns extractor
//! - [`statements`]: DDL/DML text generation, chunking, statement splitting
//! - [`types`]: scalar values and column-oriented grids
//! - [`error`]: the `DbError` taxonomy crossing the bridge

pub mod bridge;
pub mod database;
pub mod error;
pub mod schema;
pub mod session;
pub mod statements;
pub mod types;

pub use bridge::{Action, Bridge, Payload, ProgressHandler};
pub use database::{Database, DatabaseBuilder, DbMeta, CATALOG_SQL};
pub use error::DbError;
pub use schema::{extract_columns, Column, TableSchema};
pub use session::{EngineSession, DEFAULT_CHUNK_SIZE};
pub use types::{ProgressEvent, ResultSet, Value};
