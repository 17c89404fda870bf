//! # Error Taxonomy
//!
//! This module defines `DbError`, the concrete error type that crosses the
//! execution-bridge boundary. Native error objects cannot cross a channel
//! unchanged, so the worker side reconstructs every failure into one of
//! these variants before sending it back; the message text is preserved
//! verbatim.
//!
//! ## Variants
//!
//! - `InvalidArgument`: caller programming error (e.g. missing query string).
//!   Never retried, surfaced immediately.
//! - `Engine`: native SQLite failure (bad SQL, constraint violation, corrupt
//!   image, missing table). The engine's message is carried verbatim.
//! - `Bridge`: correlation or channel-level failure (the worker is gone or
//!   a reply channel closed). Fatal for that call.
//! - `Parse`: DDL text the schema extractor cannot turn into a column list.
//!   Surfaced per table, never a silent omission.
//!
//! ## Integration with eyre
//!
//! Facade APIs return `eyre::Result`; `DbError` implements
//! `std::error::Error`, so `?` converts it into an `eyre::Report` and tests
//! can still downcast to inspect the variant.

use std::fmt;

/// Structured failure reconstructed on the caller side of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    InvalidArgument(String),
    Engine(String),
    Bridge(String),
    Parse(String),
}

impl DbError {
    /// The raw message text, exactly as produced at the failure site.
    pub fn message(&self) -> &str {
        match self {
            DbError::InvalidArgument(m)
            | DbError::Engine(m)
            | DbError::Bridge(m)
            | DbError::Parse(m) => m,
        }
    }
}

impl fmt::Display for DbError {
    // Display prints only the message so the original text survives the
    // wire without accumulating prefixes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for DbError {}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Engine(err.to_string())
    }
}
