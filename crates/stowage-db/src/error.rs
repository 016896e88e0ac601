//! Error types for stowage-db.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Database error type for stowage-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("failed to open database at {path}")]
    #[diagnostic(
        code(stowage_db::open),
        help("Check that the database path exists and is writable")
    )]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to apply connection pragma `{pragma}`")]
    #[diagnostic(
        code(stowage_db::pragma),
        help("The underlying SQLite build may not support this pragma")
    )]
    Pragma {
        pragma: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database operation failed: {0}")]
    #[diagnostic(code(stowage_db::sqlite))]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for stowage-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
