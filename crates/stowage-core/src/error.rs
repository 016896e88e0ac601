//! Error types for stowage-core.

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for repository and unit-of-work operations.
///
/// Store-level failures (constraint violations, locking conflicts) pass
/// through unmodified; this layer adds only the sequence-cardinality and
/// staging errors of its own.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("expected at least one matching row, found none")]
    #[diagnostic(
        code(stowage::no_rows),
        help("Use the *_opt variant if an empty result is a valid outcome")
    )]
    NoRows,

    #[error("expected a single matching row, found more than one")]
    #[diagnostic(
        code(stowage::multiple_rows),
        help("Narrow the filter, or use get_first if any match will do")
    )]
    MultipleRows,

    #[error("cannot persist `{table}` row without an identifier")]
    #[diagnostic(
        code(stowage::missing_id),
        help("Assign the entity an id, or stage it as an insert instead")
    )]
    MissingId { table: &'static str },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Db(#[from] stowage_db::DbError),

    #[error("database operation failed: {0}")]
    #[diagnostic(code(stowage::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("background task failed: {0}")]
    #[diagnostic(code(stowage::task))]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias for stowage-core operations.
pub type Result<T> = std::result::Result<T, Error>;
