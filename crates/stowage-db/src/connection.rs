//! Database connection management.
//!
//! A [`Database`] is a cheaply cloneable handle to a single SQLite
//! connection. Every query builder and repository in the workspace goes
//! through this handle; the connection itself is serialized behind a mutex,
//! matching the one-unit-of-work-per-logical-thread model.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DbError, Result};

/// Connection settings applied when opening a database.
///
/// Deserializable so it can live inside an application's configuration
/// file. All fields have conservative defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Use write-ahead logging. Ignored for in-memory databases.
    pub wal: bool,

    /// Enforce foreign key constraints.
    pub foreign_keys: bool,

    /// How long a writer waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            wal: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
        }
    }
}

/// Shared handle to an open SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (creating if necessary) a database file and applies the
    /// connection pragmas from `options`.
    pub fn open<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DbError::Open {
            path: PathBuf::from(path),
            source,
        })?;

        if options.wal {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|source| DbError::Pragma {
                    pragma: "journal_mode",
                    source,
                })?;
        }
        if options.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(|source| DbError::Pragma {
                    pragma: "foreign_keys",
                    source,
                })?;
        }
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))
            .map_err(|source| DbError::Pragma {
                pragma: "busy_timeout",
                source,
            })?;

        debug!(path = %path.display(), "opened database");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory database. Used by tests and tooling.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Wraps an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Locks and returns the underlying connection.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Runs a batch of semicolon-separated statements.
    ///
    /// Used for schema setup and for transaction control
    /// (`BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK`).
    pub fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn().execute_batch(sql)
    }
}
