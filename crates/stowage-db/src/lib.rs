//! Typed query building and connection management.
//!
//! This crate is the storage seam of the stowage workspace: a minimal
//! query abstraction (filter, order, project, paginate) with SQLite as
//! the shipped backend. The repository and unit-of-work layers in
//! `stowage-core` compose queries exclusively through the types here and
//! never touch SQL text themselves.

pub mod connection;
pub mod error;
pub mod expr;
pub mod helpers;
pub mod macros;
pub mod query;
pub mod traits;

pub use connection::{Database, OpenOptions};
pub use error::{DbError, Result};
pub use expr::Col;
pub use helpers::*;
pub use query::*;
pub use traits::{FromRow, Predicate};
