//! The query builders.
//!
//! This module provides a strongly-typed interface for constructing SQL
//! statements without manual string concatenation. Each statement kind
//! (SELECT, INSERT, UPDATE, DELETE) has its own builder with chainable
//! methods; all of them stay declarative until a terminal method executes
//! against the shared [`crate::Database`] handle.
//!
//! Filters are rendered once into [`Filter`] values (SQL fragment plus
//! bound parameters), which keeps composed queries cloneable and lets one
//! specification back several executions.
//!
//! # Submodules
//!
//! - [`clause`] — shared clause types ([`Filter`], [`OrderBy`],
//!   [`Projection`]).
//! - [`select`] — [`SelectQuery`].
//! - [`insert`] — [`InsertQuery`].
//! - [`update`] — [`UpdateQuery`].
//! - [`delete`] — [`DeleteQuery`].

pub mod clause;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use clause::{Filter, OrderBy, Projection, SortDirection};
pub use delete::DeleteQuery;
pub use insert::InsertQuery;
pub use select::SelectQuery;
pub use update::UpdateQuery;
