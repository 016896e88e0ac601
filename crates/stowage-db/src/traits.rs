//! Core traits that power the query builder.
//!
//! These traits define the contract for:
//! - Converting database rows into Rust types (`FromRow`)
//! - Building SQL filter expressions (`Predicate`)

use rusqlite::{types::Value, Row};

use crate::expr::ops::{CmpOp, Compare, Connective, InList, IsNull, Like, Logic};

/// A trait for types that can be rendered into a SQL condition.
///
/// Implementors include [`crate::expr::Col`] (a typed column) and the
/// compound operator types in [`crate::expr::ops`]. The combinator methods
/// (`eq`, `like`, `and`, ...) build an expression tree which is rendered
/// once, up front, into a [`crate::query::Filter`] — a SQL fragment with
/// `?` placeholders plus its bound parameters.
///
/// # Example
///
/// ```rust
/// use stowage_db::expr::Col;
/// use stowage_db::Predicate as _;
///
/// let col = Col::<String>::new("name");
/// let expr = col.eq("User".to_string());
/// let mut params = vec![];
/// let sql = expr.render(&mut params); // sql = "name = ?", one bound parameter
/// assert_eq!(sql, "name = ?");
/// ```
pub trait Predicate: Send {
    /// Renders this expression into a SQL fragment, appending bound
    /// parameter values to `params`.
    fn render(&self, params: &mut Vec<Value>) -> String;

    /// Creates a SQL `=` condition.
    fn eq<V: Into<Value>>(self, value: V) -> Compare<Self>
    where
        Self: Sized,
    {
        Compare::new(self, CmpOp::Eq, value.into())
    }

    /// Creates a SQL `!=` condition.
    fn ne<V: Into<Value>>(self, value: V) -> Compare<Self>
    where
        Self: Sized,
    {
        Compare::new(self, CmpOp::Ne, value.into())
    }

    /// Creates a SQL `>` condition.
    fn gt<V: Into<Value>>(self, value: V) -> Compare<Self>
    where
        Self: Sized,
    {
        Compare::new(self, CmpOp::Gt, value.into())
    }

    /// Creates a SQL `<` condition.
    fn lt<V: Into<Value>>(self, value: V) -> Compare<Self>
    where
        Self: Sized,
    {
        Compare::new(self, CmpOp::Lt, value.into())
    }

    /// Creates a SQL `>=` condition.
    fn gte<V: Into<Value>>(self, value: V) -> Compare<Self>
    where
        Self: Sized,
    {
        Compare::new(self, CmpOp::Gte, value.into())
    }

    /// Creates a SQL `<=` condition.
    fn lte<V: Into<Value>>(self, value: V) -> Compare<Self>
    where
        Self: Sized,
    {
        Compare::new(self, CmpOp::Lte, value.into())
    }

    /// Creates a SQL `LIKE '%pattern%'` condition.
    fn like(self, pattern: impl Into<String>) -> Like<Self>
    where
        Self: Sized,
    {
        Like::new(self, pattern.into(), false)
    }

    /// Creates a case-insensitive `LIKE` condition.
    fn ilike(self, pattern: impl Into<String>) -> Like<Self>
    where
        Self: Sized,
    {
        Like::new(self, pattern.into(), true)
    }

    /// Creates a SQL `IN` condition.
    fn is_in<V, I>(self, values: I) -> InList<Self>
    where
        Self: Sized,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        InList::new(self, values.into_iter().map(Into::into).collect(), false)
    }

    /// Creates a SQL `NOT IN` condition.
    fn not_in<V, I>(self, values: I) -> InList<Self>
    where
        Self: Sized,
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        InList::new(self, values.into_iter().map(Into::into).collect(), true)
    }

    /// Creates a SQL `IS NULL` condition.
    fn is_null(self) -> IsNull<Self>
    where
        Self: Sized,
    {
        IsNull::new(self, false)
    }

    /// Creates a SQL `IS NOT NULL` condition.
    fn is_not_null(self) -> IsNull<Self>
    where
        Self: Sized,
    {
        IsNull::new(self, true)
    }

    /// Combines two conditions with `AND`.
    fn and<P: Predicate>(self, other: P) -> Connective<Self, P>
    where
        Self: Sized,
    {
        Connective::new(self, other, Logic::And)
    }

    /// Combines two conditions with `OR`.
    fn or<P: Predicate>(self, other: P) -> Connective<Self, P>
    where
        Self: Sized,
    {
        Connective::new(self, other, Logic::Or)
    }
}

/// A trait for types that can be constructed from a SQLite row.
///
/// Implemented both by full entities and by narrower projection types used
/// with the column-subset query variants.
///
/// # Example
///
/// ```rust
/// use stowage_db::FromRow;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
///         Ok(User {
///             id: row.get("id")?,
///             name: row.get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}
