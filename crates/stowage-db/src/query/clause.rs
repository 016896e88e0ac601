//! Clause types shared by the query builders.

use rusqlite::types::Value;

use crate::{expr::Col, traits::Predicate};

/// A rendered WHERE condition: a SQL fragment with `?` placeholders and
/// the parameter values bound to them.
///
/// Rendering happens once when the filter is built, which keeps the type
/// cloneable — a composed query specification can back several executions
/// (e.g. a total count and a page fetch).
#[derive(Debug, Clone)]
pub struct Filter {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl Filter {
    /// Renders a predicate expression into a reusable filter.
    pub fn new(predicate: impl Predicate) -> Self {
        let mut params = vec![];
        let sql = predicate.render(&mut params);
        Self { sql, params }
    }

    /// A raw `column = ?` filter against an already-erased value.
    pub fn column_eq(column: &str, value: Value) -> Self {
        Self {
            sql: format!("{} = ?", column),
            params: vec![value],
        }
    }

    /// Combines two filters with `AND`.
    pub fn and_with(mut self, other: Filter) -> Self {
        self.sql = format!("({} AND {})", self.sql, other.sql);
        self.params.extend(other.params);
        self
    }

    /// The rendered SQL fragment.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The values bound to the fragment's placeholders.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// An ORDER BY clause.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new<T>(col: Col<T>, direction: SortDirection) -> Self {
        Self {
            column: col.name.to_string(),
            direction,
        }
    }
}

/// A SELECT-list column subset used for projected reads.
///
/// Built column by column so projections can mix value types, with
/// JSON-marked columns expanded to their canonical-text form.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub(crate) exprs: Vec<String>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column to the projection.
    pub fn col<T>(mut self, col: Col<T>) -> Self {
        self.exprs.push(col.select_expr());
        self
    }
}
