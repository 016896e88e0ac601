//! The DELETE query builder.

use rusqlite::{types::Value, ToSql};

use crate::{connection::Database, query::clause::Filter, traits::Predicate};

/// A lazily-built `DELETE FROM ... WHERE ...` statement.
pub struct DeleteQuery {
    db: Database,
    table: &'static str,
    filters: Vec<Filter>,
}

impl DeleteQuery {
    pub fn from(db: Database, table: &'static str) -> Self {
        Self {
            db,
            table,
            filters: Vec::new(),
        }
    }

    /// Narrows the delete by a predicate expression.
    pub fn filter(self, predicate: impl Predicate) -> Self {
        self.with_filter(Filter::new(predicate))
    }

    /// Narrows the delete by an already-rendered filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Executes the delete, returning the number of removed rows.
    pub fn execute(self) -> rusqlite::Result<usize> {
        let (sql, params) = self.build_sql();
        let conn = self.db.conn();

        let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        conn.execute(&sql, params_ref.as_slice())
    }

    fn build_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", self.table);

        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            let conditions: Vec<String> = self
                .filters
                .iter()
                .map(|f| {
                    params.extend(f.params.iter().cloned());
                    f.sql.clone()
                })
                .collect();
            sql.push_str(&conditions.join(" AND "));
        }

        (sql, params)
    }
}
