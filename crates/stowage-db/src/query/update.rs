//! The UPDATE query builder.

use rusqlite::{types::Value, ToSql};

use crate::{
    connection::Database,
    expr::Col,
    query::clause::Filter,
    traits::Predicate,
};

/// A lazily-built `UPDATE ... SET ... WHERE ...` statement.
pub struct UpdateQuery {
    db: Database,
    table: &'static str,
    sets: Vec<(String, Value)>,
    filters: Vec<Filter>,
}

impl UpdateQuery {
    pub fn table(db: Database, table: &'static str) -> Self {
        Self {
            db,
            table,
            sets: vec![],
            filters: vec![],
        }
    }

    /// Adds a typed column assignment.
    pub fn set<T, V: Into<Value>>(mut self, col: Col<T>, value: V) -> Self {
        self.sets.push((col.name.to_string(), value.into()));
        self
    }

    /// Adds every column assignment of a mapped row.
    pub fn set_row(mut self, row: Vec<(&'static str, Value)>) -> Self {
        for (column, value) in row {
            self.sets.push((column.to_string(), value));
        }
        self
    }

    /// Narrows the update by a predicate expression.
    pub fn filter(self, predicate: impl Predicate) -> Self {
        self.with_filter(Filter::new(predicate))
    }

    /// Narrows the update by an already-rendered filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Executes the update, returning the number of affected rows.
    pub fn execute(self) -> rusqlite::Result<usize> {
        let (sql, params) = self.build_sql();
        let conn = self.db.conn();

        let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        conn.execute(&sql, params_ref.as_slice())
    }

    fn build_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();

        let sets: Vec<String> = self
            .sets
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{} = ?", column)
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));

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
