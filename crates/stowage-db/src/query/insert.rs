//! The INSERT query builder.

use rusqlite::{types::Value, ToSql};

use crate::{connection::Database, expr::Col};

/// A lazily-built `INSERT INTO` statement.
pub struct InsertQuery {
    db: Database,
    table: &'static str,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertQuery {
    pub fn into(db: Database, table: &'static str) -> Self {
        Self {
            db,
            table,
            columns: vec![],
            values: vec![],
        }
    }

    /// Adds a typed column/value pair.
    pub fn set<T, V: Into<Value>>(mut self, col: Col<T>, value: V) -> Self {
        self.columns.push(col.name.to_string());
        self.values.push(value.into());
        self
    }

    /// Adds a column/value pair by column name.
    pub fn value(mut self, column: &str, value: Value) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value);
        self
    }

    /// Adds every column/value pair of a mapped row.
    pub fn set_row(mut self, row: Vec<(&'static str, Value)>) -> Self {
        for (column, value) in row {
            self.columns.push(column.to_string());
            self.values.push(value);
        }
        self
    }

    /// Executes the insert, returning the new rowid.
    pub fn execute(self) -> rusqlite::Result<i64> {
        let (sql, params) = self.build_sql();
        let conn = self.db.conn();

        let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        conn.execute(&sql, params_ref.as_slice())?;
        Ok(conn.last_insert_rowid())
    }

    fn build_sql(&self) -> (String, Vec<Value>) {
        let columns = self.columns.join(", ");
        let placeholders = vec!["?"; self.values.len()].join(", ");

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table, columns, placeholders
        );

        (sql, self.values.clone())
    }
}
