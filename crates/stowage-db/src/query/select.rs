//! The SELECT query builder.

use std::marker::PhantomData;

use rusqlite::{types::Value, ToSql};

use crate::{
    connection::Database,
    expr::Col,
    query::clause::{Filter, OrderBy, Projection, SortDirection},
    traits::{FromRow, Predicate},
};

/// A lazily-built `SELECT` statement over one table.
///
/// Constructed via [`SelectQuery::from`], then narrowed with `.filter()`,
/// `.order_by()`, `.join()`, `.limit()` and friends. Nothing touches the
/// database until one of the terminal methods (`fetch`, `fetch_one`,
/// `count`, `exists`) runs. The builder is `Clone`, so one composed
/// specification can back several executions.
///
/// # Type Parameters
///
/// - `E`: the row type produced by the terminal methods (must implement
///   [`FromRow`])
///
/// # Example
///
/// ```rust
/// use stowage_db::{Database, FromRow, SelectQuery, SortDirection};
/// use stowage_db::expr::Col;
/// use stowage_db::Predicate as _;
///
/// #[derive(Debug)]
/// struct User {
///     id: i64,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
///         Ok(User { id: row.get("id")? })
///     }
/// }
///
/// const ID: Col<i64> = Col::new("id");
///
/// let db = Database::open_in_memory().unwrap();
/// db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY)").unwrap();
///
/// let users = SelectQuery::<User>::from(db, "users")
///     .filter(ID.gt(0))
///     .order_by(ID, SortDirection::Asc)
///     .limit(10)
///     .fetch()
///     .unwrap();
/// assert!(users.is_empty());
/// ```
pub struct SelectQuery<E> {
    db: Database,
    table: &'static str,
    columns: Vec<String>,
    joins: Vec<String>,
    filters: Vec<Filter>,
    orders: Vec<OrderBy>,
    limit: Option<u32>,
    offset: Option<u32>,
    tracked: bool,
    marker: PhantomData<E>,
}

impl<E> Clone for SelectQuery<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            table: self.table,
            columns: self.columns.clone(),
            joins: self.joins.clone(),
            filters: self.filters.clone(),
            orders: self.orders.clone(),
            limit: self.limit,
            offset: self.offset,
            tracked: self.tracked,
            marker: PhantomData,
        }
    }
}

impl<E> SelectQuery<E> {
    /// Starts a new query on the given table.
    pub fn from(db: Database, table: &'static str) -> Self {
        Self {
            db,
            table,
            columns: vec![],
            joins: vec![],
            filters: vec![],
            orders: vec![],
            limit: None,
            offset: None,
            tracked: true,
            marker: PhantomData,
        }
    }

    /// Restricts the SELECT list to a column subset.
    pub fn project(mut self, projection: Projection) -> Self {
        self.columns = projection.exprs;
        self
    }

    /// Rebinds the row type produced by the terminal methods, keeping
    /// every composed clause. Used for projected reads, where the query
    /// is composed against the entity but materialized into a narrower
    /// shape.
    pub fn retype<P>(self) -> SelectQuery<P> {
        SelectQuery {
            db: self.db,
            table: self.table,
            columns: self.columns,
            joins: self.joins,
            filters: self.filters,
            orders: self.orders,
            limit: self.limit,
            offset: self.offset,
            tracked: self.tracked,
            marker: PhantomData,
        }
    }

    /// Adds a JOIN clause, e.g.
    /// `"JOIN companies ON employees.company_id = companies.id"`.
    pub fn join(mut self, join: impl Into<String>) -> Self {
        self.joins.push(join.into());
        self
    }

    /// Narrows the query by a predicate expression.
    pub fn filter(self, predicate: impl Predicate) -> Self {
        self.with_filter(Filter::new(predicate))
    }

    /// Narrows the query by an already-rendered filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds an ORDER BY clause.
    pub fn order_by<T>(self, col: Col<T>, direction: SortDirection) -> Self {
        self.with_order(OrderBy::new(col, direction))
    }

    /// Adds an already-built ORDER BY clause.
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.orders.push(order);
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets 1-based pagination parameters.
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.limit = Some(per_page);
        self.offset = Some(page.saturating_sub(1) * per_page);
        self
    }

    /// Marks whether materialized rows should be registered with the
    /// caller's change tracker. Purely an annotation at this layer; the
    /// SQLite adapter always returns detached rows and leaves registration
    /// to the repository.
    pub fn tracking(mut self, tracked: bool) -> Self {
        self.tracked = tracked;
        self
    }

    /// Whether this query was composed in tracking mode.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }
}

impl<E: FromRow> SelectQuery<E> {
    /// Executes the query and materializes every row.
    pub fn fetch(self) -> rusqlite::Result<Vec<E>> {
        let (sql, params) = self.build_sql();
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&sql)?;

        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        let rows = stmt.query_map(params_ref.as_slice(), E::from_row)?;
        rows.collect()
    }

    /// Executes the query and returns the first row, if any.
    pub fn fetch_one(self) -> rusqlite::Result<Option<E>> {
        let mut results = self.limit(1).fetch()?;
        Ok(results.pop())
    }

    /// Counts matching rows, ignoring limit/offset.
    pub fn count(self) -> rusqlite::Result<i64> {
        let (sql, params) = self.build_aggregate_sql("COUNT(*)");
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&sql)?;

        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        stmt.query_row(params_ref.as_slice(), |row| row.get(0))
    }

    /// Returns whether at least one row matches.
    pub fn exists(self) -> rusqlite::Result<bool> {
        let (inner, params) = self.build_aggregate_sql("1");
        let sql = format!("SELECT EXISTS({})", inner);
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&sql)?;

        let params_ref: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
        stmt.query_row(params_ref.as_slice(), |row| row.get(0))
    }

    fn build_sql(&self) -> (String, Vec<Value>) {
        let select = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", select, self.table);
        let mut params = vec![];
        self.push_body(&mut sql, &mut params);

        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            let orders = self
                .orders
                .iter()
                .map(|o| {
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {}", o.column, dir)
                })
                .collect::<Vec<_>>();
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        (sql, params)
    }

    fn build_aggregate_sql(&self, select: &str) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT {} FROM {}", select, self.table);
        let mut params = vec![];
        self.push_body(&mut sql, &mut params);
        (sql, params)
    }

    fn push_body(&self, sql: &mut String, params: &mut Vec<Value>) {
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            let conditions = self
                .filters
                .iter()
                .map(|f| {
                    params.extend(f.params.iter().cloned());
                    f.sql.clone()
                })
                .collect::<Vec<_>>();
            sql.push_str(&conditions.join(" AND "));
        }
    }
}
