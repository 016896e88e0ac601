//! Typed database columns.

use std::marker::PhantomData;

use rusqlite::types::Value;

use crate::traits::Predicate;

/// A typed reference to a database column.
///
/// The type parameter `T` records the expected Rust type when reading this
/// column. It is advisory: the matching `FromRow` implementation must agree
/// with it.
///
/// # Example
///
/// ```rust
/// use stowage_db::expr::Col;
/// const NAME: Col<String> = Col::new("name");
/// ```
pub struct Col<T> {
    pub name: &'static str,
    pub json: bool,
    marker: PhantomData<T>,
}

impl<T> Col<T> {
    /// Creates a new column reference.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            json: false,
            marker: PhantomData,
        }
    }

    /// Marks this column as JSON-encoded so SELECT lists read it back as
    /// canonical JSON text.
    pub const fn json(name: &'static str) -> Self {
        Self {
            name,
            json: true,
            marker: PhantomData,
        }
    }

    /// The SELECT-list expression for this column.
    pub fn select_expr(&self) -> String {
        if self.json {
            format!("json({}) AS {}", self.name, self.name)
        } else {
            self.name.to_string()
        }
    }
}

impl<T> Clone for Col<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Col<T> {}

impl<T: Send> Predicate for Col<T> {
    fn render(&self, _params: &mut Vec<Value>) -> String {
        self.name.to_string()
    }
}
