//! Macros for declaring table schemas.
//!
//! [`entity_columns!`] generates a module of typed column constants for a
//! table, tying database column names to Rust types.

/// Declares a module with typed column constants for a database table.
///
/// # Syntax
///
/// ```ignore
/// entity_columns!(
///     users {
///         table: "users",
///         columns: {
///             ID: i64 => "id",
///             NAME: String => "name",
///             SKILLS: Option<Vec<String>> => "skills"
///         }
///     }
/// );
/// ```
///
/// This expands to a `pub mod users` containing a `TABLE` constant and one
/// `Col` constant per column. `Vec<T>` and `Option<Vec<T>>` column types
/// are declared as JSON columns, read and written as JSON text.
#[macro_export]
macro_rules! entity_columns {
    (
        $entity:ident {
            table: $table:literal,
            columns: {
                $($col_name:ident: $col_type:ty => $db_col:literal),* $(,)?
            }
        }
    ) => {
        pub mod $entity {
            #[allow(unused_imports)]
            use $crate::expr::column::Col;

            pub const TABLE: &str = $table;

            $(
                $crate::column_const!($col_name, $col_type, $db_col);
            )*
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! column_const {
    // JSON collections
    ($name:ident, Vec<$inner:ty>, $db_col:literal) => {
        pub const $name: Col<String> = Col::json($db_col);
    };

    ($name:ident, Option<Vec<$inner:ty>>, $db_col:literal) => {
        pub const $name: Col<Option<String>> = Col::json($db_col);
    };

    // Optional scalars
    ($name:ident, Option<$inner:ty>, $db_col:literal) => {
        pub const $name: Col<Option<$inner>> = Col::new($db_col);
    };

    // Scalars
    ($name:ident, $type:ty, $db_col:literal) => {
        pub const $name: Col<$type> = Col::new($db_col);
    };
}
