//! SQL Dialect support.
//!
//! The compiler emits the same statement structure for every database;
//! dialects only decide how parameters are named, how booleans are bound
//! and how strings are concatenated.

mod generic;
mod sqlite;
mod sqlserver;

pub use generic::GenericDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::value::SqlValue;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: std::fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the prefix of named parameters (`@p0`, `:p0`).
    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    /// Returns the value bound for a boolean literal.
    fn encode_bool(&self, value: bool) -> SqlValue {
        SqlValue::Bool(value)
    }

    /// Concatenates two compiled string expressions.
    fn concat(&self, left: &str, right: &str) -> String {
        format!("CONCAT({left}, {right})")
    }
}
