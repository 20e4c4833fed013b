//! SQLite dialect implementation.

use super::Dialect;
use crate::value::SqlValue;

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn parameter_prefix(&self) -> &'static str {
        ":"
    }

    fn encode_bool(&self, value: bool) -> SqlValue {
        // SQLite has no boolean storage class
        SqlValue::Int(i64::from(value))
    }

    fn concat(&self, left: &str, right: &str) -> String {
        format!("{left} || {right}")
    }
}
