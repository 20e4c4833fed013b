//! SQL Server dialect implementation.

use super::Dialect;
use crate::value::SqlValue;

/// Microsoft SQL Server dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn encode_bool(&self, value: bool) -> SqlValue {
        // BIT columns
        SqlValue::Int(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlserver_dialect() {
        let dialect = SqlServerDialect::new();
        assert_eq!(dialect.name(), "sqlserver");
        assert_eq!(dialect.parameter_prefix(), "@");
        assert_eq!(dialect.encode_bool(false), SqlValue::Int(0));
        assert_eq!(dialect.concat("a", "b"), "CONCAT(a, b)");
    }
}
