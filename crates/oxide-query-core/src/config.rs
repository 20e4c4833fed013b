//! Compiler configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, GenericDialect, SqlServerDialect, SqliteDialect};

static GENERIC: GenericDialect = GenericDialect::new();
static SQLITE: SqliteDialect = SqliteDialect::new();
static SQLSERVER: SqlServerDialect = SqlServerDialect::new();

/// Built-in dialects, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Generic,
    Sqlite,
    SqlServer,
}

impl DialectKind {
    /// Returns the dialect implementation.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Generic => &GENERIC,
            Self::Sqlite => &SQLITE,
            Self::SqlServer => &SQLSERVER,
        }
    }

    /// Returns the configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "sqlserver",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialect '{0}' (expected generic, sqlite or sqlserver)")]
pub struct UnknownDialect(pub String);

impl FromStr for DialectKind {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "sqlite" => Ok(Self::Sqlite),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

/// Settings of a [`Compiler`](crate::Compiler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    /// Target dialect.
    pub dialect: DialectKind,
}

impl CompilerConfig {
    #[must_use]
    pub const fn new(dialect: DialectKind) -> Self {
        Self { dialect }
    }
}
