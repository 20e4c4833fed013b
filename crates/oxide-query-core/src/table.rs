//! Table descriptors.
//!
//! A [`Table`] names a table and its ordered columns. It carries no column
//! expressions of its own: every use as a FROM source or join target
//! instantiates a [`TableRow`] with fresh column nodes, so two references
//! to the same table never share aliases.

use std::sync::Arc;

use crate::expr::Expr;

/// Metadata for a table: its SQL name and column names, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: Arc<str>,
    columns: Arc<[String]>,
}

impl Table {
    /// Creates a table descriptor.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Arc::from(name.into()),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the SQL table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the table has a column with this exact name.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Instantiates the table with fresh column expressions.
    #[must_use]
    pub fn row(&self) -> TableRow {
        TableRow {
            table: self.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Expr::column(self.name(), c.as_str()))
                .collect(),
        }
    }
}

/// One instantiation of a table inside a query.
#[derive(Debug, Clone)]
pub struct TableRow {
    table: Table,
    columns: Vec<Expr>,
}

impl TableRow {
    /// Returns the table descriptor.
    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Returns the column expressions, in table order.
    #[must_use]
    pub fn columns(&self) -> &[Expr] {
        &self.columns
    }

    /// Returns the column expression with this name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Expr> {
        self.table
            .columns()
            .iter()
            .position(|c| c == name)
            .map(|i| &self.columns[i])
    }

    /// Iterates `(column name, expression)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.table
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }
}
