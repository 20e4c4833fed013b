//! INSERT statements.

use crate::compile_expr::compile_expr;
use crate::context::Context;
use crate::error::{CompileError, Result};
use crate::expr::{Expr, IntoExpr};
use crate::table::Table;

/// A single-row INSERT statement.
#[derive(Debug, Clone)]
pub struct Insert {
    table: Table,
    values: Vec<(String, Expr)>,
}

impl Insert {
    /// Creates an INSERT into a table.
    #[must_use]
    pub fn into(table: Table) -> Self {
        Self {
            table,
            values: Vec::new(),
        }
    }

    /// Adds a column value.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl IntoExpr) -> Self {
        self.values.push((column.into(), value.into_expr()));
        self
    }

    pub(crate) fn compile<'d>(&self, ctx: Context<'d>) -> Result<(String, Context<'d>)> {
        if self.values.is_empty() {
            return Err(CompileError::EmptyAssignments {
                statement: "INSERT",
            });
        }
        let mut columns = Vec::with_capacity(self.values.len());
        let mut values = Vec::with_capacity(self.values.len());
        let mut ctx = ctx;
        for (column, value) in &self.values {
            if !self.table.has_column(column) {
                return Err(CompileError::UnknownColumn {
                    name: column.clone(),
                });
            }
            let (sql, next) = compile_expr(value, ctx)?;
            columns.push(column.as_str());
            values.push(sql);
            ctx = next;
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.name(),
            columns.join(", "),
            values.join(", ")
        );
        Ok((sql, ctx))
    }
}
