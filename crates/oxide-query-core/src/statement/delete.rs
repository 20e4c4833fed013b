//! DELETE statements.

use std::fmt;
use std::sync::Arc;

use super::table_scope;
use crate::compile_expr::compile_expr;
use crate::context::Context;
use crate::error::Result;
use crate::expr::Expr;
use crate::query::Predicate;
use crate::row::Row;
use crate::table::Table;

/// A DELETE statement.
///
/// Several filters are combined with `AND`. Without any filter the
/// statement deletes every row.
#[derive(Clone)]
pub struct Delete {
    table: Table,
    filters: Vec<Predicate>,
}

impl Delete {
    /// Creates a DELETE over a table.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
        }
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Row) -> Expr + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(predicate));
        self
    }

    /// Returns true if a WHERE clause is specified.
    #[must_use]
    pub fn has_filter(&self) -> bool {
        !self.filters.is_empty()
    }

    pub(crate) fn compile<'d>(&self, ctx: Context<'d>) -> Result<(String, Context<'d>)> {
        let (row, ctx) = table_scope(&self.table, ctx);
        let mut sql = format!("DELETE FROM {}", self.table.name());
        let predicate = self.filters.iter().map(|f| f(&row)).reduce(|acc, next| acc.and(next));
        let ctx = match predicate {
            Some(predicate) => {
                let (where_sql, ctx) = compile_expr(&predicate, ctx)?;
                sql.push_str(" WHERE ");
                sql.push_str(&where_sql);
                ctx
            }
            None => ctx,
        };
        Ok((sql, ctx))
    }
}

impl fmt::Debug for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delete")
            .field("table", &self.table.name())
            .field("filters", &self.filters.len())
            .finish()
    }
}
