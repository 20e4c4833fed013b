//! UPDATE statements.

use std::fmt;
use std::sync::Arc;

use super::table_scope;
use crate::compile_expr::compile_expr;
use crate::context::Context;
use crate::error::{CompileError, Result};
use crate::expr::{Expr, IntoExpr};
use crate::query::Predicate;
use crate::row::Row;
use crate::table::Table;

#[derive(Clone)]
struct Assignment {
    column: String,
    value: Predicate,
}

/// An UPDATE statement.
#[derive(Clone)]
pub struct Update {
    table: Table,
    assignments: Vec<Assignment>,
    filters: Vec<Predicate>,
}

impl Update {
    /// Creates an UPDATE of a table.
    #[must_use]
    pub fn table(table: Table) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Sets a column to an expression over the current row.
    #[must_use]
    pub fn set<F>(mut self, column: impl Into<String>, value: F) -> Self
    where
        F: Fn(&Row) -> Expr + Send + Sync + 'static,
    {
        self.assignments.push(Assignment {
            column: column.into(),
            value: Arc::new(value),
        });
        self
    }

    /// Sets a column to a fixed value.
    #[must_use]
    pub fn set_value(self, column: impl Into<String>, value: impl IntoExpr) -> Self {
        let value = value.into_expr();
        self.set(column, move |_: &Row| value.clone())
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

    pub(crate) fn compile<'d>(&self, ctx: Context<'d>) -> Result<(String, Context<'d>)> {
        if self.assignments.is_empty() {
            return Err(CompileError::EmptyAssignments {
                statement: "UPDATE",
            });
        }
        let (row, mut ctx) = table_scope(&self.table, ctx);
        let mut sets = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            if !self.table.has_column(&assignment.column) {
                return Err(CompileError::UnknownColumn {
                    name: assignment.column.clone(),
                });
            }
            let (value, next) = compile_expr(&(assignment.value)(&row), ctx)?;
            sets.push(format!("{} = {value}", assignment.column));
            ctx = next;
        }
        let mut sql = format!("UPDATE {} SET {}", self.table.name(), sets.join(", "));
        let predicate = self.filters.iter().map(|f| f(&row)).reduce(|acc, next| acc.and(next));
        if let Some(predicate) = predicate {
            let (where_sql, next) = compile_expr(&predicate, ctx)?;
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            ctx = next;
        }
        Ok((sql, ctx))
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<&str> = self.assignments.iter().map(|a| a.column.as_str()).collect();
        f.debug_struct("Update")
            .field("table", &self.table.name())
            .field("columns", &columns)
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{GenericDialect, SqliteDialect};
    use crate::value::SqlValue;

    fn customers() -> Table {
        Table::new("customers", ["Id", "Name", "Age", "Active"])
    }

    #[test]
    fn test_update_with_where() {
        let dialect = GenericDialect::new();
        let update = Update::table(customers())
            .set_value("Name", "Ann")
            .set("Age", |c| c.column("Age").add(1))
            .filter(|c| c.column("Id").eq(7));
        let (sql, ctx) = update.compile(Context::new(&dialect)).unwrap();
        assert_eq!(
            sql,
            "UPDATE customers SET Name = @p0, Age = customers.Age + @p1 WHERE customers.Id = @p2"
        );
        let values: Vec<&SqlValue> = ctx.params().values().collect();
        assert_eq!(
            values,
            [&SqlValue::Text("Ann".into()), &SqlValue::Int(1), &SqlValue::Int(7)]
        );
    }

    #[test]
    fn test_update_encodes_booleans_per_dialect() {
        let dialect = SqliteDialect::new();
        let update = Update::table(customers()).set_value("Active", false);
        let (sql, ctx) = update.compile(Context::new(&dialect)).unwrap();
        assert_eq!(sql, "UPDATE customers SET Active = :p0");
        assert_eq!(ctx.params().get(":p0"), Some(&SqlValue::Int(0)));
    }

    #[test]
    fn test_update_without_assignments() {
        let dialect = GenericDialect::new();
        let err = Update::table(customers())
            .filter(|c| c.column("Id").eq(1))
            .compile(Context::new(&dialect))
            .unwrap_err();
        assert_eq!(err, CompileError::EmptyAssignments { statement: "UPDATE" });
    }

    #[test]
    fn test_update_unknown_column() {
        let dialect = GenericDialect::new();
        let err = Update::table(customers())
            .set_value("Nickname", "x")
            .compile(Context::new(&dialect))
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownColumn {
                name: String::from("Nickname")
            }
        );
    }
}
