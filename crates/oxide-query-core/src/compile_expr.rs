//! Scalar expression compilation.
//!
//! Expressions compile to SQL fragments. Literal values are never inlined:
//! each one is bound to the next named parameter of the context.

use crate::context::Context;
use crate::error::{CompileError, Result};
use crate::expr::{BinaryOp, CompareOp, Expr, ExprKind, UnaryOp};
use crate::generate::compile_select;
use crate::normalize::normalize;
use crate::value::SqlValue;

/// Compiles an expression to a SQL fragment.
///
/// An expression with a registered alias compiles to `qualifier.field`
/// whatever its kind, which is how derived-table fields and table columns
/// are referenced.
///
/// # Errors
///
/// Fails on unregistered columns, unknown columns, empty IN lists and
/// subqueries that do not project exactly one column.
pub fn compile_expr<'d>(expr: &Expr, ctx: Context<'d>) -> Result<(String, Context<'d>)> {
    if let Some(alias) = ctx.alias_of(expr) {
        let sql = alias.to_string();
        return Ok((sql, ctx));
    }

    match expr.kind() {
        ExprKind::Literal(SqlValue::Bool(b)) => {
            let value = ctx.dialect().encode_bool(*b);
            Ok(ctx.bind(value))
        }
        ExprKind::Literal(SqlValue::Null) | ExprKind::Null => Ok((String::from("NULL"), ctx)),
        ExprKind::Literal(value) => Ok(ctx.bind(value.clone())),
        ExprKind::Column { .. } => Err(CompileError::MissingAlias {
            node: expr.kind().name(),
            id: expr.id().get(),
        }),
        ExprKind::Parameter(name) => {
            let sql = format!("{}{name}", ctx.dialect().parameter_prefix());
            Ok((sql, ctx))
        }
        ExprKind::Binary {
            op: BinaryOp::Concat,
            left,
            right,
        } => {
            let (l, ctx) = compile_operand(left, ctx)?;
            let (r, ctx) = compile_operand(right, ctx)?;
            let sql = ctx.dialect().concat(&l, &r);
            Ok((sql, ctx))
        }
        ExprKind::Binary { op, left, right } => {
            let (l, ctx) = compile_operand(left, ctx)?;
            let (r, ctx) = compile_operand(right, ctx)?;
            Ok((format!("{l} {} {r}", op.as_str()), ctx))
        }
        ExprKind::Unary { op, operand } => {
            let (sql, ctx) = compile_operand(operand, ctx)?;
            let sql = match op {
                UnaryOp::Not => format!("NOT {sql}"),
                UnaryOp::Neg => format!("-{sql}"),
            };
            Ok((sql, ctx))
        }
        ExprKind::Compare { op, left, right } => compile_compare(*op, left, right, ctx),
        ExprKind::Aggregate {
            func,
            operand,
            distinct,
        } => {
            let (sql, ctx) = compile_expr(operand, ctx)?;
            let distinct = if *distinct { "DISTINCT " } else { "" };
            Ok((format!("{}({distinct}{sql})", func.as_str()), ctx))
        }
        ExprKind::CountStar => Ok((String::from("COUNT(*)"), ctx)),
        ExprKind::Case {
            condition,
            then,
            otherwise,
        } => {
            let (c, ctx) = compile_expr(condition, ctx)?;
            let (t, ctx) = compile_expr(then, ctx)?;
            let (e, ctx) = compile_expr(otherwise, ctx)?;
            Ok((format!("CASE WHEN {c} THEN {t} ELSE {e} END"), ctx))
        }
        ExprKind::Like { value, pattern } => {
            let (v, ctx) = compile_operand(value, ctx)?;
            let (p, ctx) = compile_operand(pattern, ctx)?;
            Ok((format!("{v} LIKE {p}"), ctx))
        }
        ExprKind::InList { expr: needle, values } => {
            if values.is_empty() {
                return Err(CompileError::UnsupportedExpression {
                    node: expr.kind().name(),
                    reason: String::from("IN list is empty"),
                });
            }
            let (needle, mut ctx) = compile_operand(needle, ctx)?;
            let mut items = Vec::with_capacity(values.len());
            for value in values {
                let (sql, next) = compile_expr(value, ctx)?;
                items.push(sql);
                ctx = next;
            }
            Ok((format!("{needle} IN ({})", items.join(", ")), ctx))
        }
        ExprKind::InSubquery {
            expr: needle,
            query,
        } => {
            let (needle, ctx) = compile_operand(needle, ctx)?;
            let indent = ctx.indent();
            let select = normalize(query);
            let (stmt, ctx) = compile_select(&select, ctx.with_indent(indent + 2))?;
            if stmt.fields.len() != 1 {
                return Err(CompileError::UnsupportedExpression {
                    node: expr.kind().name(),
                    reason: format!(
                        "subquery projects {} columns, expected 1",
                        stmt.fields.len()
                    ),
                });
            }
            let ctx = ctx.with_indent(indent);
            let sql = format!("{needle} IN (\n{}\n{})", stmt.sql, ctx.pad(1));
            Ok((sql, ctx))
        }
        ExprKind::Unknown(name) => Err(CompileError::UnknownColumn { name: name.clone() }),
    }
}

/// Compiles an operand of an infix operator, parenthesizing compound
/// expressions.
pub(crate) fn compile_operand<'d>(expr: &Expr, ctx: Context<'d>) -> Result<(String, Context<'d>)> {
    let atomic = expr.is_atomic() || ctx.alias_of(expr).is_some();
    let (sql, ctx) = compile_expr(expr, ctx)?;
    if atomic {
        Ok((sql, ctx))
    } else {
        Ok((format!("({sql})"), ctx))
    }
}

fn compile_compare<'d>(
    op: CompareOp,
    left: &Expr,
    right: &Expr,
    ctx: Context<'d>,
) -> Result<(String, Context<'d>)> {
    let null_test = match op {
        CompareOp::Eq => Some("IS NULL"),
        CompareOp::NotEq => Some("IS NOT NULL"),
        _ => None,
    };
    if let Some(test) = null_test {
        let subject = if right.is_null_literal() {
            Some(left)
        } else if left.is_null_literal() {
            Some(right)
        } else {
            None
        };
        if let Some(subject) = subject {
            let (sql, ctx) = compile_operand(subject, ctx)?;
            return Ok((format!("{sql} {test}"), ctx));
        }
    }
    let (l, ctx) = compile_operand(left, ctx)?;
    let (r, ctx) = compile_operand(right, ctx)?;
    Ok((format!("{l} {} {r}", op.as_str()), ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{GenericDialect, SqliteDialect};
    use crate::query::Query;
    use crate::table::Table;

    fn with_columns<'d>(
        dialect: &'d dyn crate::dialect::Dialect,
        columns: &[&Expr],
    ) -> Context<'d> {
        columns.iter().fold(Context::new(dialect), |ctx, expr| {
            let ExprKind::Column { name, .. } = expr.kind() else {
                panic!("expected column");
            };
            let name = name.clone();
            ctx.register(expr, "a0", name)
        })
    }

    #[test]
    fn test_literal_becomes_parameter() {
        let dialect = GenericDialect::new();
        let age = Expr::column("customers", "Age");
        let ctx = with_columns(&dialect, &[&age]);
        let (sql, ctx) = compile_expr(&age.gt(18), ctx).unwrap();
        assert_eq!(sql, "a0.Age > @p0");
        assert_eq!(ctx.params().get("@p0"), Some(&SqlValue::Int(18)));
    }

    #[test]
    fn test_compound_operands_are_parenthesized() {
        let dialect = GenericDialect::new();
        let age = Expr::column("customers", "Age");
        let ctx = with_columns(&dialect, &[&age]);
        let expr = age.clone().gt(18).and(age.clone().lt(65));
        let (sql, _) = compile_expr(&expr, ctx).unwrap();
        assert_eq!(sql, "(a0.Age > @p0) AND (a0.Age < @p1)");
    }

    #[test]
    fn test_null_comparison_binds_nothing() {
        let dialect = GenericDialect::new();
        let email = Expr::column("customers", "Email");
        let ctx = with_columns(&dialect, &[&email]);
        let (sql, ctx) = compile_expr(&email.clone().eq(Expr::null()), ctx).unwrap();
        assert_eq!(sql, "a0.Email IS NULL");
        let (sql, ctx) = compile_expr(&Expr::null().ne(email.clone()), ctx).unwrap();
        assert_eq!(sql, "a0.Email IS NOT NULL");
        let (sql, ctx) = compile_expr(&email.eq(None::<String>), ctx).unwrap();
        assert_eq!(sql, "a0.Email IS NULL");
        assert!(ctx.params().is_empty());
    }

    #[test]
    fn test_boolean_encoding_follows_dialect() {
        let generic = GenericDialect::new();
        let (_, ctx) = compile_expr(&Expr::boolean(true), Context::new(&generic)).unwrap();
        assert_eq!(ctx.params().get("@p0"), Some(&SqlValue::Bool(true)));

        let sqlite = SqliteDialect::new();
        let (sql, ctx) = compile_expr(&Expr::boolean(true), Context::new(&sqlite)).unwrap();
        assert_eq!(sql, ":p0");
        assert_eq!(ctx.params().get(":p0"), Some(&SqlValue::Int(1)));
    }

    #[test]
    fn test_concat_uses_dialect() {
        let first = Expr::column("customers", "First");
        let last = Expr::column("customers", "Last");
        let generic = GenericDialect::new();
        let ctx = with_columns(&generic, &[&first, &last]);
        let (sql, _) = compile_expr(&first.clone().concat(last.clone()), ctx).unwrap();
        assert_eq!(sql, "CONCAT(a0.First, a0.Last)");

        let sqlite = SqliteDialect::new();
        let ctx = with_columns(&sqlite, &[&first, &last]);
        let (sql, _) = compile_expr(&first.concat(last), ctx).unwrap();
        assert_eq!(sql, "a0.First || a0.Last");
    }

    #[test]
    fn test_case_and_aggregates() {
        let dialect = GenericDialect::new();
        let amount = Expr::column("orders", "Amount");
        let ctx = with_columns(&dialect, &[&amount]);
        let expr = Expr::case(amount.clone().gt(100), "big", "small");
        let (sql, ctx) = compile_expr(&expr, ctx).unwrap();
        assert_eq!(sql, "CASE WHEN a0.Amount > @p0 THEN @p1 ELSE @p2 END");
        let (sql, ctx) = compile_expr(&amount.clone().count_distinct(), ctx).unwrap();
        assert_eq!(sql, "COUNT(DISTINCT a0.Amount)");
        let (sql, _) = compile_expr(&amount.sum().add(Expr::count_star()), ctx).unwrap();
        assert_eq!(sql, "SUM(a0.Amount) + COUNT(*)");
    }

    #[test]
    fn test_in_list_and_like() {
        let dialect = GenericDialect::new();
        let name = Expr::column("customers", "Name");
        let ctx = with_columns(&dialect, &[&name]);
        let (sql, ctx) = compile_expr(&name.clone().in_list(["Ann", "Bob"]), ctx).unwrap();
        assert_eq!(sql, "a0.Name IN (@p0, @p1)");
        let (sql, _) = compile_expr(&name.like("A%"), ctx).unwrap();
        assert_eq!(sql, "a0.Name LIKE @p2");
    }

    #[test]
    fn test_empty_in_list_is_rejected() {
        let dialect = GenericDialect::new();
        let name = Expr::column("customers", "Name");
        let ctx = with_columns(&dialect, &[&name]);
        let err = compile_expr(&name.in_list(Vec::<Expr>::new()), ctx).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedExpression { node: "InList", .. }));
    }

    #[test]
    fn test_named_parameter_is_not_bound() {
        let dialect = SqliteDialect::new();
        let (sql, ctx) = compile_expr(&Expr::param("min_age"), Context::new(&dialect)).unwrap();
        assert_eq!(sql, ":min_age");
        assert!(ctx.params().is_empty());
    }

    #[test]
    fn test_unregistered_column_is_missing_alias() {
        let dialect = GenericDialect::new();
        let expr = Expr::column("customers", "Id");
        let err = compile_expr(&expr, Context::new(&dialect)).unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingAlias {
                node: "Column",
                id: expr.id().get()
            }
        );
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let dialect = GenericDialect::new();
        let row = crate::row::Row::Table(Table::new("customers", ["Id"]).row());
        let err = compile_expr(&row.column("Nope"), Context::new(&dialect)).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownColumn {
                name: String::from("Nope")
            }
        );
    }

    #[test]
    fn test_in_subquery_nests_and_shares_parameters() {
        let dialect = GenericDialect::new();
        let id = Expr::column("customers", "Id");
        let ctx = with_columns(&dialect, &[&id]);
        let orders = Table::new("orders", ["Id", "CustomerId", "Amount"]);
        let sub = Query::from(orders)
            .filter(|o| o.column("Amount").gt(100))
            .select(|o| o.column("CustomerId"));
        let (ctx_sql, ctx) = compile_expr(&Expr::int(5), ctx).unwrap();
        assert_eq!(ctx_sql, "@p0");
        let (sql, ctx) = compile_expr(&id.in_subquery(sub), ctx).unwrap();
        let expected = [
            "a0.Id IN (",
            "        SELECT",
            "            a0.CustomerId AS CustomerId",
            "        FROM",
            "            orders a0",
            "        WHERE",
            "            a0.Amount > @p1",
            "    )",
        ]
        .join("\n");
        assert_eq!(sql, expected);
        assert_eq!(ctx.params().len(), 2);
    }
}
