//! Structural SQL generation.
//!
//! A normalized query is a `Select` whose body nests, from the outside in,
//! an optional `OrderBy`, an optional `GroupBy` (with its HAVING), an
//! optional `Where` and an optional `Join` over a base source. Every such
//! body compiles to exactly one statement:
//!
//! ```text
//! SELECT
//!     <projection>
//! FROM
//!     <base> aN
//!     <joins>
//! WHERE
//!     <predicate>
//! GROUP BY
//!     <keys>
//! HAVING
//!     <predicate>
//! ORDER BY
//!     <keys>
//! ```
//!
//! A base that is itself a query (a subquery, a projection, or clauses in
//! any other order) becomes a derived table. Parameters are bound in clause
//! order: FROM, JOIN, WHERE, GROUP BY, HAVING, ORDER BY, then projection.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::compile_expr::{compile_expr, compile_operand};
use crate::context::Context;
use crate::error::{CompileError, Result};
use crate::expr::{Expr, ExprKind};
use crate::normalize::identity_select;
use crate::query::{Aggregates, GroupKeys, HavingPredicate, JoinSpec, Predicate, Query, SortKeys};
use crate::row::Row;
use crate::table::TableRow;

/// One output column of a compiled statement.
#[derive(Debug, Clone)]
pub struct Field {
    /// The projected expression.
    pub expr: Expr,
    /// Its output column name.
    pub name: String,
}

/// A compiled SELECT statement.
#[derive(Debug, Clone)]
pub struct CompiledStatement {
    /// SQL text, indented at the context's statement level.
    pub sql: String,
    /// The row produced by the projection.
    pub row: Row,
    /// Output columns, in order.
    pub fields: Vec<Field>,
}

/// Clause layers peeled off a select body.
struct Shape<'q> {
    order_by: Option<&'q SortKeys>,
    group_by: Option<(&'q GroupKeys, Option<&'q HavingPredicate>)>,
    filter: Option<&'q Predicate>,
    joins: Option<&'q [JoinSpec]>,
    base: &'q Query,
}

impl<'q> Shape<'q> {
    fn peel(mut body: &'q Query) -> Self {
        let mut shape = Self {
            order_by: None,
            group_by: None,
            filter: None,
            joins: None,
            base: body,
        };
        if let Query::OrderBy { source, keys } = body {
            shape.order_by = Some(keys);
            body = &**source;
        }
        if let Query::GroupBy {
            source,
            keys,
            having,
        } = body
        {
            shape.group_by = Some((keys, having.as_ref()));
            body = &**source;
        }
        if let Query::Where { source, predicate } = body {
            shape.filter = Some(predicate);
            body = &**source;
        }
        if let Query::Join { source, joins } = body {
            shape.joins = Some(joins.as_slice());
            body = &**source;
        }
        shape.base = body;
        shape
    }
}

enum FromSource {
    Table { name: String, alias: String },
    Derived { sql: String, alias: String },
}

/// Compiles a `Select` query into one statement.
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedShape`] when `query` is not a select
/// or its body does not fit the clause order, and propagates expression
/// errors.
pub fn compile_select<'d>(
    query: &Query,
    ctx: Context<'d>,
) -> Result<(CompiledStatement, Context<'d>)> {
    let Query::Select {
        source,
        selector,
        aliases,
    } = query
    else {
        return Err(CompileError::UnsupportedShape {
            node: query.kind(),
            shape: query.to_string(),
        });
    };
    trace!(shape = %query, indent = ctx.indent(), "compiling select");
    let shape = Shape::peel(source);

    let (from, row, ctx) = compile_from(shape.base, ctx)?;

    let (join_lines, row, join_aliases, ctx) = match shape.joins {
        Some(joins) => compile_joins(joins, row, ctx)?,
        None => (Vec::new(), row, None, ctx),
    };

    let (where_sql, ctx) = match shape.filter {
        Some(predicate) => {
            let (sql, ctx) = compile_expr(&predicate(&row), ctx)?;
            (Some(sql), ctx)
        }
        None => (None, ctx),
    };

    let (group_sql, having_sql, row, ctx) = match shape.group_by {
        Some((keys, having)) => compile_group_by(keys, having, row, ctx)?,
        None => (None, None, row, ctx),
    };

    let (order_sql, ctx) = match shape.order_by {
        Some(keys) => compile_order_by(keys, &row, ctx)?,
        None => (None, ctx),
    };

    let output = selector(&row);
    let explicit = aliases.as_deref().or(join_aliases.as_deref());
    let (projection, fields, ctx) = compile_projection(&output, explicit, ctx)?;

    let pad = ctx.pad(0);
    let body = ctx.pad(1);
    let mut lines = vec![format!("{pad}SELECT")];
    let last = projection.len().saturating_sub(1);
    for (i, (sql, field)) in projection.iter().zip(&fields).enumerate() {
        let comma = if i < last { "," } else { "" };
        lines.push(format!("{body}{sql} AS {}{comma}", field.name));
    }
    match from {
        FromSource::Table { name, alias } => {
            lines.push(format!("{pad}FROM"));
            lines.push(format!("{body}{name} {alias}"));
        }
        FromSource::Derived { sql, alias } => {
            lines.push(format!("{pad}FROM ("));
            lines.push(sql);
            lines.push(format!("{pad}) {alias}"));
        }
    }
    for join in join_lines {
        lines.push(format!("{body}{join}"));
    }
    for (keyword, clause) in [
        ("WHERE", where_sql),
        ("GROUP BY", group_sql),
        ("HAVING", having_sql),
        ("ORDER BY", order_sql),
    ] {
        if let Some(clause) = clause {
            lines.push(format!("{pad}{keyword}"));
            lines.push(format!("{body}{clause}"));
        }
    }

    let stmt = CompiledStatement {
        sql: lines.join("\n"),
        row: output,
        fields,
    };
    Ok((stmt, ctx))
}

fn register_table<'d>(table: &TableRow, alias: &str, ctx: Context<'d>) -> Context<'d> {
    table
        .iter()
        .fold(ctx, |ctx, (name, expr)| ctx.register(expr, alias, name))
}

fn compile_from<'d>(base: &Query, ctx: Context<'d>) -> Result<(FromSource, Row, Context<'d>)> {
    match base {
        Query::From(table) => {
            let instance = table.row();
            let (alias, ctx) = ctx.next_alias();
            let ctx = register_table(&instance, &alias, ctx);
            let source = FromSource::Table {
                name: table.name().to_string(),
                alias,
            };
            Ok((source, Row::Table(instance), ctx))
        }
        Query::Having { .. } => Err(CompileError::UnsupportedShape {
            node: base.kind(),
            shape: base.to_string(),
        }),
        Query::Select { .. } => compile_derived(base, ctx),
        Query::FromSubquery(inner) => match inner.as_ref() {
            select @ Query::Select { .. } => compile_derived(select, ctx),
            other => compile_derived(&identity_select(other.clone()), ctx),
        },
        Query::Where { .. } | Query::OrderBy { .. } | Query::GroupBy { .. } | Query::Join { .. } => {
            compile_derived(&identity_select(base.clone()), ctx)
        }
    }
}

/// Compiles a nested select as a derived table.
///
/// The derived alias is taken after the nested statement, so inner sources
/// are numbered first. The nested output row stays the current row; each of
/// its projected expressions is re-registered as `aN.field`.
fn compile_derived<'d>(select: &Query, ctx: Context<'d>) -> Result<(FromSource, Row, Context<'d>)> {
    let indent = ctx.indent();
    let (stmt, ctx) = compile_select(select, ctx.with_indent(indent + 1))?;
    let (alias, mut ctx) = ctx.with_indent(indent).next_alias();
    // An expression projected twice keeps its first field.
    let mut seen = HashSet::with_capacity(stmt.fields.len());
    for field in &stmt.fields {
        if seen.insert(field.expr.id()) {
            ctx = ctx.register(&field.expr, alias.as_str(), field.name.as_str());
        }
    }
    let source = FromSource::Derived {
        sql: stmt.sql,
        alias,
    };
    Ok((source, stmt.row, ctx))
}

type JoinOutput<'d> = (Vec<String>, Row, Option<Vec<String>>, Context<'d>);

fn compile_joins<'d>(joins: &[JoinSpec], row: Row, ctx: Context<'d>) -> Result<JoinOutput<'d>> {
    if joins.is_empty() {
        return Err(CompileError::EmptyJoinChain);
    }
    let mut lines = Vec::with_capacity(joins.len());
    let mut row = row;
    let mut ctx = ctx;
    for join in joins {
        let instance = join.table.row();
        let (alias, next) = ctx.next_alias();
        let next = register_table(&instance, &alias, next);
        let inner = Row::Table(instance);
        let (outer_sql, next) = compile_operand(&(join.outer_key)(&row), next)?;
        let (inner_sql, next) = compile_operand(&(join.inner_key)(&inner), next)?;
        ctx = next;
        lines.push(format!(
            "{} {} {alias} ON {outer_sql} = {inner_sql}",
            join.kind.as_str(),
            join.table.name()
        ));
        row = (join.result)(&row, &inner);
    }
    let aliases = joins.iter().rev().find_map(|j| j.aliases.clone());
    Ok((lines, row, aliases, ctx))
}

type GroupOutput<'d> = (Option<String>, Option<String>, Row, Context<'d>);

fn compile_group_by<'d>(
    keys: &GroupKeys,
    having: Option<&HavingPredicate>,
    row: Row,
    ctx: Context<'d>,
) -> Result<GroupOutput<'d>> {
    let key_exprs = keys(&row);
    if key_exprs.is_empty() {
        return Err(CompileError::UnsupportedShape {
            node: "GroupBy",
            shape: String::from("grouping without keys"),
        });
    }
    let mut parts = Vec::with_capacity(key_exprs.len());
    let mut ctx = ctx;
    for key in &key_exprs {
        let (sql, next) = compile_expr(key, ctx)?;
        parts.push(sql);
        ctx = next;
    }
    let (having_sql, ctx) = match having {
        Some(predicate) => {
            let aggregates = Aggregates::new(row.clone());
            let (sql, ctx) = compile_expr(&predicate(&row, &aggregates), ctx)?;
            (Some(sql), ctx)
        }
        None => (None, ctx),
    };
    let grouped = Row::Group {
        key: Box::new(Row::tuple(key_exprs)),
        source: Box::new(row),
    };
    Ok((Some(parts.join(", ")), having_sql, grouped, ctx))
}

fn compile_order_by<'d>(
    keys: &SortKeys,
    row: &Row,
    ctx: Context<'d>,
) -> Result<(Option<String>, Context<'d>)> {
    let keys = keys(row);
    if keys.is_empty() {
        return Ok((None, ctx));
    }
    let mut parts = Vec::with_capacity(keys.len());
    let mut ctx = ctx;
    for key in &keys {
        let (sql, next) = compile_expr(&key.expr, ctx)?;
        parts.push(format!("{sql} {}", key.direction.as_str()));
        ctx = next;
    }
    Ok((Some(parts.join(", ")), ctx))
}

type ProjectionOutput<'d> = (Vec<String>, Vec<Field>, Context<'d>);

fn compile_projection<'d>(
    output: &Row,
    explicit: Option<&[String]>,
    ctx: Context<'d>,
) -> Result<ProjectionOutput<'d>> {
    let exprs = output.flatten();
    if exprs.is_empty() {
        return Err(CompileError::UnsupportedShape {
            node: "Select",
            shape: String::from("empty projection"),
        });
    }
    let mut compiled = Vec::with_capacity(exprs.len());
    let mut ctx = ctx;
    for expr in &exprs {
        let (sql, next) = compile_expr(expr, ctx)?;
        compiled.push(sql);
        ctx = next;
    }
    let names = projection_names(&exprs, explicit, &ctx);
    let fields = exprs
        .into_iter()
        .zip(names)
        .map(|(expr, name)| Field { expr, name })
        .collect();
    Ok((compiled, fields, ctx))
}

/// Picks a unique output name for every projected expression.
fn projection_names(exprs: &[Expr], explicit: Option<&[String]>, ctx: &Context<'_>) -> Vec<String> {
    let explicit = explicit.filter(|names| {
        let matches = names.len() == exprs.len();
        if !matches {
            debug!(
                expected = exprs.len(),
                given = names.len(),
                "ignoring explicit aliases with mismatched count"
            );
        }
        matches
    });

    // (name, may be renamed on collision)
    let mut candidates: Vec<(String, bool)> = exprs
        .iter()
        .enumerate()
        .map(|(i, expr)| {
            if let Some(name) = explicit
                .map(|names| names[i].trim())
                .filter(|name| !name.is_empty())
            {
                (name.to_string(), false)
            } else if let Some(alias) = ctx.alias_of(expr) {
                let is_column = matches!(expr.kind(), ExprKind::Column { .. });
                (alias.field.clone(), is_column)
            } else {
                (format!("Proj{i}"), false)
            }
        })
        .collect();

    let mut uses: HashMap<String, usize> = HashMap::new();
    for (name, renamable) in &candidates {
        if *renamable {
            *uses.entry(name.to_lowercase()).or_default() += 1;
        }
    }
    for ((name, renamable), expr) in candidates.iter_mut().zip(exprs) {
        if !*renamable || uses.get(&name.to_lowercase()).copied().unwrap_or(0) < 2 {
            continue;
        }
        if let ExprKind::Column { table, name: column } = expr.kind() {
            *name = format!("{}{column}", singular(table));
        }
    }

    let mut taken = HashSet::new();
    candidates
        .into_iter()
        .map(|(name, _)| {
            let mut unique = name.clone();
            let mut suffix = 1;
            while !taken.insert(unique.to_lowercase()) {
                unique = format!("{name}{suffix}");
                suffix += 1;
            }
            unique
        })
        .collect()
}

/// `customers` -> `Customer`.
fn singular(table: &str) -> String {
    let stem = table.strip_suffix('s').unwrap_or(table);
    let mut chars = stem.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
