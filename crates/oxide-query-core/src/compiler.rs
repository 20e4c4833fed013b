//! Compilation entry points.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::CompilerConfig;
use crate::context::Context;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::generate::compile_select;
use crate::normalize::normalize;
use crate::query::{Query, ScalarQuery};
use crate::statement::Statement;
use crate::value::SqlValue;

/// SQL text and the values bound to its placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    /// Placeholder name to value, in binding order.
    pub params: IndexMap<String, SqlValue>,
}

/// Compiles a query to SQL for a dialect.
///
/// The query is normalized first, so chained clauses of the same kind end
/// up in a single statement.
///
/// # Errors
///
/// Returns a [`CompileError`](crate::CompileError) if the query has a shape
/// the generator does not support or contains an invalid expression.
#[tracing::instrument(skip_all, fields(dialect = dialect.name()))]
pub fn compile_query(query: &Query, dialect: &dyn Dialect) -> Result<CompiledQuery> {
    let normalized = normalize(query);
    let (stmt, ctx) = compile_select(&normalized, Context::new(dialect))?;
    debug!(shape = %normalized, params = ctx.params().len(), "compiled query");
    Ok(CompiledQuery {
        sql: stmt.sql,
        params: ctx.into_params(),
    })
}

/// Compiles a whole-query aggregate.
///
/// # Errors
///
/// See [`compile_query`].
#[tracing::instrument(skip_all, fields(dialect = dialect.name(), func = query.func.as_str()))]
pub fn compile_scalar_query(query: &ScalarQuery, dialect: &dyn Dialect) -> Result<CompiledQuery> {
    compile_query(&query.clone().into_query(), dialect)
}

/// Compiles a DELETE, UPDATE or INSERT statement.
///
/// # Errors
///
/// Returns a [`CompileError`](crate::CompileError) for statements without
/// assignments, unknown columns or invalid expressions.
#[tracing::instrument(skip_all, fields(dialect = dialect.name(), statement = statement.kind()))]
pub fn compile_statement(statement: &Statement, dialect: &dyn Dialect) -> Result<CompiledQuery> {
    let (sql, ctx) = statement.compile(Context::new(dialect))?;
    debug!(params = ctx.params().len(), "compiled statement");
    Ok(CompiledQuery {
        sql,
        params: ctx.into_params(),
    })
}

/// A compiler bound to a configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    #[must_use]
    pub const fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Returns the configured dialect.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.config.dialect.dialect()
    }

    /// See [`compile_query`].
    ///
    /// # Errors
    ///
    /// Propagates compilation errors.
    pub fn compile(&self, query: &Query) -> Result<CompiledQuery> {
        compile_query(query, self.dialect())
    }

    /// See [`compile_scalar_query`].
    ///
    /// # Errors
    ///
    /// Propagates compilation errors.
    pub fn compile_scalar(&self, query: &ScalarQuery) -> Result<CompiledQuery> {
        compile_scalar_query(query, self.dialect())
    }

    /// See [`compile_statement`].
    ///
    /// # Errors
    ///
    /// Propagates compilation errors.
    pub fn compile_statement(&self, statement: &Statement) -> Result<CompiledQuery> {
        compile_statement(statement, self.dialect())
    }
}
