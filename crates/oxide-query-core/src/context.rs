//! Compilation context.
//!
//! A [`Context`] is threaded by value through every compile step: each step
//! takes ownership and hands back the updated context. Cloning one yields an
//! independent snapshot, so a failed branch never leaks bindings.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::dialect::Dialect;
use crate::expr::{Expr, ExprId};
use crate::value::SqlValue;

const INDENT: &str = "    ";

/// Where an expression is read from: `qualifier.field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRef {
    /// Statement alias (`a0`) or table name.
    pub qualifier: String,
    /// Column or projected field name.
    pub field: String,
}

impl fmt::Display for AliasRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.field)
    }
}

/// State of an in-progress compilation.
#[derive(Debug, Clone)]
pub struct Context<'d> {
    aliases: HashMap<ExprId, AliasRef>,
    next_alias: usize,
    params: IndexMap<String, SqlValue>,
    dialect: &'d dyn Dialect,
    indent: usize,
}

impl<'d> Context<'d> {
    /// Creates an empty context for a dialect.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            aliases: HashMap::new(),
            next_alias: 0,
            params: IndexMap::new(),
            dialect,
            indent: 0,
        }
    }

    #[must_use]
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    /// Current statement indentation level.
    #[must_use]
    pub const fn indent(&self) -> usize {
        self.indent
    }

    /// Whitespace for `level` levels past the statement indentation.
    #[must_use]
    pub fn pad(&self, level: usize) -> String {
        INDENT.repeat(self.indent + level)
    }

    /// Returns the context at another indentation level.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Takes the next statement alias (`a0`, `a1`, ...).
    #[must_use]
    pub fn next_alias(mut self) -> (String, Self) {
        let alias = format!("a{}", self.next_alias);
        self.next_alias += 1;
        (alias, self)
    }

    /// Records that `expr` is read as `qualifier.field`.
    #[must_use]
    pub fn register(
        mut self,
        expr: &Expr,
        qualifier: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.aliases.insert(
            expr.id(),
            AliasRef {
                qualifier: qualifier.into(),
                field: field.into(),
            },
        );
        self
    }

    /// Returns where `expr` is read from, if registered.
    #[must_use]
    pub fn alias_of(&self, expr: &Expr) -> Option<&AliasRef> {
        self.aliases.get(&expr.id())
    }

    /// Binds a value to the next parameter name and returns the placeholder.
    #[must_use]
    pub fn bind(mut self, value: SqlValue) -> (String, Self) {
        let name = format!("{}p{}", self.dialect.parameter_prefix(), self.params.len());
        self.params.insert(name.clone(), value);
        (name, self)
    }

    /// Parameters bound so far, in binding order.
    #[must_use]
    pub const fn params(&self) -> &IndexMap<String, SqlValue> {
        &self.params
    }

    /// Consumes the context, returning its parameters.
    #[must_use]
    pub fn into_params(self) -> IndexMap<String, SqlValue> {
        self.params
    }
}
