//! # oxide-query-core
//!
//! A structural query compiler: relational query trees in, parameterized
//! SQL out.
//!
//! This crate provides:
//! - An expression and query model built from plain combinators
//! - A normalizer that fuses chained clauses into one statement
//! - A generator that lowers canonical queries to indented SQL text
//! - DELETE, UPDATE and INSERT statements on a single-line path
//! - Dialect hooks for parameter names, booleans and concatenation
//!
//! ## Building and compiling a query
//!
//! ```rust
//! use oxide_query_core::{compile_query, GenericDialect, Query, Row, Table};
//!
//! let customers = Table::new("customers", ["Id", "Name", "Age"]);
//! let query = Query::from(customers)
//!     .filter(|c| c.column("Age").gt(18))
//!     .select(|c| Row::tuple([c.column("Id"), c.column("Name")]));
//!
//! let compiled = compile_query(&query, &GenericDialect::new()).unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT\n    a0.Id AS Id,\n    a0.Name AS Name\nFROM\n    customers a0\nWHERE\n    a0.Age > @p0"
//! );
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Literal values never appear in the SQL text. Each one is bound to a named
//! placeholder and returned in [`CompiledQuery::params`]:
//!
//! ```rust
//! use oxide_query_core::{compile_query, GenericDialect, Query, SqlValue, Table};
//!
//! let users = Table::new("users", ["Id", "Name"]);
//! let user_input = "'; DROP TABLE users; --";
//! let query = Query::from(users).filter(move |u| u.column("Name").eq(user_input));
//!
//! let compiled = compile_query(&query, &GenericDialect::new()).unwrap();
//! assert!(compiled.sql.ends_with("a0.Name = @p0"));
//! assert_eq!(compiled.params["@p0"], SqlValue::Text(user_input.to_string()));
//! ```

pub mod compile_expr;
pub mod compiler;
pub mod config;
pub mod context;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod generate;
pub mod normalize;
pub mod query;
pub mod row;
pub mod statement;
pub mod table;
pub mod value;

pub use compiler::{compile_query, compile_scalar_query, compile_statement, CompiledQuery, Compiler};
pub use config::{CompilerConfig, DialectKind};
pub use context::{AliasRef, Context};
pub use dialect::{Dialect, GenericDialect, SqlServerDialect, SqliteDialect};
pub use error::{CompileError, Result};
pub use expr::{Expr, ExprId, ExprKind, IntoExpr};
pub use normalize::normalize;
pub use query::{Aggregates, JoinSpec, JoinType, OrderDirection, Query, ScalarQuery, SortKey};
pub use row::Row;
pub use statement::{Delete, Insert, Statement, Update};
pub use table::{Table, TableRow};
pub use value::{SqlValue, ToSqlValue};
