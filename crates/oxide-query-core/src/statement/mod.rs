//! Data-modifying statements.
//!
//! DELETE, UPDATE and INSERT compile on their own single-line path: there
//! are no derived tables, so columns are qualified by the bare table name
//! instead of a statement alias.

mod delete;
mod insert;
mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use update::Update;

use crate::context::Context;
use crate::error::Result;
use crate::row::Row;
use crate::table::Table;

/// A data-modifying statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Delete(Delete),
    Update(Update),
    Insert(Insert),
}

impl Statement {
    /// Returns the statement keyword.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Delete(_) => "DELETE",
            Self::Update(_) => "UPDATE",
            Self::Insert(_) => "INSERT",
        }
    }

    pub(crate) fn compile<'d>(&self, ctx: Context<'d>) -> Result<(String, Context<'d>)> {
        match self {
            Self::Delete(delete) => delete.compile(ctx),
            Self::Update(update) => update.compile(ctx),
            Self::Insert(insert) => insert.compile(ctx),
        }
    }
}

impl From<Delete> for Statement {
    fn from(delete: Delete) -> Self {
        Self::Delete(delete)
    }
}

impl From<Update> for Statement {
    fn from(update: Update) -> Self {
        Self::Update(update)
    }
}

impl From<Insert> for Statement {
    fn from(insert: Insert) -> Self {
        Self::Insert(insert)
    }
}

/// Instantiates `table` with its columns read as `table.column`.
fn table_scope<'d>(table: &Table, ctx: Context<'d>) -> (Row, Context<'d>) {
    let instance = table.row();
    let ctx = instance
        .iter()
        .fold(ctx, |ctx, (name, expr)| ctx.register(expr, table.name(), name));
    (Row::Table(instance), ctx)
}
