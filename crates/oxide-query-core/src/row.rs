//! Row shapes.
//!
//! Clause functions receive a [`Row`] describing what the query produces at
//! that point and return expressions built from its parts. A row is an
//! ordered, possibly nested tuple; the generator only ever looks at its
//! flattened form.

use crate::expr::{Expr, ExprKind};
use crate::table::TableRow;

/// An ordered heterogeneous row shape.
#[derive(Debug, Clone)]
pub enum Row {
    /// A single scalar expression.
    Expr(Expr),
    /// Nested elements, flattened depth-first.
    Tuple(Vec<Row>),
    /// All columns of a table instantiation.
    Table(TableRow),
    /// The result of grouping: flattens to its key.
    Group {
        /// Grouping key row.
        key: Box<Row>,
        /// Row of the grouped source.
        source: Box<Row>,
    },
    /// An absent element; dropped when flattening.
    Null,
}

impl Row {
    /// Builds a tuple row.
    #[must_use]
    pub fn tuple<I, R>(items: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Self>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Flattens the row into its scalar expressions.
    #[must_use]
    pub fn flatten(&self) -> Vec<Expr> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Expr>) {
        match self {
            Self::Expr(e) => out.push(e.clone()),
            Self::Tuple(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            Self::Table(t) => out.extend(t.columns().iter().cloned()),
            Self::Group { key, .. } => key.flatten_into(out),
            Self::Null => {}
        }
    }

    /// Returns the i-th element without flattening, or [`Row::Null`].
    #[must_use]
    pub fn item(&self, index: usize) -> Self {
        match self {
            Self::Tuple(items) => items.get(index).cloned().unwrap_or(Self::Null),
            Self::Table(t) => t
                .columns()
                .get(index)
                .map_or(Self::Null, |e| Self::Expr(e.clone())),
            Self::Expr(e) if index == 0 => Self::Expr(e.clone()),
            Self::Group { key, .. } => key.item(index),
            _ => Self::Null,
        }
    }

    /// Returns the i-th flattened expression.
    ///
    /// An out-of-range index yields an unknown expression that fails
    /// compilation with [`CompileError::UnknownColumn`](crate::CompileError).
    #[must_use]
    pub fn field(&self, index: usize) -> Expr {
        self.flatten()
            .into_iter()
            .nth(index)
            .unwrap_or_else(|| Expr::unknown(format!("#{index}")))
    }

    /// Returns the first flattened expression.
    #[must_use]
    pub fn first(&self) -> Expr {
        self.field(0)
    }

    /// Returns the first column reference named `name`.
    ///
    /// Grouped rows search their key before their source.
    #[must_use]
    pub fn column(&self, name: &str) -> Expr {
        self.find(None, name)
            .unwrap_or_else(|| Expr::unknown(name))
    }

    /// Returns the column `name` of table `table`.
    #[must_use]
    pub fn column_of(&self, table: &str, name: &str) -> Expr {
        self.find(Some(table), name)
            .unwrap_or_else(|| Expr::unknown(format!("{table}.{name}")))
    }

    fn find(&self, table: Option<&str>, name: &str) -> Option<Expr> {
        if let Self::Group { key, source } = self {
            return key.find(table, name).or_else(|| source.find(table, name));
        }
        self.flatten().into_iter().find(|e| match e.kind() {
            ExprKind::Column { table: t, name: n } => {
                n == name && table.is_none_or(|table| t == table)
            }
            _ => false,
        })
    }

    /// Returns the key of a grouped row, or the row itself.
    #[must_use]
    pub fn key(&self) -> Self {
        match self {
            Self::Group { key, .. } => (**key).clone(),
            other => other.clone(),
        }
    }

    /// Returns the source of a grouped row, or the row itself.
    #[must_use]
    pub fn source(&self) -> Self {
        match self {
            Self::Group { source, .. } => (**source).clone(),
            other => other.clone(),
        }
    }
}

impl From<Expr> for Row {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

impl From<&Expr> for Row {
    fn from(expr: &Expr) -> Self {
        Self::Expr(expr.clone())
    }
}

impl From<TableRow> for Row {
    fn from(table: TableRow) -> Self {
        Self::Table(table)
    }
}

impl From<Vec<Expr>> for Row {
    fn from(exprs: Vec<Expr>) -> Self {
        Self::tuple(exprs)
    }
}

impl From<Vec<Self>> for Row {
    fn from(rows: Vec<Self>) -> Self {
        Self::Tuple(rows)
    }
}
