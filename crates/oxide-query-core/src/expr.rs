//! Scalar expression model.
//!
//! An [`Expr`] is an immutable, cheaply cloned handle to an expression node.
//! Every node receives a process-unique [`ExprId`] when it is built; the
//! compilation context keys its alias table by that id. Cloning a handle
//! keeps the id, building a new node always allocates a new one, so two
//! value-equal nodes are still tracked independently.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::query::Query;
use crate::value::{SqlValue, ToSqlValue};

static NEXT_EXPR_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u64);

impl ExprId {
    fn next() -> Self {
        Self(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Binary operators producing a non-boolean (or logical) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    /// String concatenation; spelled by the dialect.
    Concat,
}

impl BinaryOp {
    /// Returns the SQL spelling of infix operators.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// Returns the SQL spelling of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFunc {
    /// Returns the SQL function name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
        }
    }
}

/// The variants of a scalar expression.
#[derive(Debug)]
pub enum ExprKind {
    /// A literal value, always bound as a parameter.
    Literal(SqlValue),
    /// The NULL literal.
    Null,
    /// A column of a table.
    Column { table: String, name: String },
    /// A named parameter bound by the caller.
    Parameter(String),
    Binary { op: BinaryOp, left: Expr, right: Expr },
    Unary { op: UnaryOp, operand: Expr },
    Compare { op: CompareOp, left: Expr, right: Expr },
    Aggregate { func: AggregateFunc, operand: Expr, distinct: bool },
    CountStar,
    Case { condition: Expr, then: Expr, otherwise: Expr },
    Like { value: Expr, pattern: Expr },
    InList { expr: Expr, values: Vec<Expr> },
    InSubquery { expr: Expr, query: Query },
    /// A column lookup that found nothing; rejected at compile time.
    Unknown(String),
}

impl ExprKind {
    /// Returns the variant name, used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "Literal",
            Self::Null => "Null",
            Self::Column { .. } => "Column",
            Self::Parameter(_) => "Parameter",
            Self::Binary { .. } => "Binary",
            Self::Unary { .. } => "Unary",
            Self::Compare { .. } => "Compare",
            Self::Aggregate { .. } => "Aggregate",
            Self::CountStar => "CountStar",
            Self::Case { .. } => "Case",
            Self::Like { .. } => "Like",
            Self::InList { .. } => "InList",
            Self::InSubquery { .. } => "InSubquery",
            Self::Unknown(_) => "Unknown",
        }
    }
}

#[derive(Debug)]
struct ExprNode {
    id: ExprId,
    kind: ExprKind,
}

/// A scalar SQL expression.
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

impl Expr {
    /// Builds a new expression node with a fresh identity.
    #[must_use]
    pub fn new(kind: ExprKind) -> Self {
        Self(Arc::new(ExprNode {
            id: ExprId::next(),
            kind,
        }))
    }

    /// Returns the identity of this node.
    #[must_use]
    pub fn id(&self) -> ExprId {
        self.0.id
    }

    /// Returns the variant of this node.
    #[must_use]
    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Returns true when both handles point at the same node.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// A literal value. `None`/NULL values become [`ExprKind::Null`].
    #[must_use]
    pub fn literal<T: ToSqlValue>(value: T) -> Self {
        match value.to_sql_value() {
            SqlValue::Null => Self::null(),
            value => Self::new(ExprKind::Literal(value)),
        }
    }

    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Literal(SqlValue::Int(value)))
    }

    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Literal(SqlValue::Float(value)))
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Literal(SqlValue::Text(value.into())))
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::Literal(SqlValue::Bool(value)))
    }

    #[must_use]
    pub fn null() -> Self {
        Self::new(ExprKind::Null)
    }

    /// A reference to a named parameter supplied at execution time.
    #[must_use]
    pub fn param(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Parameter(name.into()))
    }

    /// A column of a table.
    ///
    /// Columns only compile once a FROM source has registered them, so
    /// they are normally obtained from a [`Row`](crate::Row) rather than
    /// built directly.
    #[must_use]
    pub fn column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ExprKind::Column {
            table: table.into(),
            name: name.into(),
        })
    }

    /// `CASE WHEN condition THEN then ELSE otherwise END`.
    #[must_use]
    pub fn case(condition: Self, then: impl IntoExpr, otherwise: impl IntoExpr) -> Self {
        Self::new(ExprKind::Case {
            condition,
            then: then.into_expr(),
            otherwise: otherwise.into_expr(),
        })
    }

    /// `COUNT(*)`.
    #[must_use]
    pub fn count_star() -> Self {
        Self::new(ExprKind::CountStar)
    }

    pub(crate) fn unknown(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Unknown(name.into()))
    }

    fn binary(self, op: BinaryOp, right: impl IntoExpr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            left: self,
            right: right.into_expr(),
        })
    }

    fn compare(self, op: CompareOp, right: impl IntoExpr) -> Self {
        Self::new(ExprKind::Compare {
            op,
            left: self,
            right: right.into_expr(),
        })
    }

    fn aggregate(self, func: AggregateFunc, distinct: bool) -> Self {
        Self::new(ExprKind::Aggregate {
            func,
            operand: self,
            distinct,
        })
    }

    #[must_use]
    pub fn eq(self, right: impl IntoExpr) -> Self {
        self.compare(CompareOp::Eq, right)
    }

    #[must_use]
    pub fn ne(self, right: impl IntoExpr) -> Self {
        self.compare(CompareOp::NotEq, right)
    }

    #[must_use]
    pub fn lt(self, right: impl IntoExpr) -> Self {
        self.compare(CompareOp::Lt, right)
    }

    #[must_use]
    pub fn le(self, right: impl IntoExpr) -> Self {
        self.compare(CompareOp::LtEq, right)
    }

    #[must_use]
    pub fn gt(self, right: impl IntoExpr) -> Self {
        self.compare(CompareOp::Gt, right)
    }

    #[must_use]
    pub fn ge(self, right: impl IntoExpr) -> Self {
        self.compare(CompareOp::GtEq, right)
    }

    /// `self = NULL`, compiled as `IS NULL`.
    #[must_use]
    pub fn is_null(self) -> Self {
        self.eq(Self::null())
    }

    /// `self != NULL`, compiled as `IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        self.ne(Self::null())
    }

    #[must_use]
    pub fn and(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::And, right)
    }

    #[must_use]
    pub fn or(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Or, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Add, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Sub, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Mul, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn div(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Div, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn rem(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Mod, right)
    }

    /// String concatenation, spelled per dialect.
    #[must_use]
    pub fn concat(self, right: impl IntoExpr) -> Self {
        self.binary(BinaryOp::Concat, right)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::new(ExprKind::Unary {
            op: UnaryOp::Not,
            operand: self,
        })
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn neg(self) -> Self {
        Self::new(ExprKind::Unary {
            op: UnaryOp::Neg,
            operand: self,
        })
    }

    #[must_use]
    pub fn like(self, pattern: impl IntoExpr) -> Self {
        Self::new(ExprKind::Like {
            value: self,
            pattern: pattern.into_expr(),
        })
    }

    #[must_use]
    pub fn in_list<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        Self::new(ExprKind::InList {
            expr: self,
            values: values.into_iter().map(IntoExpr::into_expr).collect(),
        })
    }

    /// `self IN (<query>)`; the query must project a single column.
    #[must_use]
    pub fn in_subquery(self, query: Query) -> Self {
        Self::new(ExprKind::InSubquery { expr: self, query })
    }

    #[must_use]
    pub fn sum(self) -> Self {
        self.aggregate(AggregateFunc::Sum, false)
    }

    #[must_use]
    pub fn avg(self) -> Self {
        self.aggregate(AggregateFunc::Avg, false)
    }

    #[must_use]
    pub fn min(self) -> Self {
        self.aggregate(AggregateFunc::Min, false)
    }

    #[must_use]
    pub fn max(self) -> Self {
        self.aggregate(AggregateFunc::Max, false)
    }

    #[must_use]
    pub fn count(self) -> Self {
        self.aggregate(AggregateFunc::Count, false)
    }

    #[must_use]
    pub fn count_distinct(self) -> Self {
        self.aggregate(AggregateFunc::Count, true)
    }

    /// True for nodes that render as a single token or a function call and
    /// therefore never need parentheses as an operand.
    pub(crate) fn is_atomic(&self) -> bool {
        matches!(
            self.kind(),
            ExprKind::Literal(_)
                | ExprKind::Null
                | ExprKind::Column { .. }
                | ExprKind::Parameter(_)
                | ExprKind::Aggregate { .. }
                | ExprKind::CountStar
                | ExprKind::Case { .. }
                | ExprKind::Unknown(_)
        )
    }

    /// True for the NULL literal in either spelling.
    pub(crate) fn is_null_literal(&self) -> bool {
        match self.kind() {
            ExprKind::Null => true,
            ExprKind::Literal(value) => value.is_null(),
            _ => false,
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ", self.id().get())?;
        match self.kind() {
            ExprKind::Literal(v) => write!(f, "{v}"),
            ExprKind::Null => f.write_str("NULL"),
            ExprKind::Column { table, name } => write!(f, "{table}.{name}"),
            ExprKind::Parameter(name) => write!(f, "${name}"),
            ExprKind::Binary { op, left, right } => {
                write!(f, "({left:?} {} {right:?})", op.as_str())
            }
            ExprKind::Unary { op, operand } => write!(f, "({op:?} {operand:?})"),
            ExprKind::Compare { op, left, right } => {
                write!(f, "({left:?} {} {right:?})", op.as_str())
            }
            ExprKind::Aggregate { func, operand, .. } => {
                write!(f, "{}({operand:?})", func.as_str())
            }
            ExprKind::CountStar => f.write_str("COUNT(*)"),
            ExprKind::Case {
                condition,
                then,
                otherwise,
            } => write!(f, "CASE({condition:?}, {then:?}, {otherwise:?})"),
            ExprKind::Like { value, pattern } => write!(f, "({value:?} LIKE {pattern:?})"),
            ExprKind::InList { expr, values } => write!(f, "({expr:?} IN {values:?})"),
            ExprKind::InSubquery { expr, query } => write!(f, "({expr:?} IN {query})"),
            ExprKind::Unknown(name) => write!(f, "?{name}"),
        }
    }
}

/// Conversion into an expression operand.
///
/// Plain Rust values become literals, so `row.column("Age").gt(18)` works
/// without wrapping the right-hand side.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

macro_rules! impl_into_expr_literal {
    ($($ty:ty),+) => {
        $(
            impl IntoExpr for $ty {
                fn into_expr(self) -> Expr {
                    Expr::literal(self)
                }
            }
        )+
    };
}

impl_into_expr_literal!(
    SqlValue, bool, i64, i32, i16, i8, u32, u16, u8, f64, f32, String, &str
);

impl<T: ToSqlValue> IntoExpr for Option<T> {
    fn into_expr(self) -> Expr {
        Expr::literal(self)
    }
}
