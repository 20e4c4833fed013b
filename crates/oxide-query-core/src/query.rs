//! Relational query model.
//!
//! A [`Query`] is a tree of relational operators. Clause contents are given
//! as functions from the row shape at that point to expressions, which lets
//! the same tree be compiled many times against freshly aliased sources.
//! Functions must be pure: the normalizer and the generator call them as
//! often as they need.

use std::fmt;
use std::sync::Arc;

use crate::expr::{AggregateFunc, Expr};
use crate::row::Row;
use crate::table::Table;

/// Projection function.
pub type Selector = Arc<dyn Fn(&Row) -> Row + Send + Sync>;
/// Row predicate.
pub type Predicate = Arc<dyn Fn(&Row) -> Expr + Send + Sync>;
/// Sort key function.
pub type SortKeys = Arc<dyn Fn(&Row) -> Vec<SortKey> + Send + Sync>;
/// Grouping key function.
pub type GroupKeys = Arc<dyn Fn(&Row) -> Vec<Expr> + Send + Sync>;
/// Predicate over a grouped source, with aggregate access.
pub type HavingPredicate = Arc<dyn Fn(&Row, &Aggregates) -> Expr + Send + Sync>;
/// Join key function.
pub type JoinKey = Arc<dyn Fn(&Row) -> Expr + Send + Sync>;
/// Join result function, given the outer and inner rows.
pub type JoinResult = Arc<dyn Fn(&Row, &Row) -> Row + Send + Sync>;

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub expr: Expr,
    pub direction: OrderDirection,
}

impl SortKey {
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: OrderDirection::Asc,
        }
    }

    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: OrderDirection::Desc,
        }
    }
}

impl From<Expr> for SortKey {
    fn from(expr: Expr) -> Self {
        Self::asc(expr)
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN.
    Inner,
    /// LEFT OUTER JOIN.
    Left,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// A single join against a table.
#[derive(Clone)]
pub struct JoinSpec {
    pub kind: JoinType,
    pub table: Table,
    /// Key taken from the row joined so far.
    pub outer_key: JoinKey,
    /// Key taken from the joined table's row.
    pub inner_key: JoinKey,
    /// Row produced from `(outer, inner)`.
    pub result: JoinResult,
    /// Projection names used when the enclosing select has none.
    pub aliases: Option<Vec<String>>,
}

impl JoinSpec {
    /// Creates an inner join.
    #[must_use]
    pub fn inner<O, I, R>(table: Table, outer_key: O, inner_key: I, result: R) -> Self
    where
        O: Fn(&Row) -> Expr + Send + Sync + 'static,
        I: Fn(&Row) -> Expr + Send + Sync + 'static,
        R: Fn(&Row, &Row) -> Row + Send + Sync + 'static,
    {
        Self {
            kind: JoinType::Inner,
            table,
            outer_key: Arc::new(outer_key),
            inner_key: Arc::new(inner_key),
            result: Arc::new(result),
            aliases: None,
        }
    }

    /// Creates a left join.
    #[must_use]
    pub fn left<O, I, R>(table: Table, outer_key: O, inner_key: I, result: R) -> Self
    where
        O: Fn(&Row) -> Expr + Send + Sync + 'static,
        I: Fn(&Row) -> Expr + Send + Sync + 'static,
        R: Fn(&Row, &Row) -> Row + Send + Sync + 'static,
    {
        Self {
            kind: JoinType::Left,
            ..Self::inner(table, outer_key, inner_key, result)
        }
    }

    /// Sets the projection names carried by this join.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = Some(aliases.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for JoinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinSpec")
            .field("kind", &self.kind)
            .field("table", &self.table.name())
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

/// Aggregate accessor handed to HAVING predicates.
///
/// Each method builds an aggregate over an expression of the grouped
/// source row.
#[derive(Debug, Clone)]
pub struct Aggregates {
    source: Row,
}

impl Aggregates {
    pub(crate) const fn new(source: Row) -> Self {
        Self { source }
    }

    /// The grouped source row.
    #[must_use]
    pub const fn source(&self) -> &Row {
        &self.source
    }

    #[must_use]
    pub fn sum(&self, f: impl Fn(&Row) -> Expr) -> Expr {
        f(&self.source).sum()
    }

    #[must_use]
    pub fn avg(&self, f: impl Fn(&Row) -> Expr) -> Expr {
        f(&self.source).avg()
    }

    #[must_use]
    pub fn min(&self, f: impl Fn(&Row) -> Expr) -> Expr {
        f(&self.source).min()
    }

    #[must_use]
    pub fn max(&self, f: impl Fn(&Row) -> Expr) -> Expr {
        f(&self.source).max()
    }

    /// `COUNT(*)`.
    #[must_use]
    pub fn count(&self) -> Expr {
        Expr::count_star()
    }

    #[must_use]
    pub fn count_distinct(&self, f: impl Fn(&Row) -> Expr) -> Expr {
        f(&self.source).count_distinct()
    }
}

/// A relational query.
#[derive(Clone)]
pub enum Query {
    /// All rows of a table.
    From(Table),
    /// All rows of a nested query.
    FromSubquery(Box<Query>),
    Select {
        source: Box<Query>,
        selector: Selector,
        /// Explicit output column names.
        aliases: Option<Vec<String>>,
    },
    Where {
        source: Box<Query>,
        predicate: Predicate,
    },
    OrderBy {
        source: Box<Query>,
        keys: SortKeys,
    },
    GroupBy {
        source: Box<Query>,
        keys: GroupKeys,
        having: Option<HavingPredicate>,
    },
    /// A HAVING not yet folded into its GroupBy.
    Having {
        source: Box<Query>,
        predicate: HavingPredicate,
    },
    Join {
        source: Box<Query>,
        joins: Vec<JoinSpec>,
    },
}

impl Query {
    /// Starts a query over a table.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from(table: Table) -> Self {
        Self::From(table)
    }

    /// Starts a query over the rows of another query.
    #[must_use]
    pub fn subquery(query: Self) -> Self {
        Self::FromSubquery(Box::new(query))
    }

    /// Returns the node kind, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::From(_) => "From",
            Self::FromSubquery(_) => "FromSubquery",
            Self::Select { .. } => "Select",
            Self::Where { .. } => "Where",
            Self::OrderBy { .. } => "OrderBy",
            Self::GroupBy { .. } => "GroupBy",
            Self::Having { .. } => "Having",
            Self::Join { .. } => "Join",
        }
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Row) -> Expr + Send + Sync + 'static,
    {
        Self::Where {
            source: Box::new(self),
            predicate: Arc::new(predicate),
        }
    }

    /// Projects each row.
    #[must_use]
    pub fn select<F, R>(self, selector: F) -> Self
    where
        F: Fn(&Row) -> R + Send + Sync + 'static,
        R: Into<Row>,
    {
        Self::Select {
            source: Box::new(self),
            selector: Arc::new(move |row: &Row| selector(row).into()),
            aliases: None,
        }
    }

    /// Projects each row, naming the output columns.
    ///
    /// The names only apply when their count matches the flattened
    /// projection exactly.
    #[must_use]
    pub fn select_as<F, R, I, S>(self, selector: F, aliases: I) -> Self
    where
        F: Fn(&Row) -> R + Send + Sync + 'static,
        R: Into<Row>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Select {
            source: Box::new(self),
            selector: Arc::new(move |row: &Row| selector(row).into()),
            aliases: Some(aliases.into_iter().map(Into::into).collect()),
        }
    }

    /// Sorts the rows. Keys of an earlier `order_by` stay primary.
    #[must_use]
    pub fn order_by<F, I>(self, keys: F) -> Self
    where
        F: Fn(&Row) -> I + Send + Sync + 'static,
        I: IntoIterator,
        I::Item: Into<SortKey>,
    {
        Self::OrderBy {
            source: Box::new(self),
            keys: Arc::new(move |row: &Row| keys(row).into_iter().map(Into::into).collect()),
        }
    }

    /// Groups the rows by a list of keys.
    #[must_use]
    pub fn group_by<F>(self, keys: F) -> Self
    where
        F: Fn(&Row) -> Vec<Expr> + Send + Sync + 'static,
    {
        Self::GroupBy {
            source: Box::new(self),
            keys: Arc::new(keys),
            having: None,
        }
    }

    /// Groups the rows and filters the groups.
    #[must_use]
    pub fn group_by_having<F, H>(self, keys: F, having: H) -> Self
    where
        F: Fn(&Row) -> Vec<Expr> + Send + Sync + 'static,
        H: Fn(&Row, &Aggregates) -> Expr + Send + Sync + 'static,
    {
        Self::GroupBy {
            source: Box::new(self),
            keys: Arc::new(keys),
            having: Some(Arc::new(having)),
        }
    }

    /// Filters the groups of a preceding `group_by`.
    #[must_use]
    pub fn having<H>(self, predicate: H) -> Self
    where
        H: Fn(&Row, &Aggregates) -> Expr + Send + Sync + 'static,
    {
        Self::Having {
            source: Box::new(self),
            predicate: Arc::new(predicate),
        }
    }

    /// Inner join against a table.
    #[must_use]
    pub fn join<O, I, R>(self, table: Table, outer_key: O, inner_key: I, result: R) -> Self
    where
        O: Fn(&Row) -> Expr + Send + Sync + 'static,
        I: Fn(&Row) -> Expr + Send + Sync + 'static,
        R: Fn(&Row, &Row) -> Row + Send + Sync + 'static,
    {
        self.join_with(JoinSpec::inner(table, outer_key, inner_key, result))
    }

    /// Left join against a table.
    #[must_use]
    pub fn left_join<O, I, R>(self, table: Table, outer_key: O, inner_key: I, result: R) -> Self
    where
        O: Fn(&Row) -> Expr + Send + Sync + 'static,
        I: Fn(&Row) -> Expr + Send + Sync + 'static,
        R: Fn(&Row, &Row) -> Row + Send + Sync + 'static,
    {
        self.join_with(JoinSpec::left(table, outer_key, inner_key, result))
    }

    /// Adds a prepared join.
    #[must_use]
    pub fn join_with(self, join: JoinSpec) -> Self {
        Self::Join {
            source: Box::new(self),
            joins: vec![join],
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::From(table) => write!(f, "From({})", table.name()),
            Self::FromSubquery(inner) => write!(f, "FromSubquery({inner})"),
            Self::Select { source, .. } => write!(f, "Select({source})"),
            Self::Where { source, .. } => write!(f, "Where({source})"),
            Self::OrderBy { source, .. } => write!(f, "OrderBy({source})"),
            Self::GroupBy {
                source,
                having: None,
                ..
            } => write!(f, "GroupBy({source})"),
            Self::GroupBy { source, .. } => write!(f, "GroupByHaving({source})"),
            Self::Having { source, .. } => write!(f, "Having({source})"),
            Self::Join { source, joins } => {
                write!(f, "Join({source}")?;
                for join in joins {
                    write!(f, ", {}", join.table.name())?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An aggregate over a whole query, producing a single value.
#[derive(Debug, Clone)]
pub struct ScalarQuery {
    pub func: AggregateFunc,
    pub source: Query,
}

impl ScalarQuery {
    /// Sum of the first column of `source`.
    #[must_use]
    pub const fn sum(source: Query) -> Self {
        Self {
            func: AggregateFunc::Sum,
            source,
        }
    }

    #[must_use]
    pub const fn avg(source: Query) -> Self {
        Self {
            func: AggregateFunc::Avg,
            source,
        }
    }

    #[must_use]
    pub const fn min(source: Query) -> Self {
        Self {
            func: AggregateFunc::Min,
            source,
        }
    }

    #[must_use]
    pub const fn max(source: Query) -> Self {
        Self {
            func: AggregateFunc::Max,
            source,
        }
    }

    /// Row count of `source`.
    #[must_use]
    pub const fn count(source: Query) -> Self {
        Self {
            func: AggregateFunc::Count,
            source,
        }
    }

    /// Rewrites the aggregate as a select over its source.
    #[must_use]
    pub fn into_query(self) -> Query {
        let func = self.func;
        Query::Select {
            source: Box::new(self.source),
            selector: Arc::new(move |row: &Row| {
                let expr = match func {
                    AggregateFunc::Count => Expr::count_star(),
                    AggregateFunc::Sum => row.first().sum(),
                    AggregateFunc::Avg => row.first().avg(),
                    AggregateFunc::Min => row.first().min(),
                    AggregateFunc::Max => row.first().max(),
                };
                Row::tuple([expr])
            }),
            aliases: None,
        }
    }
}
