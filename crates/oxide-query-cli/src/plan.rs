//! JSON query plans.
//!
//! A plan names its tables, a starting table and a list of steps applied
//! in order. Column names may be qualified as `table.column`.
//!
//! ```json
//! {
//!   "tables": { "customers": ["Id", "Name", "Age"], "orders": ["Id", "CustomerId"] },
//!   "from": "customers",
//!   "steps": [
//!     { "join": { "table": "orders", "outer": "Id", "inner": "CustomerId" } },
//!     { "where": { "column": "Age", "op": "gt", "value": 18 } },
//!     { "select": ["customers.Id", "Name"] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use anyhow::{anyhow, bail};
use serde::Deserialize;

use oxide_query_core::{Expr, JoinSpec, Query, Row, ScalarQuery, SortKey, SqlValue, Table};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub tables: BTreeMap<String, Vec<String>>,
    pub from: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub aggregate: Option<Aggregate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Join(JoinStep),
    Where(Condition),
    GroupBy(Vec<String>),
    OrderBy(Vec<OrderKey>),
    Select(Vec<String>),
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
}

#[derive(Debug, Deserialize)]
pub struct JoinStep {
    pub table: String,
    #[serde(default)]
    pub kind: JoinKind,
    pub outer: String,
    pub inner: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct OrderKey {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateFunc {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

#[derive(Debug, Deserialize)]
pub struct Aggregate {
    pub func: AggregateFunc,
    #[serde(default)]
    pub column: Option<String>,
}

/// What a plan compiles to.
pub enum PlannedQuery {
    Rows(Query),
    Scalar(ScalarQuery),
}

impl Plan {
    /// Builds the query described by this plan.
    pub fn build(&self) -> anyhow::Result<PlannedQuery> {
        let mut query = Query::from(self.table(&self.from)?);
        for step in &self.steps {
            query = self.apply(query, step)?;
        }
        let Some(aggregate) = &self.aggregate else {
            return Ok(PlannedQuery::Rows(query));
        };
        if let Some(column) = aggregate.column.clone() {
            query = query.select(move |row| resolve(row, &column));
        }
        let scalar = match aggregate.func {
            AggregateFunc::Sum => ScalarQuery::sum(query),
            AggregateFunc::Avg => ScalarQuery::avg(query),
            AggregateFunc::Min => ScalarQuery::min(query),
            AggregateFunc::Max => ScalarQuery::max(query),
            AggregateFunc::Count => ScalarQuery::count(query),
        };
        Ok(PlannedQuery::Scalar(scalar))
    }

    fn table(&self, name: &str) -> anyhow::Result<Table> {
        self.tables
            .get(name)
            .map(|columns| Table::new(name, columns.iter().cloned()))
            .ok_or_else(|| anyhow!("table '{name}' is not declared in the plan"))
    }

    fn apply(&self, query: Query, step: &Step) -> anyhow::Result<Query> {
        let query = match step {
            Step::Join(join) => {
                let table = self.table(&join.table)?;
                let outer = join.outer.clone();
                let inner = join.inner.clone();
                let outer_key = move |row: &Row| resolve(row, &outer);
                let inner_key = move |row: &Row| resolve(row, &inner);
                let result = |outer: &Row, inner: &Row| Row::tuple([outer.clone(), inner.clone()]);
                let join_spec = match join.kind {
                    JoinKind::Inner => JoinSpec::inner(table, outer_key, inner_key, result),
                    JoinKind::Left => JoinSpec::left(table, outer_key, inner_key, result),
                };
                query.join_with(join_spec)
            }
            Step::Where(condition) => {
                let predicate = predicate(condition)?;
                query.filter(predicate)
            }
            Step::GroupBy(columns) => {
                let columns = columns.clone();
                query.group_by(move |row| columns.iter().map(|c| resolve(row, c)).collect())
            }
            Step::OrderBy(keys) => {
                let keys: Vec<(String, bool)> =
                    keys.iter().map(|k| (k.column.clone(), k.descending)).collect();
                query.order_by(move |row| {
                    keys.iter()
                        .map(|(column, descending)| {
                            let expr = resolve(row, column);
                            if *descending {
                                SortKey::desc(expr)
                            } else {
                                SortKey::asc(expr)
                            }
                        })
                        .collect::<Vec<_>>()
                })
            }
            Step::Select(columns) => {
                let columns = columns.clone();
                query.select(move |row| Row::tuple(columns.iter().map(|c| resolve(row, c))))
            }
        };
        Ok(query)
    }
}

/// Looks up `name` or `table.name` in a row.
fn resolve(row: &Row, name: &str) -> Expr {
    match name.split_once('.') {
        Some((table, column)) => row.column_of(table, column),
        None => row.column(name),
    }
}

fn predicate(condition: &Condition) -> anyhow::Result<impl Fn(&Row) -> Expr + Send + Sync + 'static> {
    let column = condition.column.clone();
    let op = condition.op;
    let values = match (&condition.value, op) {
        (serde_json::Value::Array(items), Op::In) => {
            items.iter().map(literal).collect::<anyhow::Result<Vec<_>>>()?
        }
        (_, Op::In) => bail!("'in' expects an array value for column {column}"),
        (_, Op::IsNull | Op::IsNotNull) => Vec::new(),
        (value, _) => vec![literal(value)?],
    };
    Ok(move |row: &Row| {
        let subject = resolve(row, &column);
        let value = || Expr::literal(values.first().cloned().unwrap_or(SqlValue::Null));
        match op {
            Op::Eq => subject.eq(value()),
            Op::Ne => subject.ne(value()),
            Op::Lt => subject.lt(value()),
            Op::Le => subject.le(value()),
            Op::Gt => subject.gt(value()),
            Op::Ge => subject.ge(value()),
            Op::Like => subject.like(value()),
            Op::In => subject.in_list(values.iter().cloned()),
            Op::IsNull => subject.is_null(),
            Op::IsNotNull => subject.is_not_null(),
        }
    })
}

fn literal(value: &serde_json::Value) -> anyhow::Result<SqlValue> {
    match value {
        serde_json::Value::Null => Ok(SqlValue::Null),
        serde_json::Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Int)
            .or_else(|| n.as_f64().map(SqlValue::Float))
            .ok_or_else(|| anyhow!("unsupported number {n}")),
        serde_json::Value::String(s) => Ok(SqlValue::Text(s.clone())),
        other => bail!("unsupported literal {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_query_core::{compile_query, compile_scalar_query, GenericDialect, SqliteDialect};

    fn plan(json: &str) -> Plan {
        serde_json::from_str(json).unwrap()
    }

    fn rows(plan: &Plan) -> Query {
        match plan.build().unwrap() {
            PlannedQuery::Rows(query) => query,
            PlannedQuery::Scalar(_) => panic!("expected a row query"),
        }
    }

    #[test]
    fn test_filter_plan() {
        let plan = plan(
            r#"{
                "tables": { "customers": ["Id", "Name", "Age"] },
                "from": "customers",
                "steps": [
                    { "where": { "column": "Age", "op": "gt", "value": 18 } },
                    { "select": ["Name"] }
                ]
            }"#,
        );
        let compiled = compile_query(&rows(&plan), &GenericDialect::new()).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT\n    a0.Name AS Name\nFROM\n    customers a0\nWHERE\n    a0.Age > @p0"
        );
        assert_eq!(compiled.params["@p0"], SqlValue::Int(18));
    }

    #[test]
    fn test_join_group_order_plan() {
        let plan = plan(
            r#"{
                "tables": {
                    "customers": ["Id", "Name"],
                    "orders": ["Id", "CustomerId", "Amount"]
                },
                "from": "customers",
                "steps": [
                    { "join": { "table": "orders", "kind": "left", "outer": "Id", "inner": "CustomerId" } },
                    { "groupBy": ["Name"] },
                    { "orderBy": [ { "column": "Name", "descending": true } ] },
                    { "select": ["Name"] }
                ]
            }"#,
        );
        let compiled = compile_query(&rows(&plan), &SqliteDialect::new()).unwrap();
        assert!(compiled.sql.contains("LEFT JOIN orders a1 ON a0.Id = a1.CustomerId"));
        assert!(compiled.sql.contains("GROUP BY\n    a0.Name"));
        assert!(compiled.sql.ends_with("ORDER BY\n    a0.Name DESC"));
    }

    #[test]
    fn test_qualified_columns_and_in_list() {
        let plan = plan(
            r#"{
                "tables": { "customers": ["Id"], "orders": ["Id", "CustomerId"] },
                "from": "customers",
                "steps": [
                    { "join": { "table": "orders", "outer": "Id", "inner": "CustomerId" } },
                    { "where": { "column": "orders.Id", "op": "in", "value": [1, 2] } },
                    { "select": ["customers.Id", "orders.Id"] }
                ]
            }"#,
        );
        let compiled = compile_query(&rows(&plan), &GenericDialect::new()).unwrap();
        assert!(compiled.sql.contains("a0.Id AS CustomerId,"), "{}", compiled.sql);
        assert!(compiled.sql.contains("a1.Id AS OrderId"), "{}", compiled.sql);
        assert!(compiled.sql.ends_with("a1.Id IN (@p0, @p1)"), "{}", compiled.sql);
    }

    #[test]
    fn test_aggregate_plan() {
        let plan = plan(
            r#"{
                "tables": { "orders": ["Id", "Amount"] },
                "from": "orders",
                "steps": [ { "where": { "column": "Amount", "op": "isNotNull" } } ],
                "aggregate": { "func": "sum", "column": "Amount" }
            }"#,
        );
        let PlannedQuery::Scalar(query) = plan.build().unwrap() else {
            panic!("expected a scalar query");
        };
        let compiled = compile_scalar_query(&query, &GenericDialect::new()).unwrap();
        assert!(compiled.sql.starts_with("SELECT\n    SUM(a0.Amount) AS Proj0"));
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        let plan = plan(r#"{ "tables": {}, "from": "ghosts" }"#);
        let err = plan.build().err().unwrap();
        assert!(err.to_string().contains("ghosts"));
    }

    #[test]
    fn test_in_requires_array() {
        let plan = plan(
            r#"{
                "tables": { "t": ["A"] },
                "from": "t",
                "steps": [ { "where": { "column": "A", "op": "in", "value": 3 } } ]
            }"#,
        );
        assert!(plan.build().is_err());
    }
}
