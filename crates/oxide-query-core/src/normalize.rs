//! Clause fusion.
//!
//! Chained combinators naturally produce trees such as `Where(Where(..))`.
//! The normalizer rewrites them into the canonical nesting the generator
//! understands, so that each chain compiles to one statement instead of a
//! stack of derived tables.
//!
//! Rules, tried at the root of each pass:
//!
//! | pattern | result |
//! |---------|--------|
//! | `Where(Where(q, p1), p2)` | `Where(q, p1 AND p2)` |
//! | `OrderBy(OrderBy(q, k1), k2)` | `OrderBy(q, k1 ++ k2)` |
//! | `Select(Select(q, f1), f2)` | `Select(q, f2 . f1)` |
//! | `Having(GroupBy(q, k), p)` | `GroupBy(q, k, having = p)` |
//! | `Join(Join(q, j1), j2)` | `Join(q, j1 ++ j2)` |
//!
//! When no rule fires at the root, the pass descends into the single query
//! child. Passes repeat until nothing changes, then a non-select root is
//! wrapped in an identity projection.

use std::sync::Arc;

use tracing::trace;

use crate::query::Query;
use crate::row::Row;

/// Normalizes a query to fixpoint and roots it at a `Select`.
#[must_use]
pub fn normalize(query: &Query) -> Query {
    let mut current = query.clone();
    let mut pass = 0_usize;
    loop {
        pass += 1;
        let (next, changed) = rewrite(current);
        trace!(pass, changed, shape = %next, "normalization pass");
        current = next;
        if !changed {
            break;
        }
    }
    match current {
        select @ Query::Select { .. } => select,
        other => identity_select(other),
    }
}

/// Wraps a query in a projection that passes its row through unchanged.
pub(crate) fn identity_select(source: Query) -> Query {
    Query::Select {
        source: Box::new(source),
        selector: Arc::new(Row::clone),
        aliases: None,
    }
}

fn rewrite(query: Query) -> (Query, bool) {
    match query {
        from @ Query::From(_) => (from, false),
        Query::FromSubquery(inner) => {
            let (inner, changed) = rewrite(*inner);
            (Query::FromSubquery(Box::new(inner)), changed)
        }
        Query::Where { source, predicate } => match *source {
            Query::Where {
                source: inner,
                predicate: first,
            } => {
                let fused = Query::Where {
                    source: inner,
                    predicate: Arc::new(move |row: &Row| first(row).and(predicate(row))),
                };
                (fused, true)
            }
            child => {
                let (child, changed) = rewrite(child);
                let rebuilt = Query::Where {
                    source: Box::new(child),
                    predicate,
                };
                (rebuilt, changed)
            }
        },
        Query::OrderBy { source, keys } => match *source {
            Query::OrderBy {
                source: inner,
                keys: first,
            } => {
                let fused = Query::OrderBy {
                    source: inner,
                    keys: Arc::new(move |row: &Row| {
                        let mut all = first(row);
                        all.extend(keys(row));
                        all
                    }),
                };
                (fused, true)
            }
            child => {
                let (child, changed) = rewrite(child);
                let rebuilt = Query::OrderBy {
                    source: Box::new(child),
                    keys,
                };
                (rebuilt, changed)
            }
        },
        Query::Select {
            source,
            selector,
            aliases,
        } => match *source {
            Query::Select {
                source: inner,
                selector: first,
                ..
            } => {
                let fused = Query::Select {
                    source: inner,
                    selector: Arc::new(move |row: &Row| selector(&first(row))),
                    aliases,
                };
                (fused, true)
            }
            child => {
                let (child, changed) = rewrite(child);
                let rebuilt = Query::Select {
                    source: Box::new(child),
                    selector,
                    aliases,
                };
                (rebuilt, changed)
            }
        },
        Query::Having { source, predicate } => match *source {
            Query::GroupBy {
                source: inner,
                keys,
                having: None,
            } => {
                let fused = Query::GroupBy {
                    source: inner,
                    keys,
                    having: Some(predicate),
                };
                (fused, true)
            }
            child => {
                let (child, changed) = rewrite(child);
                let rebuilt = Query::Having {
                    source: Box::new(child),
                    predicate,
                };
                (rebuilt, changed)
            }
        },
        Query::GroupBy {
            source,
            keys,
            having,
        } => {
            let (child, changed) = rewrite(*source);
            let rebuilt = Query::GroupBy {
                source: Box::new(child),
                keys,
                having,
            };
            (rebuilt, changed)
        }
        Query::Join { source, joins } => match *source {
            Query::Join {
                source: inner,
                joins: mut first,
            } => {
                first.extend(joins);
                let fused = Query::Join {
                    source: inner,
                    joins: first,
                };
                (fused, true)
            }
            child => {
                let (child, changed) = rewrite(child);
                let rebuilt = Query::Join {
                    source: Box::new(child),
                    joins,
                };
                (rebuilt, changed)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortKey;
    use crate::table::Table;

    fn customers() -> Table {
        Table::new("customers", ["Id", "Name", "Age"])
    }

    fn orders() -> Table {
        Table::new("orders", ["Id", "CustomerId", "Amount"])
    }

    #[test]
    fn test_wraps_non_select_root() {
        let q = normalize(&Query::from(customers()));
        assert_eq!(q.to_string(), "Select(From(customers))");
    }

    #[test]
    fn test_fuses_where_chain() {
        let q = Query::from(customers())
            .filter(|c| c.column("Age").gt(18))
            .filter(|c| c.column("Age").lt(65))
            .filter(|c| c.column("Name").ne("Bob"));
        assert_eq!(normalize(&q).to_string(), "Select(Where(From(customers)))");
    }

    #[test]
    fn test_fuses_select_chain() {
        let q = Query::from(customers())
            .select(|c| Row::tuple([c.column("Id"), c.column("Name")]))
            .select(|t| Row::tuple([t.field(0), t.field(1)]));
        assert_eq!(normalize(&q).to_string(), "Select(From(customers))");
    }

    #[test]
    fn test_fuses_order_by_keeping_first_keys_primary() {
        let q = Query::from(customers())
            .order_by(|c| [SortKey::asc(c.column("Name"))])
            .order_by(|c| [SortKey::desc(c.column("Age"))]);
        let Query::Select { source, .. } = normalize(&q) else {
            panic!("expected select root");
        };
        let Query::OrderBy { keys, .. } = *source else {
            panic!("expected fused order by");
        };
        let row = Row::Table(customers().row());
        let keys = keys(&row);
        assert_eq!(keys.len(), 2);
        assert!(keys[0].expr.same(&row.column("Name")));
        assert!(keys[1].expr.same(&row.column("Age")));
    }

    #[test]
    fn test_fuses_having_into_group_by() {
        let q = Query::from(orders())
            .group_by(|o| vec![o.column("CustomerId")])
            .having(|_, agg| agg.count().gt(2));
        assert_eq!(
            normalize(&q).to_string(),
            "Select(GroupByHaving(From(orders)))"
        );
    }

    #[test]
    fn test_second_having_is_left_in_place() {
        let q = Query::from(orders())
            .group_by_having(|o| vec![o.column("CustomerId")], |_, agg| agg.count().gt(2))
            .having(|_, agg| agg.count().lt(10));
        assert_eq!(
            normalize(&q).to_string(),
            "Select(Having(GroupByHaving(From(orders))))"
        );
    }

    #[test]
    fn test_fuses_join_chain() {
        let items = Table::new("items", ["Id", "OrderId"]);
        let q = Query::from(customers())
            .join(
                orders(),
                |c| c.column("Id"),
                |o| o.column("CustomerId"),
                |c, o| Row::tuple([c.clone(), o.clone()]),
            )
            .join(
                items,
                |r| r.column_of("orders", "Id"),
                |i| i.column("OrderId"),
                |r, i| Row::tuple([r.clone(), i.clone()]),
            );
        assert_eq!(
            normalize(&q).to_string(),
            "Select(Join(From(customers), orders, items))"
        );
    }

    #[test]
    fn test_fuses_below_other_clauses() {
        let q = Query::subquery(
            Query::from(customers())
                .filter(|c| c.column("Age").gt(18))
                .filter(|c| c.column("Age").lt(65)),
        )
        .order_by(|r| [r.column("Name")]);
        assert_eq!(
            normalize(&q).to_string(),
            "Select(OrderBy(FromSubquery(Where(From(customers)))))"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let q = Query::from(customers())
            .filter(|c| c.column("Age").gt(18))
            .filter(|c| c.column("Age").lt(65))
            .select(|c| c.column("Name"))
            .select(|r| r.first());
        let once = normalize(&q);
        let twice = normalize(&once);
        assert_eq!(once.to_string(), twice.to_string());
    }
}
