mod common;

use common::{compile, compile_dml, compile_err, compile_with, customers, lines, orders};
use oxide_query_core::{
    compile_scalar_query, CompileError, Delete, GenericDialect, Insert, JoinSpec, Query, Row,
    ScalarQuery, SortKey, SqlValue, SqliteDialect, Table, Update,
};

#[test]
fn test_filter_on_table() {
    let query = Query::from(customers()).filter(|c| c.column("Age").gt(18));
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a0.Id AS Id,",
            "    a0.Name AS Name,",
            "    a0.Age AS Age,",
            "    a0.Email AS Email",
            "FROM",
            "    customers a0",
            "WHERE",
            "    a0.Age > @p0",
        ])
    );
    assert_eq!(compiled.params.len(), 1);
    assert_eq!(compiled.params["@p0"], SqlValue::Int(18));
}

#[test]
fn test_chained_filters_share_one_where() {
    let query = Query::from(customers())
        .filter(|c| c.column("Age").gt(18))
        .filter(|c| c.column("Name").ne("Bob"));
    let compiled = compile(&query);
    assert!(!compiled.sql.contains("FROM ("), "{}", compiled.sql);
    assert_eq!(compiled.sql.matches("WHERE").count(), 1);
    assert!(
        compiled.sql.ends_with("WHERE\n    (a0.Age > @p0) AND (a0.Name != @p1)"),
        "{}",
        compiled.sql
    );
    assert_eq!(compiled.params["@p1"], SqlValue::Text("Bob".into()));
}

#[test]
fn test_chained_selects_compose() {
    let query = Query::from(customers())
        .select(|c| Row::tuple([c.column("Id"), c.column("Name")]))
        .select(|t| Row::tuple([t.column("Id"), t.column("Name")]));
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a0.Id AS Id,",
            "    a0.Name AS Name",
            "FROM",
            "    customers a0",
        ])
    );
}

#[test]
fn test_join_resolves_colliding_column_names() {
    let query = Query::from(customers())
        .join(
            orders(),
            |c| c.column("Id"),
            |o| o.column("CustomerId"),
            |c, o| Row::tuple([c.clone(), o.clone()]),
        )
        .select(|r| {
            Row::tuple([
                r.column_of("customers", "Id"),
                r.column_of("orders", "Id"),
                r.column("Amount"),
            ])
        });
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a0.Id AS CustomerId,",
            "    a1.Id AS OrderId,",
            "    a1.Amount AS Amount",
            "FROM",
            "    customers a0",
            "    INNER JOIN orders a1 ON a0.Id = a1.CustomerId",
        ])
    );
    assert!(compiled.params.is_empty());
}

#[test]
fn test_delete_statement() {
    let compiled = compile_dml(Delete::from(customers()).filter(|c| c.column("Id").eq(200)));
    assert_eq!(compiled.sql, "DELETE FROM customers WHERE customers.Id = @p0");
    assert_eq!(compiled.params["@p0"], SqlValue::Int(200));
}

#[test]
fn test_update_and_insert_statements() {
    let update = compile_dml(
        Update::table(customers())
            .set_value("Email", None::<String>)
            .filter(|c| c.column("Age").lt(13)),
    );
    assert_eq!(
        update.sql,
        "UPDATE customers SET Email = NULL WHERE customers.Age < @p0"
    );

    let insert = compile_dml(Insert::into(orders()).value("CustomerId", 1).value("Amount", 9.5));
    assert_eq!(
        insert.sql,
        "INSERT INTO orders (CustomerId, Amount) VALUES (@p0, @p1)"
    );
    assert_eq!(insert.params["@p1"], SqlValue::Float(9.5));
}

#[test]
fn test_self_join_aliases_each_instance() {
    let customers = customers();
    let query = Query::from(customers.clone())
        .join(
            customers,
            |c| c.column("Email"),
            |other| other.column("Email"),
            |c, other| Row::tuple([c.column("Id"), other.column("Id")]),
        )
        .filter(|r| r.field(0).ne(r.field(1)));
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a0.Id AS CustomerId,",
            "    a1.Id AS CustomerId1",
            "FROM",
            "    customers a0",
            "    INNER JOIN customers a1 ON a0.Email = a1.Email",
            "WHERE",
            "    a0.Id != a1.Id",
        ])
    );
}

#[test]
fn test_left_join_aliases_name_projection() {
    let join = JoinSpec::left(
        orders(),
        |c| c.column("Id"),
        |o| o.column("CustomerId"),
        |c, o| Row::tuple([c.column("Name"), o.column("Amount")]),
    )
    .with_aliases(["CustomerName", "OrderAmount"]);
    let compiled = compile(&Query::from(customers()).join_with(join));
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a0.Name AS CustomerName,",
            "    a1.Amount AS OrderAmount",
            "FROM",
            "    customers a0",
            "    LEFT JOIN orders a1 ON a0.Id = a1.CustomerId",
        ])
    );
}

#[test]
fn test_group_by_with_having_and_order() {
    let query = Query::from(orders())
        .group_by(|o| vec![o.column("CustomerId")])
        .having(|_, agg| agg.sum(|o| o.column("Amount")).gt(100))
        .order_by(|g| [SortKey::desc(g.source().column("Amount").sum())])
        .select_as(
            |g| Row::tuple([g.column("CustomerId"), g.source().column("Amount").sum()]),
            ["CustomerId", "Total"],
        );
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a0.CustomerId AS CustomerId,",
            "    SUM(a0.Amount) AS Total",
            "FROM",
            "    orders a0",
            "GROUP BY",
            "    a0.CustomerId",
            "HAVING",
            "    SUM(a0.Amount) > @p0",
            "ORDER BY",
            "    SUM(a0.Amount) DESC",
        ])
    );
}

#[test]
fn test_select_over_subquery_is_derived_table() {
    let adults = Query::from(customers())
        .filter(|c| c.column("Age").ge(18))
        .select(|c| Row::tuple([c.column("Id"), c.column("Name")]));
    let query = Query::subquery(adults)
        .order_by(|r| [r.column("Name")])
        .select(|r| r.column("Name"));
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a1.Name AS Name",
            "FROM (",
            "    SELECT",
            "        a0.Id AS Id,",
            "        a0.Name AS Name",
            "    FROM",
            "        customers a0",
            "    WHERE",
            "        a0.Age >= @p0",
            ") a1",
            "ORDER BY",
            "    a1.Name ASC",
        ])
    );
}

#[test]
fn test_derived_table_keeps_joined_row_shape() {
    let query = Query::from(customers())
        .join(
            orders(),
            |c| c.column("Id"),
            |o| o.column("CustomerId"),
            |c, o| Row::tuple([c.clone(), o.clone()]),
        )
        .order_by(|r| [r.column("Name")])
        .filter(|r| r.column_of("orders", "Id").gt(5))
        .select(|r| r.item(1));
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a2.OrderId AS OrderId,",
            "    a2.CustomerId1 AS CustomerId1,",
            "    a2.Amount AS Amount",
            "FROM (",
            "    SELECT",
            "        a0.Id AS CustomerId,",
            "        a0.Name AS Name,",
            "        a0.Age AS Age,",
            "        a0.Email AS Email,",
            "        a1.Id AS OrderId,",
            "        a1.CustomerId AS CustomerId1,",
            "        a1.Amount AS Amount",
            "    FROM",
            "        customers a0",
            "        INNER JOIN orders a1 ON a0.Id = a1.CustomerId",
            "    ORDER BY",
            "        a0.Name ASC",
            ") a2",
            "WHERE",
            "    a2.OrderId > @p0",
        ])
    );
    assert_eq!(compiled.params["@p0"], SqlValue::Int(5));
}

#[test]
fn test_in_subquery_shares_parameter_sequence() {
    let big_spenders = Query::from(orders())
        .filter(|o| o.column("Amount").gt(1000))
        .select(|o| o.column("CustomerId"));
    let query = Query::from(customers())
        .filter(move |c| c.column("Age").lt(30).and(c.column("Id").in_subquery(big_spenders.clone())))
        .select(|c| c.column("Name"));
    let compiled = compile(&query);
    assert_eq!(
        compiled.sql,
        lines(&[
            "SELECT",
            "    a0.Name AS Name",
            "FROM",
            "    customers a0",
            "WHERE",
            "    (a0.Age < @p0) AND (a0.Id IN (",
            "        SELECT",
            "            a1.CustomerId AS CustomerId",
            "        FROM",
            "            orders a1",
            "        WHERE",
            "            a1.Amount > @p1",
            "    ))",
        ])
    );
    let keys: Vec<&str> = compiled.params.keys().map(String::as_str).collect();
    assert_eq!(keys, ["@p0", "@p1"]);
}

#[test]
fn test_scalar_queries() {
    let dialect = GenericDialect::new();
    let count = compile_scalar_query(
        &ScalarQuery::count(Query::from(customers()).filter(|c| c.column("Age").gt(65))),
        &dialect,
    )
    .unwrap();
    assert_eq!(
        count.sql,
        lines(&[
            "SELECT",
            "    COUNT(*) AS Proj0",
            "FROM",
            "    customers a0",
            "WHERE",
            "    a0.Age > @p0",
        ])
    );

    let total = compile_scalar_query(
        &ScalarQuery::sum(Query::from(orders()).select(|o| o.column("Amount"))),
        &dialect,
    )
    .unwrap();
    assert_eq!(
        total.sql,
        lines(&["SELECT", "    SUM(a0.Amount) AS Proj0", "FROM", "    orders a0"])
    );
}

#[test]
fn test_sqlite_dialect_placeholders_and_booleans() {
    let flags = Table::new("flags", ["Id", "Enabled", "Label"]);
    let query = Query::from(flags)
        .filter(|f| f.column("Enabled").eq(true))
        .select(|f| f.column("Label").concat("!"));
    let compiled = compile_with(&query, &SqliteDialect::new());
    assert!(compiled.sql.contains("a0.Label || :p1 AS Proj0"), "{}", compiled.sql);
    assert!(compiled.sql.ends_with("a0.Enabled = :p0"), "{}", compiled.sql);
    assert_eq!(compiled.params[":p0"], SqlValue::Int(1));
}

#[test]
fn test_unknown_column_is_reported() {
    let err = compile_err(&Query::from(customers()).filter(|c| c.column("Salary").gt(1)));
    assert_eq!(
        err,
        CompileError::UnknownColumn {
            name: String::from("Salary")
        }
    );
}

#[test]
fn test_double_having_is_unsupported() {
    let query = Query::from(orders())
        .group_by(|o| vec![o.column("CustomerId")])
        .having(|_, agg| agg.count().gt(1))
        .having(|_, agg| agg.count().lt(9));
    assert!(matches!(
        compile_err(&query),
        CompileError::UnsupportedShape { node: "Having", .. }
    ));
}

#[test]
fn test_foreign_column_is_missing_alias() {
    let stray = customers().row();
    let id = stray.columns()[0].clone();
    let query = Query::from(customers()).filter(move |_| id.clone().eq(1));
    assert!(matches!(
        compile_err(&query),
        CompileError::MissingAlias { node: "Column", .. }
    ));
}
