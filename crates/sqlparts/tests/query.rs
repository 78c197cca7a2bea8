use sqlparts::{
    Assign, Builder, DialectKind, PartOptions, QueryType, QuoteMode, SortOrder, SplitError,
    Splitter, Value,
};

fn mysql() -> Builder {
    Builder::new(DialectKind::MySql)
}

#[test]
fn paged_select() {
    let mut query = mysql().select(["id", "name"]).unwrap();
    query
        .from("users")
        .unwrap()
        .where_value("status", "active")
        .unwrap()
        .order_by(["created_at"], SortOrder::Desc)
        .unwrap()
        .page(2, Some(25))
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT `id`, `name` FROM `users` WHERE `status` = 'active' ORDER BY `created_at` DESC LIMIT 25 OFFSET 25"
    );
    assert_eq!(query.row_limit().unwrap(), Some(25));
    assert_eq!(query.row_offset().unwrap(), Some(25));
}

#[test]
fn existing_statement_is_extended() {
    let mut query = Splitter::mysql()
        .query("SELECT id, description FROM `test` WHERE id > 10 ORDER BY name LIMIT 10");
    query
        .column("abc")
        .unwrap()
        .left_join("abc", "test.id = abc.idTest")
        .unwrap()
        .where_value("status", 1)
        .unwrap()
        .order_by(["created"], SortOrder::Asc)
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT id, description, `abc` FROM `test` LEFT JOIN `abc` ON `test`.`id` = `abc`.`idTest` WHERE (id > 10) AND (`status` = 1) ORDER BY `created` ASC, name LIMIT 10"
    );
    assert_eq!(
        query.base_statement().to_sql().unwrap(),
        "SELECT id, description FROM `test` WHERE id > 10 ORDER BY name LIMIT 10"
    );
}

#[test]
fn placeholders_are_bound_at_render() {
    let mut query = Splitter::mysql()
        .query("SELECT id FROM users WHERE name LIKE %?% AND group_id IN :groups");
    query.where_value("age > ?", 18).unwrap();
    query.bind(["jo"]);
    query.bind_named([("groups", Value::from(vec![1, 2, 3]))]);

    assert_eq!(
        query.to_sql().unwrap(),
        "SELECT id FROM users WHERE (name LIKE '%jo%' AND group_id IN (1, 2, 3)) AND (`age` > 18)"
    );
}

#[test]
fn insert_rows() {
    let mut query = mysql().insert();
    query
        .into_table("users")
        .unwrap()
        .columns(["name", "email"])
        .unwrap()
        .values_rows([
            vec![Value::from("a"), Value::from("a@example.com")],
            vec![Value::from("b"), Value::Null],
        ])
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap(),
        "INSERT INTO `users` (`name`, `email`) VALUES ('a', 'a@example.com'), ('b', DEFAULT)"
    );
    assert_eq!(
        query.split_values_unquoted().unwrap(),
        vec![
            vec![Value::from("a"), Value::from("a@example.com")],
            vec![Value::from("b"), Value::Null],
        ]
    );
}

#[test]
fn upsert_with_assignments() {
    let mut query = mysql().insert();
    query
        .into_table("counters")
        .unwrap()
        .set_all([("name", Value::from("hits")), ("total", Value::from(1))])
        .unwrap()
        .on_duplicate_key_update_set(
            [("total", Assign::expression("total + 1"))],
            PartOptions::new(),
        )
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap(),
        "INSERT INTO `counters` SET `name` = 'hits', `total` = 1 ON DUPLICATE KEY UPDATE `total` = `total` + 1"
    );
}

#[test]
fn update_with_join() {
    let mut query = mysql().update(Some("orders")).unwrap();
    query
        .inner_join("customers", "orders.customer_id = customers.id")
        .unwrap()
        .set("orders.status", "closed")
        .unwrap()
        .where_value("customers.active", false)
        .unwrap()
        .limit(100)
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap(),
        "UPDATE `orders` INNER JOIN `customers` ON `orders`.`customer_id` = `customers`.`id` SET `orders`.`status` = 'closed' WHERE `customers`.`active` = FALSE LIMIT 100"
    );

    let tables: Vec<String> = query.split_tables().unwrap().into_keys().collect();
    assert_eq!(tables, ["orders", "customers"]);
}

#[test]
fn replacing_parts() {
    let mut query = Splitter::mysql().query("SELECT * FROM foo WHERE a = 1 GROUP BY b");
    query
        .columns_with(["x", "y"], PartOptions::replace())
        .unwrap()
        .and_where_with("c = 2", None, PartOptions::replace().quote(QuoteMode::None))
        .unwrap()
        .group_by_with(["d"], PartOptions::replace())
        .unwrap();

    assert_eq!(query.to_sql().unwrap(), "SELECT `x`, `y` FROM foo WHERE c = 2 GROUP BY `d`");
}

#[test]
fn subquery_of_built_statement() {
    let query = Splitter::mysql()
        .query("SELECT * FROM foo WHERE id IN (SELECT foo_id FROM bar WHERE x = 1)");
    let sub = query.subquery(1).unwrap();
    assert_eq!(sub.to_sql().unwrap(), "SELECT foo_id FROM bar WHERE x = 1");
    assert_eq!(sub.query_type(), Some(QueryType::Select));

    assert_eq!(
        query.subquery(2).unwrap_err(),
        SplitError::SubqueryOutOfRange { index: 2, count: 1 }
    );
}

#[test]
fn failed_mutation_keeps_query() {
    let mut query = Splitter::mysql().query("SELECT * FROM foo");
    let before = query.to_sql().unwrap();

    assert!(query.and_where("a = 1) OR (1 = 1").is_err());
    assert!(query.set("a", 1).is_err());
    assert_eq!(query.to_sql().unwrap(), before);
}

#[test]
fn generic_dialect() {
    let mut query = Builder::new(DialectKind::Generic).select(["id"]).unwrap();
    query
        .from("users")
        .unwrap()
        .where_value("name", "it's")
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap(),
        r#"SELECT "id" FROM "users" WHERE "name" = 'it''s'"#
    );
}
