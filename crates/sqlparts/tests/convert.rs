use sqlparts::{Builder, DialectKind, SplitError, Splitter};

fn count(sql: &str) -> String {
    Splitter::mysql().query(sql).count().unwrap().to_sql().unwrap()
}

fn count_all(sql: &str) -> String {
    Splitter::mysql().query(sql).count_all().unwrap().to_sql().unwrap()
}

const JOINED: &str = "SELECT * FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10";

#[test]
fn simple() {
    assert_eq!(count("SELECT * FROM foo"), "SELECT COUNT(*) FROM foo");
}

#[test]
fn select_with_limit() {
    assert_eq!(
        count(&format!("{JOINED} LIMIT 50")),
        "SELECT LEAST(COUNT(*), 50) FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10"
    );
    assert_eq!(
        count(&format!("{JOINED} LIMIT 50 OFFSET 200")),
        "SELECT LEAST(COUNT(*) - 200, 50) FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10"
    );
}

#[test]
fn all_rows_ignores_limit() {
    assert_eq!(
        count_all(&format!("{JOINED} LIMIT 50")),
        "SELECT COUNT(*) FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10"
    );
}

#[test]
fn distinct_and_group_by() {
    assert_eq!(count("SELECT DISTINCT id FROM foo"), "SELECT COUNT(DISTINCT id) FROM foo");
    assert_eq!(
        count("SELECT * FROM foo GROUP BY abc, xyz"),
        "SELECT COUNT(DISTINCT abc, xyz) FROM foo"
    );
}

#[test]
fn having_is_counted_as_derived_table() {
    assert_eq!(
        count("SELECT * FROM foo GROUP BY abc, xyz HAVING COUNT(*) > 10"),
        "SELECT COUNT(*) FROM (SELECT * FROM foo GROUP BY abc, xyz HAVING COUNT(*) > 10) AS q"
    );
}

#[test]
fn update() {
    assert_eq!(
        count("UPDATE foo INNER JOIN bar ON foo.id = bar.foo_id SET xyz = 20 WHERE abc = 10 LIMIT 50"),
        "SELECT LEAST(COUNT(*), 50) FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10"
    );
}

#[test]
fn delete() {
    assert_eq!(
        count("DELETE FROM foo WHERE abc = 10 LIMIT 50"),
        "SELECT LEAST(COUNT(*), 50) FROM foo WHERE abc = 10"
    );
    assert_eq!(
        count("DELETE foo.* FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10"),
        "SELECT COUNT(*) FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10"
    );
}

#[test]
fn built_query() {
    let mut query = Builder::new(DialectKind::MySql).select(["id"]).unwrap();
    query
        .from("users")
        .unwrap()
        .where_value("active", true)
        .unwrap()
        .limit(10)
        .unwrap();
    assert_eq!(
        query.count().unwrap().to_sql().unwrap(),
        "SELECT LEAST(COUNT(*), 10) FROM `users` WHERE `active` = TRUE"
    );
}

#[test]
fn statement_without_table() {
    let err = Splitter::mysql().query("SET @x = 1").count().unwrap_err();
    assert_eq!(err, SplitError::build("Unable to count rows for SET query."));
}
