use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlparts::{Splitter, Value};

/// SELECT col0, col1, ... FROM t0 LEFT JOIN t1 ON ... WHERE col0 = 0 AND col1 IN (SELECT ...) ...
fn build_select(n: usize) -> String {
    let columns: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let mut sql = format!("SELECT {} FROM t0", columns.join(", "));
    for i in 1..n {
        sql.push_str(&format!(" LEFT JOIN t{i} ON t{i}.id = t0.t{i}_id"));
    }
    sql.push_str(" WHERE ");
    for i in 0..n {
        if i > 0 {
            sql.push_str(" AND ");
        }
        if i % 5 == 4 {
            sql.push_str(&format!("col{i} IN (SELECT id FROM s{i} WHERE flag = 'x, y')"));
        } else {
            sql.push_str(&format!("col{i} = {i}"));
        }
    }
    sql.push_str(" ORDER BY col0 LIMIT 10");
    sql
}

fn bench_split(c: &mut Criterion) {
    let splitter = Splitter::mysql();
    let mut group = c.benchmark_group("split/select");

    for n in [1, 5, 10, 50] {
        let sql = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(splitter.split(sql)));
        });
    }

    group.finish();
}

fn bench_split_and_join(c: &mut Criterion) {
    let splitter = Splitter::mysql();
    let mut group = c.benchmark_group("split/join");

    for n in [1, 5, 10, 50] {
        let parts = splitter.split(&build_select(n)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &parts, |b, parts| {
            b.iter(|| black_box(splitter.join(parts)));
        });
    }

    group.finish();
}

fn bench_mutate_and_render(c: &mut Criterion) {
    let splitter = Splitter::mysql();
    let mut group = c.benchmark_group("query/to_sql");

    for n in [1, 5, 10, 50] {
        let sql = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| {
                let mut query = splitter.query(sql.as_str());
                query
                    .column("extra.name")
                    .unwrap()
                    .inner_join("extra", "extra.id = t0.extra_id")
                    .unwrap()
                    .where_value("extra.status", "active")
                    .unwrap()
                    .page(3, None)
                    .unwrap();
                black_box(query.to_sql().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_bind(c: &mut Criterion) {
    let splitter = Splitter::mysql();
    let mut group = c.benchmark_group("query/bind");

    for n in [5, 20, 100] {
        let placeholders = vec!["?"; n].join(", ");
        let values: Vec<Value> = (0..n)
            .map(|i| if i % 2 == 0 { Value::from(i) } else { Value::from(format!("it's {i}")) })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let mut query = splitter.query(format!("SELECT * FROM t WHERE id IN ({placeholders})"));
                query.bind(values.iter().cloned());
                black_box(query.to_sql().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_split,
    bench_split_and_join,
    bench_mutate_and_render,
    bench_bind
);
criterion_main!(benches);
