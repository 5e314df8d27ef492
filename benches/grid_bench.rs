//! Benchmarks for result parsing, grid recomputation and CSV export
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fluxgrid::export;
use fluxgrid::result::parse_body;
use fluxgrid::{ColumnPredicate, ResultGrid, TabularDataset};

fn create_test_body(count: usize) -> String {
    let values: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"["2024-01-01T00:00:{:02}Z","server{:02}",{},"region-{}"]"#,
                i % 60,
                i % 16,
                i as f64 * 0.5,
                i % 4
            )
        })
        .collect();

    format!(
        r#"{{"results":[{{"series":[{{"name":"cpu","columns":["time","host","value","region"],"values":[{}]}}]}}]}}"#,
        values.join(",")
    )
}

fn create_test_dataset(count: usize) -> TabularDataset {
    parse_body(&create_test_body(count)).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for size in [100, 1000, 10000] {
        let body = create_test_body(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("parse_{}", size), |b| {
            b.iter(|| parse_body(black_box(&body)).unwrap())
        });
    }

    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid");

    for size in [1000, 10000] {
        let dataset = create_test_dataset(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("global_filter_{}", size), |b| {
            let mut grid = ResultGrid::new(dataset.clone());
            b.iter(|| grid.set_global_filter(black_box("server0")))
        });

        group.bench_function(format!("column_filter_{}", size), |b| {
            let mut grid = ResultGrid::new(dataset.clone());
            b.iter(|| grid.set_column_filter(3, black_box(ColumnPredicate::equals("region-2"))))
        });

        group.bench_function(format!("sort_desc_{}", size), |b| {
            let mut grid = ResultGrid::new(dataset.clone());
            b.iter(|| grid.sort_by(black_box(1), false))
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for size in [1000, 10000] {
        let mut grid = ResultGrid::new(create_test_dataset(size));
        grid.sort_by(2, true);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("csv_{}", size), |b| {
            b.iter(|| export::export_grid(black_box(&grid)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_grid, bench_export);
criterion_main!(benches);
