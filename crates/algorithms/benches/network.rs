//! Benchmarks for graph construction and component labelling

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linkmap_algorithms::network::{build_graph, find_components};
use linkmap_core::LinkRow;

/// Chains of 50 cores with a few cross links, split into islands of `size / 50`
fn create_links(size: usize) -> Vec<LinkRow> {
    let mut rows = Vec::with_capacity(size * 2);
    let mut id = 0;
    for core in 0..size as i64 {
        if core % 50 != 49 {
            id += 1;
            rows.push(LinkRow::new(id, core, core + 1, 1, 100.0 + (core % 17) as f64));
        }
        if core % 7 == 0 && core + 5 < size as i64 && core / 50 == (core + 5) / 50 {
            id += 1;
            rows.push(LinkRow::new(id, core + 5, core, 2, 250.0));
        }
    }
    rows
}

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for size in [100, 500, 1000].iter() {
        let rows = create_links(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| build_graph(black_box(&rows)).unwrap())
        });
    }

    group.finish();
}

fn bench_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_components");

    for size in [100, 500, 1000].iter() {
        let graph = build_graph(&create_links(*size)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| find_components(black_box(&graph)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_graph, bench_components);
criterion_main!(benches);
