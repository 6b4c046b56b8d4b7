//! Benchmarks for focal statistics

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linkmap_algorithms::statistics::{focal_statistics, FocalParams, FocalStatistic};
use linkmap_core::{GeoTransform, Neighborhood, Raster};

fn create_cwd(size: usize) -> Raster<f64> {
    let mut cwd = Raster::new(size, size);
    cwd.set_transform(GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0));

    // distance-like surface growing away from the top left corner
    for row in 0..size {
        for col in 0..size {
            let d = ((row * row + col * col) as f64).sqrt() * 30.0;
            let variation = ((row * 7 + col * 13) % 100) as f64;
            cwd.set(row, col, d + variation).unwrap();
        }
    }
    cwd
}

fn bench_annulus_min(c: &mut Criterion) {
    let mut group = c.benchmark_group("focal_annulus_min");
    let params = FocalParams {
        neighborhood: Neighborhood::annulus(149.0, 150.0),
        statistic: FocalStatistic::Min,
    };

    for size in [256, 512, 1024].iter() {
        let cwd = create_cwd(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| focal_statistics(black_box(&cwd), &params).unwrap())
        });
    }

    group.finish();
}

fn bench_circle_max(c: &mut Criterion) {
    let mut group = c.benchmark_group("focal_circle_max");
    let params = FocalParams {
        neighborhood: Neighborhood::circle(150.0),
        statistic: FocalStatistic::Max,
    };

    for size in [256, 512].iter() {
        let cwd = create_cwd(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| focal_statistics(black_box(&cwd), &params).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_annulus_min, bench_circle_max);
criterion_main!(benches);
