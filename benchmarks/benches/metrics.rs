use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mlchain::{AbsoluteLoss, RegressionMetrics, SquaredLoss};
use ndarray::Array1;

fn bench_regression_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression_metrics");
    for size in [100, 10_000, 100_000] {
        let labels: Array1<f32> = (0..size).map(|i| i as f32 * 0.1).collect();
        let scores: Array1<f32> = (0..size).map(|i| i as f32 * 0.1 + 0.5).collect();

        group.bench_with_input(BenchmarkId::new("squared", size), &size, |b, _| {
            b.iter(|| {
                black_box(RegressionMetrics::compute(
                    black_box(labels.view()),
                    black_box(scores.view()),
                    &SquaredLoss,
                ))
            });
        });
        group.bench_with_input(BenchmarkId::new("absolute", size), &size, |b, _| {
            b.iter(|| {
                black_box(RegressionMetrics::compute(
                    black_box(labels.view()),
                    black_box(scores.view()),
                    &AbsoluteLoss,
                ))
            });
        });
    }
    group.finish();
}

fn bench_average(c: &mut Criterion) {
    let labels: Array1<f32> = (0..1_000).map(|i| i as f32).collect();
    let folds: Vec<RegressionMetrics> = (0..10)
        .map(|k| {
            let scores = labels.mapv(|v| v + k as f32);
            RegressionMetrics::compute(labels.view(), scores.view(), &SquaredLoss).unwrap()
        })
        .collect();
    c.bench_function("average_10_folds", |b| {
        b.iter(|| black_box(RegressionMetrics::average(black_box(&folds))));
    });
}

criterion_group!(benches, bench_regression_metrics, bench_average);
criterion_main!(benches);
