use benchmarks::synthetic_regression;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mlchain::prelude::*;

fn bench_coordinate_descent(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinate_descent");
    for rows in [1_000, 10_000] {
        let synthetic = synthetic_regression(rows, 8, 42).unwrap();
        let pipeline = Pipeline::new(synthetic.columns.clone())
            .append_trainer(|cols| {
                let (label, features) = (cols.get("label")?, cols.get("features")?);
                Ok(Outputs::new().score("score", CoordinateDescentRegression::new(label, features)))
            })
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &synthetic.data, |b, data| {
            b.iter(|| black_box(pipeline.fit(black_box(data)).unwrap()));
        });
    }
    group.finish();
}

fn bench_tree_split_finders(c: &mut Criterion) {
    let mut group = c.benchmark_group("boosted_trees");
    group.sample_size(10);
    let synthetic = synthetic_regression(5_000, 8, 42).unwrap();

    let fast_tree = Pipeline::new(synthetic.columns.clone())
        .append_trainer(|cols| {
            let (label, features) = (cols.get("label")?, cols.get("features")?);
            Ok(Outputs::new().score(
                "score",
                FastTreeRegression::new(label, features).with_num_trees(20),
            ))
        })
        .unwrap();
    group.bench_function("exact", |b| {
        b.iter(|| black_box(fast_tree.fit(black_box(&synthetic.data)).unwrap()));
    });

    for max_bin in [16, 255] {
        let light_gbm = Pipeline::new(synthetic.columns.clone())
            .append_trainer(|cols| {
                let (label, features) = (cols.get("label")?, cols.get("features")?);
                Ok(Outputs::new().score(
                    "score",
                    LightGbmRegression::new(label, features)
                        .with_num_boost_round(20)
                        .with_max_bin(max_bin),
                ))
            })
            .unwrap();
        group.bench_with_input(BenchmarkId::new("histogram", max_bin), &max_bin, |b, _| {
            b.iter(|| black_box(light_gbm.fit(black_box(&synthetic.data)).unwrap()));
        });
    }
    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let synthetic = synthetic_regression(10_000, 8, 7).unwrap();
    let fitted = Pipeline::new(synthetic.columns.clone())
        .append_trainer(|cols| {
            let (label, features) = (cols.get("label")?, cols.get("features")?);
            Ok(Outputs::new().score(
                "score",
                LightGbmRegression::new(label, features).with_num_boost_round(50),
            ))
        })
        .unwrap()
        .fit(&synthetic.data)
        .unwrap();

    c.bench_function("transform_10k_rows", |b| {
        b.iter(|| black_box(fitted.model.transform(black_box(&synthetic.data)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_coordinate_descent,
    bench_tree_split_finders,
    bench_prediction
);
criterion_main!(benches);
