//! Stand-alone timing of the three trainers on synthetic data.
//!
//! For criterion measurements use `cargo bench --package benchmarks`.

use benchmarks::{benchmark_with_warmup, synthetic_regression, BenchmarkStats};
use clap::Parser;
use mlchain::prelude::*;
use mlchain::pipeline::TrainerSlot;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Time mlchain trainers on synthetic regression data")]
struct Args {
    #[arg(long, default_value_t = 5_000)]
    rows: usize,

    #[arg(long, default_value_t = 8)]
    features: usize,

    #[arg(long, default_value_t = 1)]
    warmup: usize,

    #[arg(long, default_value_t = 5)]
    iterations: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn report(name: &str, stats: Option<BenchmarkStats>, metrics: Option<RegressionMetrics>) {
    match (stats, metrics) {
        (Some(s), Some(m)) => println!(
            "{name:<28} {:>9.2} ms ± {:>7.2}  (min {:.2}, median {:.2})  test RMS {:.4}  R² {:.4}",
            s.mean_ms, s.std_dev_ms, s.min_ms, s.median_ms, m.rms, m.r_squared
        ),
        _ => println!("{name:<28} no runs"),
    }
}

fn time_pipeline<S: TrainerSlot>(
    name: &str,
    pipeline: &Pipeline<S>,
    train: &DataView,
    test: &DataView,
    ctx: &RegressionContext,
    args: &Args,
) -> Result<()> {
    let (fitted, stats) = benchmark_with_warmup(args.warmup, args.iterations, || pipeline.fit(train));
    let metrics = match fitted.transpose()? {
        Some(fitted) => {
            let scored = fitted.model.transform(test)?;
            let columns = fitted.model.output_columns();
            Some(ctx.evaluate(&scored, columns.get("label")?, columns.get("score")?)?)
        }
        None => None,
    };
    report(name, stats, metrics);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let synthetic = synthetic_regression(args.rows, args.features, args.seed)?;
    let ctx = RegressionContext::new(args.seed);
    let (train, test) = ctx.train_test_split(&synthetic.data, 0.2)?;
    println!(
        "{} train rows, {} test rows, {} features",
        train.n_rows(),
        test.n_rows(),
        args.features
    );

    let base = Pipeline::new(synthetic.columns.clone());

    let linear = base.append_trainer(|c| {
        let (label, features) = (c.get("label")?, c.get("features")?);
        Ok(Outputs::new()
            .keep(label)
            .score("score", CoordinateDescentRegression::new(label, features)))
    })?;
    time_pipeline("CoordinateDescentRegression", &linear, &train, &test, &ctx, &args)?;

    let fast_tree = base.append_trainer(|c| {
        let (label, features) = (c.get("label")?, c.get("features")?);
        Ok(Outputs::new()
            .keep(label)
            .score("score", FastTreeRegression::new(label, features)))
    })?;
    time_pipeline("FastTreeRegression", &fast_tree, &train, &test, &ctx, &args)?;

    let light_gbm = base.append_trainer(|c| {
        let (label, features) = (c.get("label")?, c.get("features")?);
        Ok(Outputs::new()
            .keep(label)
            .score("score", LightGbmRegression::new(label, features)))
    })?;
    time_pipeline("LightGbmRegression", &light_gbm, &train, &test, &ctx, &args)?;

    Ok(())
}
