//! Linear regression on the housing data set.
//!
//! Loads a tab-separated file (label in column 0, six features in columns
//! 1..=6, one header line), holds out a test fraction, fits a
//! coordinate-descent linear regression and prints the learned weights and
//! the test metrics.
//!
//! Run with: cargo run --example linear_regression -- path/to/housing.txt

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mlchain::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Fit a coordinate-descent linear regression on housing data")]
struct Args {
    /// Tab-separated housing data with a header line.
    data: PathBuf,

    /// Seed of the train/test split.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Fraction of rows held out for evaluation.
    #[arg(long, default_value_t = 0.1)]
    test_fraction: f64,

    #[arg(long, default_value_t = 100)]
    max_iterations: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let spec = SchemaSpec::new()
        .scalar("label", DataKind::Float, 0)
        .vector("features", DataKind::Float, 1, 6);
    let loader = TextLoader::new(&spec, TextLoaderOptions::default().with_header(true))?;
    let data = loader.read_path(&args.data)?;

    let ctx = RegressionContext::new(args.seed);
    let (train, test) = ctx.train_test_split(&data, args.test_fraction)?;
    println!("train rows: {}, test rows: {}", train.n_rows(), test.n_rows());

    let pipeline = loader.make_new_estimator().append_trainer(|c| {
        let (label, features) = (c.get("label")?, c.get("features")?);
        Ok(Outputs::new()
            .keep(label)
            .score(
                "score",
                CoordinateDescentRegression::new(label, features)
                    .with_l1_threshold(0.0)
                    .with_max_iterations(args.max_iterations),
            )
            .on_fit(|p: &Arc<LinearRegressionPredictor>| {
                tracing::info!(bias = p.bias(), "trained linear predictor");
            }))
    })?;

    let fitted = pipeline.fit(&train)?;
    for (i, w) in fitted.predictor.feature_weights().iter().enumerate() {
        println!("weight {i} - {w}");
    }

    let scored = fitted.model.transform(&test)?;
    let columns = fitted.model.output_columns();
    let metrics = ctx.evaluate(&scored, columns.get("label")?, columns.get("score")?)?;
    print_metrics(&metrics);
    Ok(())
}

fn print_metrics(metrics: &RegressionMetrics) {
    println!("L1 - {}", metrics.l1);
    println!("L2 - {}", metrics.l2);
    println!("LossFunction - {}", metrics.loss_fn);
    println!("RMS - {}", metrics.rms);
    println!("RSquared - {}", metrics.r_squared);
}
