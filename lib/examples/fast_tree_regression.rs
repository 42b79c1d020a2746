//! Boosted trees with exact split search, evaluated by cross-validation.
//!
//! Run with: cargo run --example fast_tree_regression -- path/to/housing.txt

use std::path::PathBuf;

use clap::Parser;
use mlchain::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Cross-validate a FastTree regression on housing data")]
struct Args {
    /// Tab-separated housing data with a header line. Several files are read
    /// as one data set.
    #[arg(required = true)]
    data: Vec<PathBuf>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 5)]
    folds: usize,

    #[arg(long, default_value_t = 100)]
    num_trees: usize,

    #[arg(long, default_value_t = 20)]
    num_leaves: usize,

    #[arg(long, default_value_t = 10)]
    min_datapoints_in_leaves: usize,

    #[arg(long, default_value_t = 0.2)]
    learning_rate: f64,
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
    let data = loader.read_paths(&args.data)?;

    let pipeline = loader.make_new_estimator().append_trainer(|c| {
        let (label, features) = (c.get("label")?, c.get("features")?);
        Ok(Outputs::new().keep(label).score(
            "score",
            FastTreeRegression::new(label, features)
                .with_num_trees(args.num_trees)
                .with_num_leaves(args.num_leaves)
                .with_min_datapoints_in_leaves(args.min_datapoints_in_leaves)
                .with_learning_rate(args.learning_rate),
        ))
    })?;

    let columns = pipeline.columns();
    let results = RegressionContext::new(args.seed).cross_validate(
        &data,
        &pipeline,
        columns.get("label")?,
        columns.get("score")?,
        args.folds,
    )?;

    for result in &results {
        println!(
            "fold {} - RMS {:.4}, RSquared {:.4}, trees {}",
            result.fold,
            result.metrics.rms,
            result.metrics.r_squared,
            result.predictor.n_trees()
        );
    }

    let metrics: Vec<RegressionMetrics> = results.iter().map(|r| r.metrics).collect();
    if let Some(average) = RegressionMetrics::average(&metrics) {
        println!("L1 - {}", average.l1);
        println!("L2 - {}", average.l2);
        println!("LossFunction - {}", average.loss_fn);
        println!("RMS - {}", average.rms);
        println!("RSquared - {}", average.r_squared);
    }
    Ok(())
}
