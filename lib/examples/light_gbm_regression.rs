//! Boosted trees with histogram split search on a train/test split. The
//! trained predictor is optionally saved with bincode.
//!
//! Run with: cargo run --example light_gbm_regression -- path/to/housing.txt

use std::path::PathBuf;

use clap::Parser;
use mlchain::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Fit a LightGBM-style regression on housing data")]
struct Args {
    data: PathBuf,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 0.1)]
    test_fraction: f64,

    #[arg(long, default_value_t = 4)]
    num_leaves: usize,

    #[arg(long, default_value_t = 6)]
    min_data_per_leaf: usize,

    #[arg(long, default_value_t = 0.001)]
    learning_rate: f64,

    /// Where to write the trained predictor.
    #[arg(long)]
    save: Option<PathBuf>,
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

    let pipeline = loader.make_new_estimator().append_trainer(|c| {
        let (label, features) = (c.get("label")?, c.get("features")?);
        Ok(Outputs::new().keep(label).score(
            "score",
            LightGbmRegression::new(label, features)
                .with_num_leaves(args.num_leaves)
                .with_min_data_per_leaf(args.min_data_per_leaf)
                .with_learning_rate(args.learning_rate),
        ))
    })?;

    let fitted = pipeline.fit(&train)?;
    let weights = fitted.predictor.feature_weights();
    for (i, w) in weights.iter().enumerate() {
        println!("weight {i} - {w}");
    }

    let scored = fitted.model.transform(&test)?;
    let columns = fitted.model.output_columns();
    let metrics = ctx.evaluate(&scored, columns.get("label")?, columns.get("score")?)?;
    println!("L1 - {}", metrics.l1);
    println!("L2 - {}", metrics.l2);
    println!("LossFunction - {}", metrics.loss_fn);
    println!("RMS - {}", metrics.rms);
    println!("RSquared - {}", metrics.r_squared);

    if let Some(path) = &args.save {
        fitted.predictor.as_ref().save_to_file(path)?;
        println!("saved predictor to {}", path.display());
    }
    Ok(())
}
