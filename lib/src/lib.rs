//! # mlchain
//!
//! Typed estimator pipelines for regression: declare columns, chain
//! estimators, fit once, and keep the concrete trained predictor.
//!
//! ## Core ideas
//!
//! - **Typed column handles**: a schema declaration yields a [`ColumnSet`] of
//!   handles with a kind, a shape and a unique id. Steps only accept handles
//!   that are visible where they are appended, so mistakes surface as a
//!   [`SchemaError`] before any data is read.
//! - **Persistent pipelines**: [`Pipeline::append`] returns a new pipeline and
//!   leaves the receiver untouched.
//! - **Typed fit result**: appending a trainer with
//!   [`Pipeline::append_trainer`] records its predictor type, and
//!   [`Pipeline::fit`] hands back `Arc<Predictor>` next to the fitted model.
//!   On-fit callbacks are still available for side effects.
//!
//! ## Quick start
//!
//! ```rust
//! use mlchain::prelude::*;
//!
//! let spec = SchemaSpec::new()
//!     .scalar("label", DataKind::Float, 0)
//!     .vector("features", DataKind::Float, 1, 2);
//! let loader = TextLoader::new(&spec, TextLoaderOptions::default().with_separator(','))?;
//! let data = loader.read_str("3,1,1\n5,2,1\n7,3,1\n9,4,1\n")?;
//!
//! let pipeline = loader.make_new_estimator().append_trainer(|c| {
//!     let (label, features) = (c.get("label")?, c.get("features")?);
//!     Ok(Outputs::new()
//!         .keep(label)
//!         .keep(features)
//!         .score("score", CoordinateDescentRegression::new(label, features)))
//! })?;
//!
//! let fitted = pipeline.fit(&data)?;
//! let scored = fitted.model.transform(&data)?;
//! assert_eq!(scored.column_names(), vec!["label", "features", "score"]);
//! assert_eq!(fitted.predictor.weights().len(), 2);
//! # Ok::<(), mlchain::Error>(())
//! ```
//!
//! ## Module structure
//!
//! - `schema`: column declarations, handles and column sets
//! - `data`: in-memory column store and the delimited-text loader
//! - `pipeline`: the pipeline builder, steps and fitted model
//! - `preprocessing`: normalizer and concatenation estimators
//! - `trainers`: coordinate-descent linear regression and boosted trees
//! - `metrics`, `context`: regression metrics, splits and cross-validation
//! - `serialization`: bincode persistence of predictors and parameters

pub mod context;
pub mod data;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod schema;
pub mod serialization;
pub mod trainers;

pub use context::{FoldResult, RegressionContext};
pub use data::{DataView, TextLoader, TextLoaderOptions};
pub use error::{
    Error, EvaluationError, FitError, LoadError, PersistError, Result, SchemaError,
    TransformError,
};
pub use metrics::{AbsoluteLoss, RegressionLoss, RegressionMetrics, SquaredLoss};
pub use pipeline::{Fitted, FittedModel, Outputs, Pipeline};
pub use schema::{declare_columns, ColumnHandle, ColumnSet, ColumnType, DataKind, SchemaSpec};
pub use serialization::SerializableParams;

/// Everything needed to declare, build, fit and evaluate a pipeline.
pub mod prelude {
    pub use crate::context::{FoldResult, RegressionContext};
    pub use crate::data::{DataView, TextLoader, TextLoaderOptions};
    pub use crate::error::{Error, Result};
    pub use crate::metrics::{RegressionMetrics, SquaredLoss};
    pub use crate::pipeline::{Estimator, Fitted, FittedModel, Outputs, Pipeline, Transformer};
    pub use crate::preprocessing::{Concatenate, Normalize, NormalizeMode};
    pub use crate::schema::{
        declare_columns, ColumnHandle, ColumnSet, ColumnType, DataKind, SchemaSpec, ValueKind,
    };
    pub use crate::serialization::SerializableParams;
    pub use crate::trainers::{
        CoordinateDescentRegression, FastTreeRegression, LightGbmRegression,
        LinearRegressionPredictor, Predictor, Trainer, TreeEnsemblePredictor,
    };
}
