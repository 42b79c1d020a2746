//! Typed estimator pipelines.
//!
//! A [`Pipeline`] starts from the columns of a schema and grows by appending
//! stages. Each stage lists its outputs ([`Outputs`]): handles carried over
//! from the previous stage and new columns computed by an [`Estimator`] or a
//! [`Trainer`](crate::trainers::Trainer). Handles are checked when the stage
//! is appended, so a pipeline that was built successfully only fails at fit
//! time because of the data.
//!
//! # Design
//! - Appending never mutates: every append returns a new pipeline sharing
//!   the earlier steps behind `Arc`.
//! - Steps are stored as trait objects, so estimators of any type mix in one
//!   pipeline.
//! - [`Pipeline::append_trainer`] changes the pipeline's type parameter to
//!   [`Tracked<P>`], which makes [`Pipeline::fit`] return `Fitted<Arc<P>>`:
//!   the concrete predictor, without downcasting on the caller's side.
//! - Fit callbacks registered with [`ScoredOutputs::on_fit`] still run, once
//!   per successful fit of their trainer.

mod model;
#[allow(clippy::module_inception)]
mod pipeline;
mod step;

pub use model::FittedModel;
pub use pipeline::{Fitted, NoTrainer, Pipeline, Tracked, TrainerSlot};
pub use step::{Estimator, FitCallback, Outputs, ScoredOutputs, Transformer};
