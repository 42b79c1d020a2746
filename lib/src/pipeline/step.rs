//! Estimator and transformer traits, plus the type-erased step objects the
//! pipeline stores.
//!
//! User-facing code implements [`Estimator`] (or [`Trainer`]) and lists the
//! outputs of an append with [`Outputs`]. Internally every output becomes an
//! `Arc<dyn ErasedStep>`, so a pipeline can hold heterogeneous steps in one
//! `Vec` without enum matching.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, Axis};

use crate::data::DataView;
use crate::error::{FitError, SchemaError, TransformError};
use crate::schema::{ColumnHandle, ColumnType, ValueKind};
use crate::trainers::{Predictor, Trainer};

/// An unfitted transformation producing one new column.
///
/// # Example
/// ```ignore
/// let normalize = Normalize::min_max(&features);
/// let fitted = normalize.fit(&data)?;
/// let values = fitted.transform(&data)?;
/// ```
pub trait Estimator: Send + Sync + 'static {
    /// The fitted transformer type ready for inference.
    type Fitted: Transformer;

    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Columns this estimator reads.
    fn inputs(&self) -> Vec<ColumnHandle>;

    /// Type of the produced column.
    ///
    /// # Errors
    /// [`SchemaError::TypeMismatch`] if an input has a kind or shape this
    /// estimator cannot consume.
    fn output_type(&self) -> Result<ColumnType, SchemaError>;

    /// Learn parameters from `data`.
    fn fit(&self, data: &DataView) -> Result<Self::Fitted, FitError>;
}

/// A fitted step: maps a data view to the values of its output column.
pub trait Transformer: fmt::Debug + Send + Sync + 'static {
    /// Compute the output column as an `n_rows × width` matrix.
    ///
    /// Must not mutate any state; repeated calls on the same data give the
    /// same result.
    fn transform(&self, data: &DataView) -> Result<Array2<f32>, TransformError>;
}

/// Callback invoked with the concrete predictor right after a trainer fits.
pub type FitCallback<P> = Arc<dyn Fn(&Arc<P>) + Send + Sync>;

/// Result of fitting one erased step.
pub(crate) struct FittedStepOutput {
    pub transformer: Arc<dyn Transformer>,
    pub predictor: Option<Arc<dyn Any + Send + Sync>>,
}

/// Object-safe view of an estimator or trainer.
pub(crate) trait ErasedStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn inputs(&self) -> Vec<ColumnHandle>;
    fn output_type(&self) -> Result<ColumnType, SchemaError>;
    fn fit(&self, data: &DataView) -> Result<FittedStepOutput, FitError>;
}

pub(crate) struct EstimatorStep<E>(pub E);

impl<E: Estimator> ErasedStep for EstimatorStep<E> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn inputs(&self) -> Vec<ColumnHandle> {
        self.0.inputs()
    }

    fn output_type(&self) -> Result<ColumnType, SchemaError> {
        self.0.output_type()
    }

    fn fit(&self, data: &DataView) -> Result<FittedStepOutput, FitError> {
        let fitted = self.0.fit(data)?;
        Ok(FittedStepOutput {
            transformer: Arc::new(fitted),
            predictor: None,
        })
    }
}

pub(crate) struct TrainerStep<T: Trainer> {
    trainer: T,
    callbacks: Vec<FitCallback<T::Predictor>>,
}

impl<T: Trainer> ErasedStep for TrainerStep<T> {
    fn name(&self) -> &'static str {
        self.trainer.name()
    }

    fn inputs(&self) -> Vec<ColumnHandle> {
        vec![self.trainer.label().clone(), self.trainer.features().clone()]
    }

    fn output_type(&self) -> Result<ColumnType, SchemaError> {
        let label = self.trainer.label();
        let score = ColumnType::scalar(ValueKind::Float);
        if label.column_type() != score {
            return Err(SchemaError::TypeMismatch {
                column: label.name().to_string(),
                expected: "a scalar float label".to_string(),
                found: label.column_type(),
            });
        }
        let features = self.trainer.features();
        if features.column_type().kind != ValueKind::Float {
            return Err(SchemaError::TypeMismatch {
                column: features.name().to_string(),
                expected: "a float feature column".to_string(),
                found: features.column_type(),
            });
        }
        Ok(score)
    }

    fn fit(&self, data: &DataView) -> Result<FittedStepOutput, FitError> {
        let label = self.trainer.label();
        let features = self.trainer.features();
        data.check(label)?;
        data.check(features)?;

        let predictor = Arc::new(
            self.trainer
                .train(data.scalar(label.name())?, data.features(features.name())?)?,
        );
        for callback in &self.callbacks {
            callback(&predictor);
        }

        let transformer = ScoringTransformer {
            features: features.clone(),
            predictor: Arc::clone(&predictor),
        };
        Ok(FittedStepOutput {
            transformer: Arc::new(transformer),
            predictor: Some(predictor as Arc<dyn Any + Send + Sync>),
        })
    }
}

/// Scores the feature column with a trained predictor.
#[derive(Debug)]
pub(crate) struct ScoringTransformer<P> {
    features: ColumnHandle,
    predictor: Arc<P>,
}

impl<P: Predictor> Transformer for ScoringTransformer<P> {
    fn transform(&self, data: &DataView) -> Result<Array2<f32>, TransformError> {
        let column = data.check(&self.features)?;
        let values = column.values();
        if values.ncols() != self.predictor.n_features() {
            return Err(TransformError::WidthMismatch {
                column: self.features.name().to_string(),
                expected: self.predictor.n_features(),
                found: values.ncols(),
            });
        }
        Ok(self.predictor.predict(values)?.insert_axis(Axis(1)))
    }
}

pub(crate) enum OutputEntry {
    Keep(ColumnHandle),
    Add {
        name: String,
        step: Arc<dyn ErasedStep>,
    },
}

/// Outputs of one append: kept handles and newly computed columns, in order.
#[derive(Default)]
pub struct Outputs {
    pub(crate) entries: Vec<OutputEntry>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carry an existing visible column into the next stage.
    pub fn keep(mut self, handle: &ColumnHandle) -> Self {
        self.entries.push(OutputEntry::Keep(handle.clone()));
        self
    }

    /// Add a column computed by `estimator`.
    pub fn add<E: Estimator>(mut self, name: impl Into<String>, estimator: E) -> Self {
        self.entries.push(OutputEntry::Add {
            name: name.into(),
            step: Arc::new(EstimatorStep(estimator)),
        });
        self
    }

    /// Add the score column of `trainer`. Use with
    /// [`Pipeline::append_trainer`](crate::pipeline::Pipeline::append_trainer).
    pub fn score<T: Trainer>(self, name: impl Into<String>, trainer: T) -> ScoredOutputs<T> {
        ScoredOutputs {
            position: self.entries.len(),
            outputs: self,
            name: name.into(),
            trainer,
            callbacks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outputs that include exactly one trainer.
pub struct ScoredOutputs<T: Trainer> {
    outputs: Outputs,
    position: usize,
    name: String,
    trainer: T,
    callbacks: Vec<FitCallback<T::Predictor>>,
}

impl<T: Trainer> ScoredOutputs<T> {
    /// Register a callback fired once per successful fit of this trainer.
    pub fn on_fit<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arc<T::Predictor>) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
        self
    }

    pub fn keep(mut self, handle: &ColumnHandle) -> Self {
        self.outputs = self.outputs.keep(handle);
        self
    }

    pub fn add<E: Estimator>(mut self, name: impl Into<String>, estimator: E) -> Self {
        self.outputs = self.outputs.add(name, estimator);
        self
    }

    /// Flatten into plain outputs, returning the index of the trainer entry.
    pub(crate) fn into_outputs(self) -> (Outputs, usize) {
        let mut outputs = self.outputs;
        let step = TrainerStep {
            trainer: self.trainer,
            callbacks: self.callbacks,
        };
        outputs.entries.insert(
            self.position,
            OutputEntry::Add {
                name: self.name,
                step: Arc::new(step),
            },
        );
        (outputs, self.position)
    }
}
