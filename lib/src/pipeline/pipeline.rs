//! The persistent pipeline builder and its fit.

use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info};

use crate::data::DataView;
use crate::error::{FitError, SchemaError};
use crate::schema::{ColumnHandle, ColumnSet};
use crate::trainers::{Predictor, Trainer};

use super::model::{FittedModel, FittedStep};
use super::step::{ErasedStep, OutputEntry, Outputs, ScoredOutputs};

/// Records which predictor type (if any) a pipeline's fit returns.
///
/// Implemented by [`NoTrainer`] and [`Tracked`]; the pipeline moves from one
/// to the other through [`Pipeline::append_trainer`].
pub trait TrainerSlot: 'static {
    /// What [`Pipeline::fit`] returns next to the model.
    type Predictor;

    #[doc(hidden)]
    fn resolve(
        trained: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<Self::Predictor, FitError>;
}

/// No trainer has been appended; fit returns `()` as predictor.
#[derive(Debug)]
pub struct NoTrainer;

impl TrainerSlot for NoTrainer {
    type Predictor = ();

    fn resolve(_: Option<Arc<dyn Any + Send + Sync>>) -> Result<(), FitError> {
        Ok(())
    }
}

/// The last trainer appended produces `P`; fit returns `Arc<P>`.
pub struct Tracked<P>(PhantomData<fn() -> P>);

impl<P: Predictor> TrainerSlot for Tracked<P> {
    type Predictor = Arc<P>;

    fn resolve(trained: Option<Arc<dyn Any + Send + Sync>>) -> Result<Arc<P>, FitError> {
        trained
            .ok_or_else(|| FitError::PredictorType(type_name::<P>().to_string()))?
            .downcast::<P>()
            .map_err(|_| FitError::PredictorType(type_name::<P>().to_string()))
    }
}

/// One planned output column and the step computing it.
#[derive(Clone)]
struct PlannedStep {
    output: ColumnHandle,
    step: Arc<dyn ErasedStep>,
}

/// Result of a successful [`Pipeline::fit`].
#[derive(Clone, Debug)]
pub struct Fitted<P> {
    /// The composed fitted steps.
    pub model: FittedModel,
    /// The trained predictor of the tracked trainer, or `()`.
    pub predictor: P,
}

/// An immutable chain of estimator steps over a set of source columns.
///
/// Appending returns a new pipeline and leaves the receiver untouched, so a
/// prefix can be shared by several pipelines. Steps added by one append form
/// a stage: they all read the columns visible before that append.
///
/// # Example
/// ```ignore
/// let pipeline = loader
///     .make_new_estimator()
///     .append_trainer(|c| {
///         let label = c.get("label")?;
///         let features = c.get("features")?;
///         Ok(Outputs::new()
///             .keep(label)
///             .score("score", CoordinateDescentRegression::new(label, features))
///             .on_fit(|p| println!("{:?}", p.weights)))
///     })?;
/// let fitted = pipeline.fit(&data)?;
/// ```
pub struct Pipeline<S: TrainerSlot = NoTrainer> {
    source: ColumnSet,
    visible: ColumnSet,
    required: Vec<ColumnHandle>,
    stages: Vec<Vec<PlannedStep>>,
    tracked: Option<(usize, usize)>,
    _slot: PhantomData<fn() -> S>,
}

impl<S: TrainerSlot> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            visible: self.visible.clone(),
            required: self.required.clone(),
            stages: self.stages.clone(),
            tracked: self.tracked,
            _slot: PhantomData,
        }
    }
}

impl<S: TrainerSlot> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("columns", &self.visible.names())
            .field("steps", &self.step_names())
            .finish()
    }
}

impl Pipeline<NoTrainer> {
    /// Start an empty pipeline over `columns`.
    pub fn new(columns: ColumnSet) -> Self {
        Self {
            source: columns.clone(),
            visible: columns,
            required: Vec::new(),
            stages: Vec::new(),
            tracked: None,
            _slot: PhantomData,
        }
    }
}

impl<S: TrainerSlot> Pipeline<S> {
    /// Columns visible to the next append.
    pub fn columns(&self) -> &ColumnSet {
        &self.visible
    }

    /// Names of all steps, in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .flatten()
            .map(|planned| planned.step.name())
            .collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Append a stage of transform steps.
    ///
    /// `build` receives the visible columns and lists the outputs of the
    /// stage. The new pipeline sees exactly those outputs.
    ///
    /// # Errors
    /// [`SchemaError`] if an output refers to a handle that is not visible,
    /// a step rejects the type of an input, two outputs share a name, or the
    /// output list is empty.
    pub fn append<F>(&self, build: F) -> Result<Pipeline<S>, SchemaError>
    where
        F: FnOnce(&ColumnSet) -> Result<Outputs, SchemaError>,
    {
        let outputs = build(&self.visible)?;
        self.extend(outputs, self.tracked)
    }

    /// Append a stage containing one trainer.
    ///
    /// The returned pipeline's fit yields the trainer's concrete predictor.
    pub fn append_trainer<T, F>(
        &self,
        build: F,
    ) -> Result<Pipeline<Tracked<T::Predictor>>, SchemaError>
    where
        T: Trainer,
        F: FnOnce(&ColumnSet) -> Result<ScoredOutputs<T>, SchemaError>,
    {
        let (outputs, position) = build(&self.visible)?.into_outputs();
        let planned_before = outputs.entries[..position]
            .iter()
            .filter(|entry| matches!(entry, OutputEntry::Add { .. }))
            .count();
        self.extend(outputs, Some((self.stages.len(), planned_before)))
    }

    fn extend<N: TrainerSlot>(
        &self,
        outputs: Outputs,
        tracked: Option<(usize, usize)>,
    ) -> Result<Pipeline<N>, SchemaError> {
        if outputs.is_empty() {
            return Err(SchemaError::EmptyOutputs);
        }

        let mut names = HashSet::new();
        let mut visible = Vec::with_capacity(outputs.len());
        let mut stage = Vec::new();
        let mut required = self.required.clone();

        for entry in outputs.entries {
            match entry {
                OutputEntry::Keep(handle) => {
                    self.require_visible(&handle, &mut required)?;
                    if !names.insert(handle.name().to_string()) {
                        return Err(SchemaError::DuplicateColumn(handle.name().to_string()));
                    }
                    visible.push(handle);
                }
                OutputEntry::Add { name, step } => {
                    for input in step.inputs() {
                        self.require_visible(&input, &mut required)?;
                    }
                    let ty = step.output_type()?;
                    if !names.insert(name.clone()) {
                        return Err(SchemaError::DuplicateColumn(name));
                    }
                    let output = ColumnHandle::new(&name, ty);
                    visible.push(output.clone());
                    stage.push(PlannedStep { output, step });
                }
            }
        }

        let mut stages = self.stages.clone();
        if !stage.is_empty() {
            stages.push(stage);
        }
        Ok(Pipeline {
            source: self.source.clone(),
            visible: ColumnSet::from_handles(visible),
            required,
            stages,
            tracked,
            _slot: PhantomData,
        })
    }

    fn require_visible(
        &self,
        handle: &ColumnHandle,
        required: &mut Vec<ColumnHandle>,
    ) -> Result<(), SchemaError> {
        if !self.visible.contains(handle) {
            return Err(SchemaError::ForeignHandle(handle.name().to_string()));
        }
        if self.source.contains(handle) && !required.iter().any(|h| h.id() == handle.id()) {
            required.push(handle.clone());
        }
        Ok(())
    }

    /// Fit every step in order on `data`.
    ///
    /// Each stage is fit on the columns produced so far, and its outputs are
    /// added to the data seen by later stages. A trainer's fit callbacks run
    /// as soon as that trainer has trained.
    ///
    /// # Errors
    /// [`FitError::EmptyPipeline`], [`FitError::EmptyData`], a
    /// [`FitError::Transform`] when a source column is missing or mistyped,
    /// or [`FitError::Step`] wrapping the failure of one step. Nothing after
    /// the failing step runs.
    pub fn fit(&self, data: &DataView) -> Result<Fitted<S::Predictor>, FitError> {
        if self.stages.is_empty() {
            return Err(FitError::EmptyPipeline);
        }
        if data.is_empty() {
            return Err(FitError::EmptyData);
        }
        for handle in &self.required {
            data.check(handle)?;
        }

        let mut view = data.clone();
        let mut fitted_stages = Vec::with_capacity(self.stages.len());
        let mut trained = None;

        for (stage_index, stage) in self.stages.iter().enumerate() {
            let snapshot = view.clone();
            let mut fitted = Vec::with_capacity(stage.len());
            let mut produced = Vec::with_capacity(stage.len());

            for (step_index, planned) in stage.iter().enumerate() {
                let wrap = |source: FitError| FitError::Step {
                    step: planned.step.name(),
                    output: planned.output.name().to_string(),
                    source: Box::new(source),
                };
                let output = planned.step.fit(&snapshot).map_err(wrap)?;
                let values = output
                    .transformer
                    .transform(&snapshot)
                    .map_err(|e| wrap(e.into()))?;
                debug!(
                    step = planned.step.name(),
                    output = planned.output.name(),
                    stage = stage_index,
                    "fitted step"
                );

                if self.tracked == Some((stage_index, step_index)) {
                    trained = output.predictor;
                }
                produced.push((planned.output.clone(), values));
                fitted.push(FittedStep {
                    name: planned.step.name(),
                    output: planned.output.clone(),
                    transformer: output.transformer,
                });
            }

            for (handle, values) in produced {
                view.push_column(handle.name(), handle.column_type(), values)?;
            }
            fitted_stages.push(fitted);
        }

        let predictor = S::resolve(trained)?;
        let model = FittedModel::new(self.required.clone(), self.visible.clone(), fitted_stages);
        info!(
            steps = self.len(),
            rows = data.n_rows(),
            outputs = ?model.output_columns().names(),
            "pipeline fitted"
        );
        Ok(Fitted { model, predictor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{Concatenate, Normalize};
    use crate::schema::{ColumnType, DataKind, SchemaSpec, ValueKind};
    use crate::trainers::{CoordinateDescentRegression, LinearRegressionPredictor};
    use ndarray::{Array2, Axis};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_resolve_names_expected_predictor_type() {
        let wrong: Arc<dyn Any + Send + Sync> = Arc::new(1u32);
        let err = Tracked::<LinearRegressionPredictor>::resolve(Some(wrong)).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "expected predictor type '{}'",
                type_name::<LinearRegressionPredictor>()
            )
        );
        assert!(matches!(
            Tracked::<LinearRegressionPredictor>::resolve(None),
            Err(FitError::PredictorType(_))
        ));
    }

    fn columns() -> ColumnSet {
        crate::schema::declare_columns(
            &SchemaSpec::new()
                .scalar("label", DataKind::Float, 0)
                .vector("features", DataKind::Float, 1, 2),
        )
        .unwrap()
    }

    /// y = 2*x0 - x1 + 1
    fn data(n: usize) -> DataView {
        let features = Array2::from_shape_fn((n, 2), |(i, j)| ((i * (j + 3)) % 11) as f32);
        let label = features.map_axis(Axis(1), |r| 2.0 * r[0] - r[1] + 1.0);
        DataView::new(n)
            .with_column(
                "label",
                ColumnType::scalar(ValueKind::Float),
                label.insert_axis(Axis(1)),
            )
            .unwrap()
            .with_column(
                "features",
                ColumnType::vector(ValueKind::Float, 2),
                features,
            )
            .unwrap()
    }

    #[test]
    fn test_empty_pipeline_fails_to_fit() {
        let pipeline = Pipeline::new(columns());
        assert!(pipeline.is_empty());
        assert!(matches!(
            pipeline.fit(&data(10)),
            Err(FitError::EmptyPipeline)
        ));
    }

    #[test]
    fn test_append_is_persistent() {
        let base = Pipeline::new(columns());
        let extended = base
            .append(|c| {
                let features = c.get("features")?;
                Ok(Outputs::new()
                    .keep(c.get("label")?)
                    .add("scaled", Normalize::min_max(features)))
            })
            .unwrap();

        assert_eq!(base.len(), 0);
        assert_eq!(base.columns().names(), vec!["label", "features"]);
        assert_eq!(extended.len(), 1);
        assert_eq!(extended.columns().names(), vec!["label", "scaled"]);
    }

    #[test]
    fn test_append_rejects_foreign_handle() {
        let other = columns();
        let pipeline = Pipeline::new(columns());
        let err = pipeline
            .append(|_| Ok(Outputs::new().keep(other.get("label")?)))
            .unwrap_err();
        assert_eq!(err, SchemaError::ForeignHandle("label".to_string()));
    }

    #[test]
    fn test_append_rejects_dropped_handle() {
        let pipeline = Pipeline::new(columns());
        let label = pipeline.columns().get("label").unwrap().clone();
        let narrowed = pipeline
            .append(|c| Ok(Outputs::new().keep(c.get("features")?)))
            .unwrap();
        let err = narrowed
            .append(|_| Ok(Outputs::new().keep(&label)))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ForeignHandle(_)));
    }

    #[test]
    fn test_append_rejects_duplicate_and_empty_outputs() {
        let pipeline = Pipeline::new(columns());
        let err = pipeline
            .append(|c| {
                let features = c.get("features")?;
                Ok(Outputs::new()
                    .keep(features)
                    .add("features", Normalize::min_max(features)))
            })
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("features".to_string()));

        let err = pipeline.append(|_| Ok(Outputs::new())).unwrap_err();
        assert_eq!(err, SchemaError::EmptyOutputs);
    }

    #[test]
    fn test_trainer_rejects_vector_label() {
        let pipeline = Pipeline::new(columns());
        let err = pipeline
            .append_trainer(|c| {
                let features = c.get("features")?;
                Ok(Outputs::new().score(
                    "score",
                    CoordinateDescentRegression::new(features, features),
                ))
            })
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_fit_returns_typed_predictor_and_fires_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pipeline = Pipeline::new(columns())
            .append_trainer(|c| {
                let label = c.get("label")?;
                let features = c.get("features")?;
                Ok(Outputs::new()
                    .keep(label)
                    .keep(features)
                    .score("score", CoordinateDescentRegression::new(label, features))
                    .on_fit(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }))
            })
            .unwrap();

        let fitted = pipeline.fit(&data(50)).unwrap();
        let predictor: &LinearRegressionPredictor = &fitted.predictor;
        assert_eq!(predictor.weights().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            fitted.model.output_columns().names(),
            vec!["label", "features", "score"]
        );
    }

    #[test]
    fn test_stage_outputs_feed_later_stages() {
        let pipeline = Pipeline::new(columns())
            .append(|c| {
                let features = c.get("features")?;
                Ok(Outputs::new()
                    .keep(c.get("label")?)
                    .add("scaled", Normalize::mean_variance(features))
                    .add("raw", Concatenate::new(&[features])))
            })
            .unwrap()
            .append_trainer(|c| {
                let label = c.get("label")?;
                let scaled = c.get("scaled")?;
                Ok(Outputs::new()
                    .keep(label)
                    .score("score", CoordinateDescentRegression::new(label, scaled)))
            })
            .unwrap();

        assert_eq!(
            pipeline.step_names(),
            vec!["Normalize", "Concatenate", "CoordinateDescentRegression"]
        );
        let fitted = pipeline.fit(&data(40)).unwrap();
        let scored = fitted.model.transform(&data(40)).unwrap();
        assert_eq!(scored.column_names(), vec!["label", "score"]);
    }

    #[test]
    fn test_fit_failure_wraps_step_and_skips_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pipeline = Pipeline::new(columns())
            .append_trainer(|c| {
                let label = c.get("label")?;
                let features = c.get("features")?;
                Ok(Outputs::new()
                    .score(
                        "score",
                        CoordinateDescentRegression::new(label, features).with_max_iterations(0),
                    )
                    .on_fit(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }))
            })
            .unwrap();

        let err = pipeline.fit(&data(20)).unwrap_err();
        assert!(matches!(
            err,
            FitError::Step {
                step: "CoordinateDescentRegression",
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fit_rejects_missing_source_column() {
        let pipeline = Pipeline::new(columns())
            .append(|c| Ok(Outputs::new().add("scaled", Normalize::min_max(c.get("features")?))))
            .unwrap();
        let data = DataView::new(3)
            .with_column(
                "label",
                ColumnType::scalar(ValueKind::Float),
                Array2::zeros((3, 1)),
            )
            .unwrap();
        assert!(matches!(
            pipeline.fit(&data),
            Err(FitError::Transform(_))
        ));
        assert!(matches!(
            pipeline.fit(&DataView::new(0)),
            Err(FitError::EmptyData)
        ));
    }
}
