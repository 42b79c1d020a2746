//! Seeded evaluation helpers: scoring metrics, train/test split and k-fold
//! cross-validation of a pipeline.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::data::DataView;
use crate::error::EvaluationError;
use crate::metrics::{RegressionLoss, RegressionMetrics, SquaredLoss};
use crate::pipeline::{FittedModel, Pipeline, TrainerSlot};
use crate::schema::ColumnHandle;

/// Outcome of one cross-validation fold.
#[derive(Debug)]
pub struct FoldResult<P> {
    /// Index of the held-out fold.
    pub fold: usize,
    /// Metrics on the held-out fold.
    pub metrics: RegressionMetrics,
    /// Model fitted on the other folds.
    pub model: FittedModel,
    /// Predictor trained on the other folds, or `()`.
    pub predictor: P,
}

/// Regression evaluation with a fixed seed; every call that shuffles starts
/// from the same seed, so results are reproducible.
pub struct RegressionContext {
    seed: u64,
    loss: Box<dyn RegressionLoss>,
}

impl fmt::Debug for RegressionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegressionContext")
            .field("seed", &self.seed)
            .field("loss", &self.loss.name())
            .finish()
    }
}

impl RegressionContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            loss: Box::new(SquaredLoss),
        }
    }

    /// Loss reported as [`RegressionMetrics::loss_fn`]. Squared loss by default.
    pub fn with_loss(mut self, loss: impl RegressionLoss + 'static) -> Self {
        self.loss = Box::new(loss);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Metrics of the `score` column against the `label` column.
    pub fn evaluate(
        &self,
        data: &DataView,
        label: &ColumnHandle,
        score: &ColumnHandle,
    ) -> Result<RegressionMetrics, EvaluationError> {
        data.check(label)?;
        data.check(score)?;
        let labels = data.scalar(label.name())?;
        let scores = data.scalar(score.name())?;
        RegressionMetrics::compute(labels, scores, self.loss.as_ref())
    }

    fn shuffled_rows(&self, n: usize) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        rows.shuffle(&mut rng);
        rows
    }

    /// Shuffle rows and split them into `(train, test)`, with roughly
    /// `test_fraction` of the rows in `test`. Neither side is ever empty.
    pub fn train_test_split(
        &self,
        data: &DataView,
        test_fraction: f64,
    ) -> Result<(DataView, DataView), EvaluationError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(EvaluationError::InvalidFraction(test_fraction));
        }
        let n = data.n_rows();
        if n < 2 {
            return Err(EvaluationError::NotEnoughRows { needed: 2, rows: n });
        }

        let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
        let rows = self.shuffled_rows(n);
        let (test, train) = rows.split_at(n_test);
        Ok((data.take_rows(train), data.take_rows(test)))
    }

    /// Fit `pipeline` `num_folds` times, each time holding out one fold,
    /// and evaluate the held-out rows.
    ///
    /// Fold membership is decided by one seeded shuffle; every row is held
    /// out exactly once.
    pub fn cross_validate<S: TrainerSlot>(
        &self,
        data: &DataView,
        pipeline: &Pipeline<S>,
        label: &ColumnHandle,
        score: &ColumnHandle,
        num_folds: usize,
    ) -> Result<Vec<FoldResult<S::Predictor>>, EvaluationError> {
        if num_folds < 2 {
            return Err(EvaluationError::InvalidFolds(num_folds));
        }
        let n = data.n_rows();
        if n < num_folds {
            return Err(EvaluationError::NotEnoughRows {
                needed: num_folds,
                rows: n,
            });
        }

        let mut assignment = vec![0; n];
        for (position, row) in self.shuffled_rows(n).into_iter().enumerate() {
            assignment[row] = position % num_folds;
        }

        let mut results = Vec::with_capacity(num_folds);
        for fold in 0..num_folds {
            let (test_rows, train_rows): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|&r| assignment[r] == fold);
            let train = data.take_rows(&train_rows);
            let test = data.take_rows(&test_rows);

            let fitted = pipeline.fit(&train)?;
            let scored = fitted.model.transform(&test)?;
            let metrics = self.evaluate(&scored, label, score)?;
            info!(
                fold,
                train_rows = train_rows.len(),
                test_rows = test_rows.len(),
                rms = metrics.rms,
                r_squared = metrics.r_squared,
                "cross-validation fold"
            );
            results.push(FoldResult {
                fold,
                metrics,
                model: fitted.model,
                predictor: fitted.predictor,
            });
        }
        Ok(results)
    }
}

impl Default for RegressionContext {
    fn default() -> Self {
        Self::new(0)
    }
}
