//! Trainers: estimators that learn a predictor from a label and features.
//!
//! A [`Trainer`] is configured with the handles of its label (scalar float)
//! and feature (float, scalar or vector) columns. Appending it to a pipeline
//! adds a score column; fitting the pipeline produces its [`Predictor`].
//!
//! # Available Trainers
//! - [`CoordinateDescentRegression`]: elastic-net linear regression
//! - [`FastTreeRegression`]: boosted regression trees with exact splits
//! - [`LightGbmRegression`]: boosted regression trees with histogram splits

pub mod linear;
pub mod tree;

pub use linear::{CoordinateDescentParams, CoordinateDescentRegression, LinearRegressionPredictor};
pub use tree::{
    FastTreeParams, FastTreeRegression, LightGbmParams, LightGbmRegression, RegressionTree,
    TreeEnsemblePredictor,
};

use std::fmt::Debug;

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{FitError, TransformError};
use crate::schema::ColumnHandle;

/// A trained model artifact that scores feature rows.
pub trait Predictor: Debug + Send + Sync + 'static {
    /// Number of feature slots expected per row.
    fn n_features(&self) -> usize;

    /// Score every row of `features` (`n_rows × n_features`).
    ///
    /// # Errors
    /// [`TransformError::FeatureCount`] when the row width is not
    /// [`n_features`](Self::n_features).
    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Array1<f32>, TransformError>;

    /// Importance of each feature slot. Meaning depends on the model.
    fn feature_weights(&self) -> Array1<f32>;
}

pub(crate) fn check_feature_count(
    expected: usize,
    features: &ArrayView2<'_, f32>,
) -> Result<(), TransformError> {
    if features.ncols() != expected {
        return Err(TransformError::FeatureCount {
            expected,
            found: features.ncols(),
        });
    }
    Ok(())
}

/// An unfitted learning algorithm bound to its label and feature columns.
pub trait Trainer: Send + Sync + 'static {
    /// The concrete predictor produced by [`train`](Self::train).
    type Predictor: Predictor;

    fn name(&self) -> &'static str;

    fn label(&self) -> &ColumnHandle;

    fn features(&self) -> &ColumnHandle;

    /// Learn a predictor.
    ///
    /// # Errors
    /// [`FitError`] on empty or non-finite data, mismatched row counts, or
    /// invalid parameters.
    fn train(
        &self,
        labels: ArrayView1<'_, f32>,
        features: ArrayView2<'_, f32>,
    ) -> Result<Self::Predictor, FitError>;
}

/// Shared input checks for trainers.
pub(crate) fn validate_training_data(
    label: &ColumnHandle,
    features: &ColumnHandle,
    labels: ArrayView1<'_, f32>,
    values: ArrayView2<'_, f32>,
) -> Result<(), FitError> {
    if labels.len() != values.nrows() {
        return Err(FitError::RowMismatch {
            labels: labels.len(),
            features: values.nrows(),
        });
    }
    if labels.is_empty() {
        return Err(FitError::EmptyData);
    }
    if let Some(row) = labels.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFinite {
            column: label.name().to_string(),
            row,
        });
    }
    if let Some((row, _)) = values
        .outer_iter()
        .enumerate()
        .find(|(_, r)| r.iter().any(|v| !v.is_finite()))
    {
        return Err(FitError::NonFinite {
            column: features.name().to_string(),
            row,
        });
    }
    Ok(())
}
