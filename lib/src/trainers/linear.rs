//! Linear regression trained by cyclic coordinate descent.
//!
//! Minimizes the elastic-net objective
//! ```text
//! 1/(2n) · Σ (y - x·w - b)²  +  l2/2 · ‖w‖²  +  l1 · ‖w‖₁
//! ```
//! on centered data, one weight at a time:
//! ```text
//! ρ_j = 1/n · Σ x_ij · r_i + z_j · w_j        z_j = 1/n · Σ x_ij²
//! w_j = soft_threshold(ρ_j, l1) / (z_j + l2)
//! ```
//! The bias is recovered from the means and is not penalized.
//!
//! # Example
//! ```ignore
//! let trainer = CoordinateDescentRegression::new(label, features)
//!     .with_l1_threshold(0.0)
//!     .with_max_iterations(100);
//! ```

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FitError, TransformError};
use crate::schema::ColumnHandle;

use super::{check_feature_count, validate_training_data, Predictor, Trainer};

/// Hyperparameters of [`CoordinateDescentRegression`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateDescentParams {
    /// L1 penalty; weights with smaller correlation are set to zero.
    pub l1_threshold: f32,
    /// L2 penalty.
    pub l2_const: f32,
    /// Maximum number of passes over all weights.
    pub max_iterations: usize,
    /// Stop when no weight moves more than this (relative to the largest weight).
    pub tolerance: f64,
}

impl Default for CoordinateDescentParams {
    fn default() -> Self {
        Self {
            l1_threshold: 0.0,
            l2_const: 0.0,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl CoordinateDescentParams {
    fn validate(&self) -> Result<(), FitError> {
        if self.l1_threshold.is_nan() || self.l1_threshold < 0.0 {
            return Err(FitError::InvalidParameter(format!(
                "l1_threshold must be non-negative, got {}",
                self.l1_threshold
            )));
        }
        if self.l2_const.is_nan() || self.l2_const < 0.0 {
            return Err(FitError::InvalidParameter(format!(
                "l2_const must be non-negative, got {}",
                self.l2_const
            )));
        }
        if self.max_iterations == 0 {
            return Err(FitError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(FitError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Elastic-net linear regression trainer.
#[derive(Clone, Debug)]
pub struct CoordinateDescentRegression {
    label: ColumnHandle,
    features: ColumnHandle,
    params: CoordinateDescentParams,
}

impl CoordinateDescentRegression {
    pub fn new(label: &ColumnHandle, features: &ColumnHandle) -> Self {
        Self {
            label: label.clone(),
            features: features.clone(),
            params: CoordinateDescentParams::default(),
        }
    }

    pub fn with_params(mut self, params: CoordinateDescentParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_l1_threshold(mut self, l1_threshold: f32) -> Self {
        self.params.l1_threshold = l1_threshold;
        self
    }

    pub fn with_l2_const(mut self, l2_const: f32) -> Self {
        self.params.l2_const = l2_const;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.params.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.params.tolerance = tolerance;
        self
    }

    pub fn params(&self) -> &CoordinateDescentParams {
        &self.params
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl Trainer for CoordinateDescentRegression {
    type Predictor = LinearRegressionPredictor;

    fn name(&self) -> &'static str {
        "CoordinateDescentRegression"
    }

    fn label(&self) -> &ColumnHandle {
        &self.label
    }

    fn features(&self) -> &ColumnHandle {
        &self.features
    }

    fn train(
        &self,
        labels: ArrayView1<'_, f32>,
        features: ArrayView2<'_, f32>,
    ) -> Result<LinearRegressionPredictor, FitError> {
        self.params.validate()?;
        validate_training_data(&self.label, &self.features, labels, features)?;

        let n = labels.len() as f64;
        let x: Array2<f64> = features.mapv(f64::from);
        let y: Array1<f64> = labels.mapv(f64::from);

        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.sum() / n;
        let xc = &x - &x_mean;
        let mut residual = &y - y_mean;

        let z: Array1<f64> = xc.map_axis(Axis(0), |col| col.dot(&col) / n);
        let l1 = f64::from(self.params.l1_threshold);
        let l2 = f64::from(self.params.l2_const);
        let mut w = Array1::<f64>::zeros(x.ncols());

        let mut converged = false;
        let mut iterations = 0;
        let mut max_delta = 0.0f64;
        while iterations < self.params.max_iterations {
            iterations += 1;
            max_delta = 0.0;
            for j in 0..w.len() {
                if z[j] == 0.0 {
                    continue;
                }
                let column = xc.column(j);
                let rho = column.dot(&residual) / n + z[j] * w[j];
                let updated = soft_threshold(rho, l1) / (z[j] + l2);
                let delta = updated - w[j];
                if delta != 0.0 {
                    residual.scaled_add(-delta, &column);
                    w[j] = updated;
                    max_delta = max_delta.max(delta.abs());
                }
            }
            let scale = w.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
            if max_delta <= self.params.tolerance * scale {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(iterations, "coordinate descent converged");
        } else {
            warn!(
                iterations,
                max_delta,
                "coordinate descent stopped at max_iterations without converging"
            );
        }

        let bias = y_mean - x_mean.dot(&w);
        Ok(LinearRegressionPredictor {
            weights: w.mapv(|v| v as f32),
            bias: bias as f32,
        })
    }
}

/// A trained linear model: `score = x·weights + bias`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressionPredictor {
    weights: Array1<f32>,
    bias: f32,
}

impl LinearRegressionPredictor {
    pub fn new(weights: Array1<f32>, bias: f32) -> Self {
        Self { weights, bias }
    }

    pub fn weights(&self) -> &Array1<f32> {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }
}

impl Predictor for LinearRegressionPredictor {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Array1<f32>, TransformError> {
        check_feature_count(self.n_features(), &features)?;
        Ok(features.dot(&self.weights) + self.bias)
    }

    fn feature_weights(&self) -> Array1<f32> {
        self.weights.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, ValueKind};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn trainer() -> CoordinateDescentRegression {
        let label = ColumnHandle::new("label", ColumnType::scalar(ValueKind::Float));
        let features = ColumnHandle::new("features", ColumnType::vector(ValueKind::Float, 2));
        CoordinateDescentRegression::new(&label, &features)
    }

    /// y = 3*x0 - 2*x1 + 0.5
    fn linear_data() -> (Array1<f32>, Array2<f32>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| {
            if j == 0 {
                i as f32 / 10.0
            } else {
                ((i * 7) % 5) as f32
            }
        });
        let y = x.map_axis(Axis(1), |r| 3.0 * r[0] - 2.0 * r[1] + 0.5);
        (y, x)
    }

    #[test]
    fn test_recovers_exact_linear_relation() {
        let (y, x) = linear_data();
        let predictor = trainer()
            .with_max_iterations(1000)
            .train(y.view(), x.view())
            .unwrap();

        assert_abs_diff_eq!(predictor.weights()[0], 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(predictor.weights()[1], -2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(predictor.bias(), 0.5, epsilon = 1e-3);

        let scores = predictor.predict(x.view()).unwrap();
        for (s, t) in scores.iter().zip(y.iter()) {
            assert_abs_diff_eq!(*s, *t, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let predictor = LinearRegressionPredictor::new(array![1.0, 2.0], 0.0);
        assert_eq!(
            predictor.predict(array![[1.0f32, 2.0, 3.0]].view()),
            Err(TransformError::FeatureCount {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_l1_zeroes_weak_weights() {
        let (y, x) = linear_data();
        let dense = trainer().train(y.view(), x.view()).unwrap();
        let sparse = trainer()
            .with_l1_threshold(1000.0)
            .train(y.view(), x.view())
            .unwrap();

        assert!(dense.weights().iter().all(|w| w.abs() > 0.1));
        assert!(sparse.weights().iter().all(|&w| w == 0.0));
        // with all weights zero the model predicts the mean
        assert_abs_diff_eq!(sparse.bias(), y.mean().unwrap(), epsilon = 1e-4);
    }

    #[test]
    fn test_l2_shrinks_weights() {
        let (y, x) = linear_data();
        let plain = trainer().train(y.view(), x.view()).unwrap();
        let ridge = trainer().with_l2_const(10.0).train(y.view(), x.view()).unwrap();
        assert!(ridge.weights()[0].abs() < plain.weights()[0].abs());
    }

    #[test]
    fn test_constant_feature_gets_zero_weight() {
        let x = array![[1.0, 4.0], [2.0, 4.0], [3.0, 4.0]];
        let y = array![2.0, 4.0, 6.0];
        let predictor = trainer().train(y.view(), x.view()).unwrap();
        assert_eq!(predictor.weights()[1], 0.0);
        assert_abs_diff_eq!(predictor.weights()[0], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_invalid_parameters() {
        let (y, x) = linear_data();
        for bad in [
            trainer().with_max_iterations(0),
            trainer().with_l1_threshold(-1.0),
            trainer().with_l2_const(f32::NAN),
            trainer().with_tolerance(0.0),
        ] {
            assert!(matches!(
                bad.train(y.view(), x.view()),
                Err(FitError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_rejects_non_finite_label() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, f32::INFINITY];
        assert!(matches!(
            trainer().train(y.view(), x.view()),
            Err(FitError::NonFinite { row: 1, .. })
        ));
    }

    #[test]
    fn test_predictor_serde() {
        let predictor = LinearRegressionPredictor::new(array![1.5, -0.5], 2.0);
        let json = serde_json::to_string(&predictor).unwrap();
        let back: LinearRegressionPredictor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, predictor);
        assert_eq!(back.feature_weights(), array![1.5f32, -0.5]);
    }
}
