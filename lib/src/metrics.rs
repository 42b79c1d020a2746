//! Regression metrics over a label and a score column.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{EvaluationError, TransformError};

/// Per-row loss used for [`RegressionMetrics::loss_fn`].
pub trait RegressionLoss: Send + Sync {
    fn name(&self) -> &'static str;

    fn loss(&self, label: f64, score: f64) -> f64;
}

/// `(score - label)²`
#[derive(Clone, Copy, Debug, Default)]
pub struct SquaredLoss;

impl RegressionLoss for SquaredLoss {
    fn name(&self) -> &'static str {
        "squared"
    }

    fn loss(&self, label: f64, score: f64) -> f64 {
        (score - label).powi(2)
    }
}

/// `|score - label|`
#[derive(Clone, Copy, Debug, Default)]
pub struct AbsoluteLoss;

impl RegressionLoss for AbsoluteLoss {
    fn name(&self) -> &'static str {
        "absolute"
    }

    fn loss(&self, label: f64, score: f64) -> f64 {
        (score - label).abs()
    }
}

/// Quality of a scored dataset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error.
    pub l1: f64,
    /// Mean squared error.
    pub l2: f64,
    /// Mean of the configured [`RegressionLoss`].
    pub loss_fn: f64,
    /// Root mean squared error.
    pub rms: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
}

impl RegressionMetrics {
    /// Compare `scores` against `labels`. Rows whose label is `NaN` are skipped.
    ///
    /// R² is `1 - SS_res / SS_tot`; with a constant label it is 1 for a
    /// perfect fit and 0 otherwise.
    pub fn compute(
        labels: ArrayView1<'_, f32>,
        scores: ArrayView1<'_, f32>,
        loss: &dyn RegressionLoss,
    ) -> Result<Self, EvaluationError> {
        if labels.len() != scores.len() {
            return Err(TransformError::RowCountMismatch {
                column: "score".to_string(),
                expected: labels.len(),
                found: scores.len(),
            }
            .into());
        }

        let rows: Vec<(f64, f64)> = labels
            .iter()
            .zip(scores.iter())
            .filter(|(y, _)| !y.is_nan())
            .map(|(&y, &s)| (f64::from(y), f64::from(s)))
            .collect();
        if rows.is_empty() {
            return Err(EvaluationError::NoValidRows);
        }
        let n = rows.len() as f64;

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut loss_sum = 0.0;
        let mut label_sum = 0.0;
        for &(y, s) in &rows {
            abs_sum += (s - y).abs();
            sq_sum += (s - y).powi(2);
            loss_sum += loss.loss(y, s);
            label_sum += y;
        }
        let mean = label_sum / n;
        let ss_tot: f64 = rows.iter().map(|(y, _)| (y - mean).powi(2)).sum();

        let r_squared = if ss_tot == 0.0 {
            if sq_sum == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - sq_sum / ss_tot
        };

        let l2 = sq_sum / n;
        Ok(Self {
            l1: abs_sum / n,
            l2,
            loss_fn: loss_sum / n,
            rms: l2.sqrt(),
            r_squared,
        })
    }

    /// Field-wise arithmetic mean, `None` for an empty slice.
    pub fn average(metrics: &[RegressionMetrics]) -> Option<RegressionMetrics> {
        if metrics.is_empty() {
            return None;
        }
        let n = metrics.len() as f64;
        let sum = metrics.iter().fold(
            RegressionMetrics {
                l1: 0.0,
                l2: 0.0,
                loss_fn: 0.0,
                rms: 0.0,
                r_squared: 0.0,
            },
            |acc, m| RegressionMetrics {
                l1: acc.l1 + m.l1,
                l2: acc.l2 + m.l2,
                loss_fn: acc.loss_fn + m.loss_fn,
                rms: acc.rms + m.rms,
                r_squared: acc.r_squared + m.r_squared,
            },
        );
        Some(RegressionMetrics {
            l1: sum.l1 / n,
            l2: sum.l2 / n,
            loss_fn: sum.loss_fn / n,
            rms: sum.rms / n,
            r_squared: sum.r_squared / n,
        })
    }
}
