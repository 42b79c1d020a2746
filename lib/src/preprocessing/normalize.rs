//! Per-slot normalization of a float column.
//!
//! Both modes learn an `offset` and a `scale` per slot and compute
//! ```text
//! y = (x - offset) * scale
//! ```
//! - min-max: `offset = min`, `scale = 1 / (max - min)`
//! - mean-variance: `offset = mean`, `scale = 1 / std`
//!
//! Slots that are constant on the training data get `scale = 0`, so they
//! always map to `0`. `NaN` values are ignored while fitting and stay `NaN`.
//!
//! # Example
//! ```ignore
//! let outputs = Outputs::new()
//!     .keep(label)
//!     .add("features", Normalize::mean_variance(features));
//! ```

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::data::DataView;
use crate::error::{FitError, SchemaError, TransformError};
use crate::pipeline::{Estimator, Transformer};
use crate::schema::{ColumnHandle, ColumnType, ValueKind};

/// How offsets and scales are learned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    MinMax,
    MeanVariance,
}

/// Normalization estimator (unfitted).
#[derive(Clone, Debug)]
pub struct Normalize {
    input: ColumnHandle,
    mode: NormalizeMode,
}

impl Normalize {
    pub fn new(input: &ColumnHandle, mode: NormalizeMode) -> Self {
        Self {
            input: input.clone(),
            mode,
        }
    }

    /// Scale every slot to `[0, 1]` over the training data.
    pub fn min_max(input: &ColumnHandle) -> Self {
        Self::new(input, NormalizeMode::MinMax)
    }

    /// Center every slot and scale it to unit variance.
    pub fn mean_variance(input: &ColumnHandle) -> Self {
        Self::new(input, NormalizeMode::MeanVariance)
    }

    pub fn mode(&self) -> NormalizeMode {
        self.mode
    }
}

impl Estimator for Normalize {
    type Fitted = FittedNormalize;

    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn inputs(&self) -> Vec<ColumnHandle> {
        vec![self.input.clone()]
    }

    fn output_type(&self) -> Result<ColumnType, SchemaError> {
        let ty = self.input.column_type();
        if ty.kind != ValueKind::Float {
            return Err(SchemaError::TypeMismatch {
                column: self.input.name().to_string(),
                expected: "a float column".to_string(),
                found: ty,
            });
        }
        Ok(ty)
    }

    fn fit(&self, data: &DataView) -> Result<FittedNormalize, FitError> {
        let values = data.check(&self.input)?.values();
        if values.nrows() == 0 {
            return Err(FitError::EmptyData);
        }

        let (offset, scale): (Vec<f32>, Vec<f32>) = values
            .columns()
            .into_iter()
            .map(|slot| slot_params(slot, self.mode))
            .unzip();

        Ok(FittedNormalize {
            input: self.input.clone(),
            params: NormalizeParams {
                mode: self.mode,
                offset: Array1::from_vec(offset),
                scale: Array1::from_vec(scale),
            },
        })
    }
}

fn slot_params(slot: ArrayView1<'_, f32>, mode: NormalizeMode) -> (f32, f32) {
    let finite: Vec<f64> = slot
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as f64)
        .collect();
    if finite.is_empty() {
        return (0.0, 0.0);
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (offset, spread) = match mode {
        NormalizeMode::MinMax => (min, max - min),
        NormalizeMode::MeanVariance => {
            let n = finite.len() as f64;
            let mean = finite.iter().sum::<f64>() / n;
            let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            (mean, variance.sqrt())
        }
    };

    // Only a constant slot maps to zero; tiny ranges still get scaled.
    let scale = if min < max && spread > 0.0 {
        (1.0 / spread).min(f32::MAX as f64)
    } else {
        0.0
    };
    (offset as f32, scale as f32)
}

/// Learned normalization parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizeParams {
    pub mode: NormalizeMode,
    pub offset: Array1<f32>,
    pub scale: Array1<f32>,
}

/// Fitted normalization ready for inference.
#[derive(Clone, Debug)]
pub struct FittedNormalize {
    input: ColumnHandle,
    params: NormalizeParams,
}

impl FittedNormalize {
    pub fn params(&self) -> &NormalizeParams {
        &self.params
    }
}

impl Transformer for FittedNormalize {
    fn transform(&self, data: &DataView) -> Result<Array2<f32>, TransformError> {
        let values = data.check(&self.input)?.values();
        if values.ncols() != self.params.offset.len() {
            return Err(TransformError::WidthMismatch {
                column: self.input.name().to_string(),
                expected: self.params.offset.len(),
                found: values.ncols(),
            });
        }
        Ok((&values - &self.params.offset) * &self.params.scale)
    }
}
