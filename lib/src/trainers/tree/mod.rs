//! Gradient-boosted regression trees.
//!
//! Two trainers share one boosting loop and differ in split search:
//! - [`FastTreeRegression`]: exact search over sorted raw feature values
//! - [`LightGbmRegression`]: search over at most `max_bin` quantile bins per
//!   feature, computed once before boosting
//!
//! Both produce a [`TreeEnsemblePredictor`] whose feature weights are the
//! total split gain per feature.

mod boosting;
mod histogram;
#[allow(clippy::module_inception)]
mod tree;

pub use tree::{Node, RegressionTree, TreeEnsemblePredictor};

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FitError;
use crate::schema::ColumnHandle;

use super::{validate_training_data, Trainer};
use boosting::{boost, BoostParams, ExactSplitFinder};
use histogram::HistogramSplitFinder;

/// Hyperparameters of [`FastTreeRegression`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastTreeParams {
    pub num_trees: usize,
    pub num_leaves: usize,
    pub min_datapoints_in_leaves: usize,
    pub learning_rate: f64,
}

impl Default for FastTreeParams {
    fn default() -> Self {
        Self {
            num_trees: 100,
            num_leaves: 20,
            min_datapoints_in_leaves: 10,
            learning_rate: 0.2,
        }
    }
}

impl From<&FastTreeParams> for BoostParams {
    fn from(p: &FastTreeParams) -> Self {
        BoostParams {
            num_trees: p.num_trees,
            max_leaves: p.num_leaves,
            min_leaf: p.min_datapoints_in_leaves,
            learning_rate: p.learning_rate,
        }
    }
}

/// Boosted trees with exact split search.
#[derive(Clone, Debug)]
pub struct FastTreeRegression {
    label: ColumnHandle,
    features: ColumnHandle,
    params: FastTreeParams,
}

impl FastTreeRegression {
    pub fn new(label: &ColumnHandle, features: &ColumnHandle) -> Self {
        Self {
            label: label.clone(),
            features: features.clone(),
            params: FastTreeParams::default(),
        }
    }

    pub fn with_params(mut self, params: FastTreeParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_num_trees(mut self, num_trees: usize) -> Self {
        self.params.num_trees = num_trees;
        self
    }

    pub fn with_num_leaves(mut self, num_leaves: usize) -> Self {
        self.params.num_leaves = num_leaves;
        self
    }

    pub fn with_min_datapoints_in_leaves(mut self, min_datapoints: usize) -> Self {
        self.params.min_datapoints_in_leaves = min_datapoints;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.params.learning_rate = learning_rate;
        self
    }

    pub fn params(&self) -> &FastTreeParams {
        &self.params
    }
}

impl Trainer for FastTreeRegression {
    type Predictor = TreeEnsemblePredictor;

    fn name(&self) -> &'static str {
        "FastTreeRegression"
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
    ) -> Result<TreeEnsemblePredictor, FitError> {
        let params = BoostParams::from(&self.params);
        params.validate()?;
        validate_training_data(&self.label, &self.features, labels, features)?;

        let finder = ExactSplitFinder::new(features);
        Ok(boost(labels, features, &params, &finder))
    }
}

/// Hyperparameters of [`LightGbmRegression`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightGbmParams {
    pub num_boost_round: usize,
    pub num_leaves: usize,
    pub min_data_per_leaf: usize,
    pub learning_rate: f64,
    /// Maximum number of bins per feature.
    pub max_bin: usize,
}

impl Default for LightGbmParams {
    fn default() -> Self {
        Self {
            num_boost_round: 100,
            num_leaves: 31,
            min_data_per_leaf: 20,
            learning_rate: 0.1,
            max_bin: 255,
        }
    }
}

impl From<&LightGbmParams> for BoostParams {
    fn from(p: &LightGbmParams) -> Self {
        BoostParams {
            num_trees: p.num_boost_round,
            max_leaves: p.num_leaves,
            min_leaf: p.min_data_per_leaf,
            learning_rate: p.learning_rate,
        }
    }
}

/// Boosted trees with histogram split search.
#[derive(Clone, Debug)]
pub struct LightGbmRegression {
    label: ColumnHandle,
    features: ColumnHandle,
    params: LightGbmParams,
}

impl LightGbmRegression {
    pub fn new(label: &ColumnHandle, features: &ColumnHandle) -> Self {
        Self {
            label: label.clone(),
            features: features.clone(),
            params: LightGbmParams::default(),
        }
    }

    pub fn with_params(mut self, params: LightGbmParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_num_boost_round(mut self, rounds: usize) -> Self {
        self.params.num_boost_round = rounds;
        self
    }

    pub fn with_num_leaves(mut self, num_leaves: usize) -> Self {
        self.params.num_leaves = num_leaves;
        self
    }

    pub fn with_min_data_per_leaf(mut self, min_data: usize) -> Self {
        self.params.min_data_per_leaf = min_data;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.params.learning_rate = learning_rate;
        self
    }

    pub fn with_max_bin(mut self, max_bin: usize) -> Self {
        self.params.max_bin = max_bin;
        self
    }

    pub fn params(&self) -> &LightGbmParams {
        &self.params
    }
}

impl Trainer for LightGbmRegression {
    type Predictor = TreeEnsemblePredictor;

    fn name(&self) -> &'static str {
        "LightGbmRegression"
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
    ) -> Result<TreeEnsemblePredictor, FitError> {
        let params = BoostParams::from(&self.params);
        params.validate()?;
        if self.params.max_bin < 2 {
            return Err(FitError::InvalidParameter(format!(
                "max_bin must be at least 2, got {}",
                self.params.max_bin
            )));
        }
        validate_training_data(&self.label, &self.features, labels, features)?;

        let finder = HistogramSplitFinder::new(features, self.params.max_bin);
        debug!(max_bin = self.params.max_bin, "binned features");
        Ok(boost(labels, features, &params, &finder))
    }
}
