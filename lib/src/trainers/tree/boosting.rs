//! Gradient boosting with squared loss and leaf-wise tree growth.
//!
//! Every round fits a tree to the current residuals `y - F(x)`. A tree grows
//! by repeatedly splitting the leaf with the largest gain
//! ```text
//! gain = S_L² / n_L + S_R² / n_R - S² / n
//! ```
//! where `S` is the residual sum of a node and `n` its row count, until it
//! has `max_leaves` leaves or no leaf can be split. Leaf values are the mean
//! residual times the learning rate.
//!
//! Split search is pluggable through [`SplitFinder`]: [`ExactSplitFinder`]
//! scans sorted raw values, the histogram finder scans pre-binned values.

use ndarray::{ArrayView1, ArrayView2};
use tracing::debug;

use crate::error::FitError;

use super::tree::{Node, RegressionTree, TreeEnsemblePredictor};

/// Shape of the boosting run, shared by both tree trainers.
#[derive(Clone, Debug)]
pub(crate) struct BoostParams {
    pub num_trees: usize,
    pub max_leaves: usize,
    pub min_leaf: usize,
    pub learning_rate: f64,
}

impl BoostParams {
    pub(crate) fn validate(&self) -> Result<(), FitError> {
        if self.num_trees == 0 {
            return Err(FitError::InvalidParameter(
                "number of trees must be at least 1".to_string(),
            ));
        }
        if self.max_leaves < 2 {
            return Err(FitError::InvalidParameter(format!(
                "number of leaves must be at least 2, got {}",
                self.max_leaves
            )));
        }
        if self.min_leaf == 0 {
            return Err(FitError::InvalidParameter(
                "minimum rows per leaf must be at least 1".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(FitError::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Best split of one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SplitCandidate {
    pub feature: usize,
    /// Largest value that goes left.
    pub threshold: f32,
    pub gain: f64,
}

/// Finds the best split of a set of rows.
pub(crate) trait SplitFinder {
    fn find(&self, rows: &[usize], residuals: &[f64], min_leaf: usize) -> Option<SplitCandidate>;
}

/// Gain of splitting a node with sum `total` over `n` rows into a left part
/// with sum `left` over `n_left` rows.
#[inline]
pub(crate) fn split_gain(left: f64, n_left: usize, total: f64, n: usize) -> f64 {
    let right = total - left;
    let n_right = n - n_left;
    left * left / n_left as f64 + right * right / n_right as f64 - total * total / n as f64
}

/// Scans every distinct raw value of every feature.
pub(crate) struct ExactSplitFinder<'a> {
    features: ArrayView2<'a, f32>,
}

impl<'a> ExactSplitFinder<'a> {
    pub(crate) fn new(features: ArrayView2<'a, f32>) -> Self {
        Self { features }
    }
}

impl SplitFinder for ExactSplitFinder<'_> {
    fn find(&self, rows: &[usize], residuals: &[f64], min_leaf: usize) -> Option<SplitCandidate> {
        let n = rows.len();
        if n < 2 * min_leaf {
            return None;
        }
        let total: f64 = rows.iter().map(|&r| residuals[r]).sum();
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();

        for feature in 0..self.features.ncols() {
            let column = self.features.column(feature);
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut left = 0.0;
            for i in 0..n - 1 {
                left += residuals[sorted[i]];
                let n_left = i + 1;
                if n_left < min_leaf || n - n_left < min_leaf {
                    continue;
                }
                let value = column[sorted[i]];
                if value == column[sorted[i + 1]] {
                    continue;
                }
                let gain = split_gain(left, n_left, total, n);
                if best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: value,
                        gain,
                    });
                }
            }
        }
        best.filter(|b| b.gain > 0.0)
    }
}

struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    sum: f64,
    split: Option<SplitCandidate>,
}

impl OpenLeaf {
    fn new(
        node: usize,
        rows: Vec<usize>,
        residuals: &[f64],
        finder: &dyn SplitFinder,
        min_leaf: usize,
    ) -> Self {
        let sum = rows.iter().map(|&r| residuals[r]).sum();
        let split = finder.find(&rows, residuals, min_leaf);
        Self {
            node,
            rows,
            sum,
            split,
        }
    }
}

/// Grow one tree on `residuals`, best leaf first.
pub(crate) fn grow_tree(
    features: ArrayView2<'_, f32>,
    residuals: &[f64],
    params: &BoostParams,
    finder: &dyn SplitFinder,
) -> RegressionTree {
    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let all_rows = (0..features.nrows()).collect();
    let mut leaves = vec![OpenLeaf::new(0, all_rows, residuals, finder, params.min_leaf)];

    while leaves.len() < params.max_leaves {
        let best = leaves
            .iter()
            .enumerate()
            .filter_map(|(i, leaf)| leaf.split.map(|s| (i, s.gain)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        let Some(index) = best else {
            break;
        };

        let leaf = leaves.swap_remove(index);
        let Some(split) = leaf.split else {
            break;
        };
        let column = features.column(split.feature);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
            .rows
            .into_iter()
            .partition(|&r| column[r] <= split.threshold);

        let left = nodes.len();
        let right = left + 1;
        nodes.push(Node::Leaf { value: 0.0 });
        nodes.push(Node::Leaf { value: 0.0 });
        nodes[leaf.node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            gain: split.gain,
        };
        leaves.push(OpenLeaf::new(left, left_rows, residuals, finder, params.min_leaf));
        leaves.push(OpenLeaf::new(right, right_rows, residuals, finder, params.min_leaf));
    }

    for leaf in leaves {
        let mean = if leaf.rows.is_empty() {
            0.0
        } else {
            leaf.sum / leaf.rows.len() as f64
        };
        nodes[leaf.node] = Node::Leaf {
            value: (mean * params.learning_rate) as f32,
        };
    }
    RegressionTree::from_nodes(nodes)
}

/// Run the boosting loop and assemble the ensemble.
pub(crate) fn boost(
    labels: ArrayView1<'_, f32>,
    features: ArrayView2<'_, f32>,
    params: &BoostParams,
    finder: &dyn SplitFinder,
) -> TreeEnsemblePredictor {
    let n = labels.len();
    let base_score = labels.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64;
    let mut scores = vec![base_score; n];
    let mut residuals = vec![0.0; n];
    let mut trees = Vec::with_capacity(params.num_trees);

    for round in 0..params.num_trees {
        for (i, r) in residuals.iter_mut().enumerate() {
            *r = f64::from(labels[i]) - scores[i];
        }
        let tree = grow_tree(features, &residuals, params, finder);
        for (i, row) in features.outer_iter().enumerate() {
            scores[i] += f64::from(tree.predict_row(row));
        }

        if round % 10 == 0 || round + 1 == params.num_trees {
            let mse = labels
                .iter()
                .zip(&scores)
                .map(|(&y, s)| (f64::from(y) - s).powi(2))
                .sum::<f64>()
                / n as f64;
            debug!(round, leaves = tree.n_leaves(), train_rmse = mse.sqrt(), "boosting round");
        }
        trees.push(tree);
    }

    TreeEnsemblePredictor::new(base_score as f32, features.ncols(), trees)
}
