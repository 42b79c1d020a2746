//! Regression trees and the boosted ensemble predictor.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::trainers::{check_feature_count, Predictor};

/// A node of a [`RegressionTree`]. Children are indices into the node array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go left, all others (and `NaN`) right.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        gain: f64,
    },
    Leaf {
        value: f32,
    },
}

/// Binary regression tree stored as a flat node array; node 0 is the root.
///
/// Children always sit after their parent, so deserialization rejects
/// node arrays that could loop or index out of bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeRepr")]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct TreeRepr {
    nodes: Vec<Node>,
}

impl TryFrom<TreeRepr> for RegressionTree {
    type Error = String;

    fn try_from(repr: TreeRepr) -> Result<Self, Self::Error> {
        if repr.nodes.is_empty() {
            return Err("regression tree has no nodes".to_string());
        }
        let n = repr.nodes.len();
        for (index, node) in repr.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = *node {
                if left <= index || right <= index || left >= n || right >= n {
                    return Err(format!(
                        "node {index} has invalid children {left} and {right} in a tree of {n} nodes"
                    ));
                }
            }
        }
        Ok(Self { nodes: repr.nodes })
    }
}

impl RegressionTree {
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Value of the leaf `row` falls into.
    pub fn predict_row(&self, row: ArrayView1<'_, f32>) -> f32 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    fn add_gains(&self, totals: &mut [f64]) {
        for node in &self.nodes {
            if let Node::Split { feature, gain, .. } = node {
                totals[*feature] += gain;
            }
        }
    }
}

/// Additive ensemble of regression trees on top of a constant base score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnsembleRepr")]
pub struct TreeEnsemblePredictor {
    base_score: f32,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

#[derive(Deserialize)]
struct EnsembleRepr {
    base_score: f32,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl TryFrom<EnsembleRepr> for TreeEnsemblePredictor {
    type Error = String;

    fn try_from(repr: EnsembleRepr) -> Result<Self, Self::Error> {
        for tree in &repr.trees {
            for node in &tree.nodes {
                if let Node::Split { feature, .. } = *node {
                    if feature >= repr.n_features {
                        return Err(format!(
                            "split on feature {feature} but the ensemble has {} features",
                            repr.n_features
                        ));
                    }
                }
            }
        }
        Ok(Self::new(repr.base_score, repr.n_features, repr.trees))
    }
}

impl TreeEnsemblePredictor {
    pub(crate) fn new(base_score: f32, n_features: usize, trees: Vec<RegressionTree>) -> Self {
        Self {
            base_score,
            n_features,
            trees,
        }
    }

    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Predictor for TreeEnsemblePredictor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<Array1<f32>, TransformError> {
        check_feature_count(self.n_features, &features)?;
        Ok(features
            .outer_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .fold(self.base_score, |acc, tree| acc + tree.predict_row(row))
            })
            .collect())
    }

    /// Total split gain per feature over all trees.
    fn feature_weights(&self) -> Array1<f32> {
        let mut totals = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            tree.add_gains(&mut totals);
        }
        totals.into_iter().map(|g| g as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stump(feature: usize, threshold: f32, left: f32, right: f32, gain: f64) -> RegressionTree {
        RegressionTree::from_nodes(vec![
            Node::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
                gain,
            },
            Node::Leaf { value: left },
            Node::Leaf { value: right },
        ])
    }

    #[test]
    fn test_predict_row_follows_threshold() {
        let tree = stump(0, 1.5, -1.0, 1.0, 2.0);
        assert_eq!(tree.predict_row(array![1.5f32].view()), -1.0);
        assert_eq!(tree.predict_row(array![1.6f32].view()), 1.0);
        assert_eq!(tree.predict_row(array![f32::NAN].view()), 1.0);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_ensemble_adds_trees_to_base() {
        let predictor = TreeEnsemblePredictor::new(
            10.0,
            2,
            vec![stump(0, 0.0, -1.0, 1.0, 3.0), stump(1, 0.0, -2.0, 2.0, 1.0)],
        );
        let scores = predictor
            .predict(array![[-1.0f32, 1.0], [1.0, -1.0]].view())
            .unwrap();
        assert_eq!(scores, array![11.0f32, 9.0]);
        assert_eq!(predictor.feature_weights(), array![3.0f32, 1.0]);

        assert_eq!(
            predictor.predict(array![[1.0f32]].view()),
            Err(TransformError::FeatureCount {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_feature() {
        let valid = TreeEnsemblePredictor::new(0.0, 2, vec![stump(1, 0.0, -1.0, 1.0, 1.0)]);
        let json = serde_json::to_string(&valid).unwrap();
        let back: TreeEnsemblePredictor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, valid);

        let bad = TreeEnsemblePredictor::new(0.0, 2, vec![stump(5, 0.0, -1.0, 1.0, 1.0)]);
        let json = serde_json::to_string(&bad).unwrap();
        let err = serde_json::from_str::<TreeEnsemblePredictor>(&json).unwrap_err();
        assert!(err.to_string().contains("feature 5"), "{err}");
    }

    #[test]
    fn test_deserialize_rejects_looping_tree() {
        let looping = RegressionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
                gain: 0.0,
            }],
        };
        let json = serde_json::to_string(&looping).unwrap();
        assert!(serde_json::from_str::<RegressionTree>(&json).is_err());
        assert!(serde_json::from_str::<RegressionTree>(r#"{"nodes":[]}"#).is_err());
    }
}
