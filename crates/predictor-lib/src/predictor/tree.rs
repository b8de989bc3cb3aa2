//! Gradient-boosted decision tree ensembles
//!
//! Trees are stored as flat node arrays. Node 0 is the root, and every split
//! points at children with a larger index, so evaluation always terminates.
//! The summed leaf values are a margin; the probability is its sigmoid.

use super::{check_width, sigmoid, Predictor};
use crate::models::FeatureVector;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A single node in a flattened tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// `x[feature] < threshold` goes to `left`, everything else to `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn evaluate(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf(value) => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }

    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf(_) => None,
            })
            .max()
    }

    fn validate(&self, tree_idx: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("tree {} has no nodes", tree_idx));
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if !threshold.is_finite() {
                        return Err(format!("tree {} node {} has a non-finite threshold", tree_idx, i));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= len {
                            return Err(format!(
                                "tree {} node {} points at invalid child {}",
                                tree_idx, i, child
                            ));
                        }
                    }
                }
                TreeNode::Leaf(value) => {
                    if !value.is_finite() {
                        return Err(format!("tree {} node {} has a non-finite leaf", tree_idx, i));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Additive ensemble of regression trees with a logistic link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    /// Initial margin added before the trees
    #[serde(default)]
    pub base_score: f64,
    /// Declared input width; inferred from the splits when absent
    #[serde(default)]
    pub num_features: Option<usize>,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    /// Check the structural invariants evaluation relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("tree ensemble has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        if let (Some(width), Some(max)) = (self.num_features, self.max_feature()) {
            if max >= width {
                return Err(format!(
                    "split on feature {} but num_features is {}",
                    max, width
                ));
            }
        }
        Ok(())
    }

    fn max_feature(&self) -> Option<usize> {
        self.trees.iter().filter_map(DecisionTree::max_feature).max()
    }

    pub fn margin(&self, x: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.evaluate(x))
    }
}

impl Predictor for TreeEnsemble {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        if let Some(width) = self.num_features {
            check_width(width, features)?;
        }
        if let Some(max) = self.max_feature() {
            if max >= features.len() {
                anyhow::bail!(
                    "model splits on feature {}, got {} features",
                    max,
                    features.len()
                );
            }
        }
        Ok(sigmoid(self.margin(features.values())))
    }

    fn input_width(&self) -> Option<usize> {
        self.num_features
    }

    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }
}
