//! Probability models behind the inference endpoint

mod linear;
mod onnx;
mod tree;

pub use linear::LogisticModel;
pub use onnx::OnnxPredictor;
pub use tree::{DecisionTree, TreeEnsemble, TreeNode};

use crate::models::FeatureVector;
use anyhow::Result;

/// Trait for binary classifiers that estimate the positive-class probability
pub trait Predictor: Send + Sync {
    /// Probability of class 1 (failure) for a schema-ordered feature vector
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64>;

    /// Number of features the model was trained on, when it is known
    fn input_width(&self) -> Option<usize>;

    /// Short model family name used in logs, metrics and `/api/model`
    fn kind(&self) -> &'static str;
}

/// Logistic function mapping a margin onto (0, 1)
pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn check_width(expected: usize, features: &FeatureVector) -> Result<()> {
    if features.len() != expected {
        anyhow::bail!(
            "model expects {} features, got {}",
            expected,
            features.len()
        );
    }
    Ok(())
}
