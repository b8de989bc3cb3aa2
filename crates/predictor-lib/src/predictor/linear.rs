//! Logistic regression

use super::{check_width, sigmoid, Predictor};
use crate::models::FeatureVector;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// `p = sigmoid(intercept + Σ coefficients[i] * x[i])`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    /// Raw decision value before the logistic link
    pub fn margin(&self, features: &FeatureVector) -> f64 {
        self.coefficients
            .iter()
            .zip(features.values())
            .fold(self.intercept, |acc, (w, x)| acc + w * x)
    }
}

impl Predictor for LogisticModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        check_width(self.coefficients.len(), features)?;
        Ok(sigmoid(self.margin(features)))
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn kind(&self) -> &'static str {
        "logistic"
    }
}
