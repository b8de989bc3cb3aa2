//! ONNX inference using tract
//!
//! Loads a binary classifier exported to ONNX and runs it with tract-onnx.
//! The graph takes a single `[1, n]` f32 input; the positive-class
//! probability is read from the last output.

use super::{check_width, Predictor};
use crate::models::FeatureVector;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based predictor; the plan is immutable once built
pub struct OnnxPredictor {
    model: TractModel,
    num_features: usize,
}

impl OnnxPredictor {
    /// Load and optimize an ONNX model for a fixed input width
    pub fn load(path: &Path, num_features: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to parse ONNX model {}", path.display()))?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        debug!(path = %path.display(), num_features, "ONNX model loaded");

        Ok(Self {
            model,
            num_features,
        })
    }

    fn features_to_tensor(&self, features: &FeatureVector) -> Result<Tensor> {
        let data: Vec<f32> = features.values().iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .context("Failed to shape input tensor")?;
        Ok(array.into())
    }
}

impl Predictor for OnnxPredictor {
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        check_width(self.num_features, features)?;
        let start = Instant::now();

        let input = self.features_to_tensor(features)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.last().context("No output from model")?;

        let view = output.to_array_view::<f32>()?;
        let values: Vec<f32> = view.iter().copied().collect();
        // [1, 2] carries both class probabilities, [1, 1] only the positive one
        let probability = match values.as_slice() {
            [p] => *p,
            [_, p, ..] => *p,
            [] => anyhow::bail!("Model produced an empty output"),
        };

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(probability as f64)
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.num_features)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
