//! Error types for model loading and inference

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a model artifact could not be turned into a predictor.
///
/// None of these are fatal for the service: the caller logs the error and
/// keeps running without a model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model artifact not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("malformed model artifact: {0}")]
    Format(String),

    #[error("model expects {expected} features but the schema has {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("artifact features {artifact:?} do not match the configured schema {schema:?}")]
    SchemaMismatch {
        artifact: Vec<String>,
        schema: Vec<String>,
    },

    #[error("threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    #[error("failed to load ONNX model: {0}")]
    Onnx(String),
}

/// Errors raised while serving a single prediction
#[derive(Debug, Error)]
pub enum PredictError {
    /// No model is loaded; checked before the input is looked at
    #[error("Model not loaded")]
    ServiceUnavailable,

    /// The request did not carry a usable feature mapping
    #[error("{0}")]
    Validation(String),

    /// The model failed to evaluate or returned a value that is not a probability
    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::ServiceUnavailable => "service_unavailable",
            PredictError::Validation(_) => "validation",
            PredictError::Inference(_) => "inference",
        }
    }
}
