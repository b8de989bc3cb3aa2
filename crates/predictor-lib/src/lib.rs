//! Core library for the machine failure predictor
//!
//! This crate provides:
//! - Feature schemas and input normalization
//! - Probability models (logistic, boosted trees, ONNX)
//! - Model artifact loading
//! - The inference service that turns readings into risk labels
//! - Health reporting and observability

pub mod artifact;
pub mod error;
pub mod health;
pub mod inference;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;

pub use artifact::{Artifact, ArtifactLoader, LoadedModel, ModelBundle, ModelSpec};
pub use error::{LoadError, PredictError};
pub use health::{HealthResponse, ReadinessResponse};
pub use inference::{InferenceService, ModelInfo, ThresholdPolicy, ThresholdSource};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use predictor::Predictor;
pub use schema::{FeatureSchema, SchemaPreset};
