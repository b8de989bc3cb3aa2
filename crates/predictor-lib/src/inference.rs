//! Inference service: normalize, score, threshold
//!
//! The service owns the (possibly absent) loaded model, the feature schema
//! and the effective threshold. It is built once at startup and shared
//! read-only between request handlers.

use crate::artifact::LoadedModel;
use crate::error::PredictError;
use crate::models::{FeatureVector, PredictionResult};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Where the effective threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    Config,
    Bundle,
    SchemaDefault,
}

/// How to pick the decision threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    /// Explicit override; wins over everything else
    pub configured: Option<f64>,
    /// Use the artifact's tuned threshold when it has one
    pub adopt_bundle: bool,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            configured: None,
            adopt_bundle: true,
        }
    }
}

impl ThresholdPolicy {
    pub fn resolve(&self, schema: &FeatureSchema, bundled: Option<f64>) -> (f64, ThresholdSource) {
        if let Some(t) = self.configured {
            return (t, ThresholdSource::Config);
        }
        match bundled {
            Some(t) if self.adopt_bundle => (t, ThresholdSource::Bundle),
            _ => (schema.preset().default_threshold(), ThresholdSource::SchemaDefault),
        }
    }
}

/// Model summary served by `/api/model`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub loaded: bool,
    pub kind: Option<String>,
    pub source: Option<String>,
    pub checksum: Option<String>,
    pub loaded_at: Option<i64>,
    pub schema: String,
    pub features: Vec<String>,
    pub threshold: f64,
    pub threshold_source: ThresholdSource,
}

pub struct InferenceService {
    model: Option<LoadedModel>,
    schema: FeatureSchema,
    threshold: f64,
    threshold_source: ThresholdSource,
}

impl InferenceService {
    pub fn new(schema: FeatureSchema, model: Option<LoadedModel>, policy: ThresholdPolicy) -> Self {
        let bundled = model.as_ref().and_then(|m| m.bundled_threshold);
        let (threshold, threshold_source) = policy.resolve(&schema, bundled);
        Self {
            model,
            schema,
            threshold,
            threshold_source,
        }
    }

    /// Service without a model; every prediction fails with `ServiceUnavailable`
    pub fn unloaded(schema: FeatureSchema, policy: ThresholdPolicy) -> Self {
        Self::new(schema, None, policy)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn threshold_source(&self) -> ThresholdSource {
        self.threshold_source
    }

    /// Predict from a JSON request body
    pub fn predict_json(&self, body: &Value) -> Result<PredictionResult, PredictError> {
        let model = self.require_model()?;
        let features = self.schema.normalize_value(body)?;
        self.score(model, &features)
    }

    /// Predict from submitted form fields
    pub fn predict_form(&self, fields: &HashMap<String, String>) -> Result<PredictionResult, PredictError> {
        let model = self.require_model()?;
        let features = self.schema.normalize_form(fields)?;
        self.score(model, &features)
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            loaded: self.is_loaded(),
            kind: self.model.as_ref().map(|m| m.kind().to_string()),
            source: self.model.as_ref().map(|m| m.source.display().to_string()),
            checksum: self.model.as_ref().map(|m| m.checksum.clone()),
            loaded_at: self.model.as_ref().map(|m| m.loaded_at),
            schema: self.schema.preset().as_str().to_string(),
            features: self.schema.names().to_vec(),
            threshold: self.threshold,
            threshold_source: self.threshold_source,
        }
    }

    fn require_model(&self) -> Result<&LoadedModel, PredictError> {
        self.model.as_ref().ok_or(PredictError::ServiceUnavailable)
    }

    fn score(&self, model: &LoadedModel, features: &FeatureVector) -> Result<PredictionResult, PredictError> {
        let probability = model
            .predictor
            .predict_proba(features)
            .map_err(|e| PredictError::Inference(format!("{:#}", e)))?;

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PredictError::Inference(format!(
                "model returned {} which is not a probability",
                probability
            )));
        }

        let result = PredictionResult::classify(probability, self.threshold);
        debug!(
            probability,
            threshold = self.threshold,
            status = %result.status,
            "Prediction computed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MachineStatus;
    use crate::predictor::Predictor;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Predictor returning a fixed probability and counting calls
    struct StubPredictor {
        probability: f64,
        calls: AtomicUsize,
    }

    impl StubPredictor {
        fn new(probability: f64) -> Arc<Self> {
            Arc::new(Self {
                probability,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Predictor for StubPredictor {
        fn predict_proba(&self, _features: &FeatureVector) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }

        fn input_width(&self) -> Option<usize> {
            None
        }

        fn kind(&self) -> &'static str {
            "stub"
        }
    }

    fn sample_reading() -> Value {
        json!({
            "temperature": 642.35,
            "pressure": 554.45,
            "vibration": 522.86,
            "temperature_roll_mean": 642.16,
            "pressure_roll_mean": 554.20,
            "vibration_roll_mean": 522.30
        })
    }

    fn service_with(probability: f64, threshold: f64) -> InferenceService {
        let model = LoadedModel::from_predictor(StubPredictor::new(probability));
        InferenceService::new(
            FeatureSchema::rolling_mean(),
            Some(model),
            ThresholdPolicy {
                configured: Some(threshold),
                adopt_bundle: true,
            },
        )
    }

    #[test]
    fn test_low_probability_is_healthy() {
        let service = service_with(0.3, 0.5);
        let r = service.predict_json(&sample_reading()).unwrap();
        assert_eq!(r.prediction, 0);
        assert_eq!(r.status, MachineStatus::Healthy);
        assert_eq!(r.failure_probability, 0.3);
    }

    #[test]
    fn test_high_probability_is_risk_for_both_thresholds() {
        for threshold in [0.5, 0.6] {
            let r = service_with(0.75, threshold)
                .predict_json(&sample_reading())
                .unwrap();
            assert_eq!(r.prediction, 1);
            assert_eq!(r.status, MachineStatus::Risk);
        }
    }

    #[test]
    fn test_boundary_values() {
        for threshold in [0.5, 0.6] {
            let at = service_with(threshold, threshold)
                .predict_json(&sample_reading())
                .unwrap();
            assert_eq!(at.prediction, 1, "at threshold {}", threshold);

            let below = service_with(threshold - 1e-9, threshold)
                .predict_json(&sample_reading())
                .unwrap();
            assert_eq!(below.prediction, 0, "below threshold {}", threshold);
        }
    }

    #[test]
    fn test_unloaded_fails_before_validation() {
        let service = InferenceService::unloaded(FeatureSchema::rolling_mean(), ThresholdPolicy::default());
        // Garbage input still reports the missing model first
        let err = service.predict_json(&json!("not an object")).unwrap_err();
        assert!(matches!(err, PredictError::ServiceUnavailable));
        assert_eq!(err.to_string(), "Model not loaded");
    }

    #[test]
    fn test_validation_error_skips_model() {
        let stub = StubPredictor::new(0.9);
        let service = InferenceService::new(
            FeatureSchema::rolling_mean(),
            Some(LoadedModel::from_predictor(stub.clone())),
            ThresholdPolicy::default(),
        );
        let err = service.predict_json(&json!({"temperature": 1.0})).unwrap_err();
        assert!(matches!(err, PredictError::Validation(_)));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_probability_is_inference_error() {
        let service = service_with(1.5, 0.5);
        let err = service.predict_json(&sample_reading()).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn test_form_prediction() {
        let service = service_with(0.75, 0.6);
        let fields: HashMap<String, String> = sample_reading()
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        let r = service.predict_form(&fields).unwrap();
        assert_eq!(r.status, MachineStatus::Risk);
    }

    #[test]
    fn test_threshold_resolution_order() {
        let rolling = FeatureSchema::rolling_mean();
        let lag = FeatureSchema::lag();

        let default = ThresholdPolicy::default();
        assert_eq!(default.resolve(&rolling, None), (0.5, ThresholdSource::SchemaDefault));
        assert_eq!(default.resolve(&lag, None), (0.6, ThresholdSource::SchemaDefault));
        assert_eq!(default.resolve(&lag, Some(0.42)), (0.42, ThresholdSource::Bundle));

        let ignore_bundle = ThresholdPolicy {
            configured: None,
            adopt_bundle: false,
        };
        assert_eq!(ignore_bundle.resolve(&lag, Some(0.42)), (0.6, ThresholdSource::SchemaDefault));

        let configured = ThresholdPolicy {
            configured: Some(0.7),
            adopt_bundle: true,
        };
        assert_eq!(configured.resolve(&rolling, Some(0.42)), (0.7, ThresholdSource::Config));
    }

    #[test]
    fn test_bundled_threshold_adopted() {
        let model = LoadedModel::from_predictor(StubPredictor::new(0.45)).with_bundled_threshold(0.4);
        let service = InferenceService::new(FeatureSchema::rolling_mean(), Some(model), ThresholdPolicy::default());
        assert_eq!(service.threshold_source(), ThresholdSource::Bundle);
        let r = service.predict_json(&sample_reading()).unwrap();
        assert_eq!(r.status, MachineStatus::Risk);
    }

    #[test]
    fn test_model_info() {
        let unloaded = InferenceService::unloaded(FeatureSchema::lag(), ThresholdPolicy::default());
        let info = unloaded.model_info();
        assert!(!info.loaded);
        assert!(info.kind.is_none());
        assert_eq!(info.schema, "lag");
        assert_eq!(info.features.len(), 10);
        assert_eq!(info.threshold, 0.6);

        let loaded = service_with(0.1, 0.5).model_info();
        assert!(loaded.loaded);
        assert_eq!(loaded.kind.as_deref(), Some("stub"));
        assert_eq!(loaded.threshold_source, ThresholdSource::Config);
    }
}
