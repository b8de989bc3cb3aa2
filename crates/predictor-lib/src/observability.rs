//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, predictions by status, errors, model info)
//! - Structured JSON logging with tracing

use crate::artifact::LoadedModel;
use crate::error::LoadError;
use crate::models::PredictionResult;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    request_errors_total: IntCounterVec,
    model_loaded: IntGauge,
    model_info: GaugeVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "failure_predictor_prediction_latency_seconds",
                "Time spent normalizing input and running the model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "failure_predictor_predictions_total",
                "Predictions served, by status label",
                &["status"]
            )
            .expect("Failed to register predictions_total"),

            request_errors_total: register_int_counter_vec!(
                "failure_predictor_request_errors_total",
                "Prediction requests that failed, by error kind",
                &["kind"]
            )
            .expect("Failed to register request_errors_total"),

            model_loaded: register_int_gauge!(
                "failure_predictor_model_loaded",
                "1 when a model artifact is loaded, 0 when running degraded"
            )
            .expect("Failed to register model_loaded"),

            model_info: register_gauge_vec!(
                "failure_predictor_model_info",
                "Information about the currently loaded model",
                &["kind", "schema"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide prediction metrics
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, status: &str) {
        self.inner().predictions_total.with_label_values(&[status]).inc();
    }

    pub fn inc_errors(&self, kind: &str) {
        self.inner().request_errors_total.with_label_values(&[kind]).inc();
    }

    /// Record the model state at startup
    pub fn set_model(&self, kind: Option<&str>, schema: &str) {
        let inner = self.inner();
        inner.model_info.reset();
        match kind {
            Some(kind) => {
                inner.model_loaded.set(1);
                inner.model_info.with_label_values(&[kind, schema]).set(1.0);
            }
            None => inner.model_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Emits event-tagged records so the JSON log stream can be filtered by
/// `event`.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            addr = %addr,
            "Prediction service started"
        );
    }

    pub fn log_model_loaded(&self, model: &LoadedModel, threshold: f64, schema: &str) {
        info!(
            event = "model_loaded",
            service = %self.service_name,
            kind = model.kind(),
            source = %model.source.display(),
            checksum = %model.checksum,
            threshold = threshold,
            schema = %schema,
            "Model loaded successfully"
        );
    }

    /// Load failures are not fatal; the service keeps running without a model
    pub fn log_model_load_failed(&self, path: &str, err: &LoadError) {
        error!(
            event = "model_load_failed",
            service = %self.service_name,
            path = %path,
            error = %err,
            "Error loading model, serving without predictions"
        );
    }

    pub fn log_prediction(&self, route: &str, result: &PredictionResult, elapsed_us: u128) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            route = %route,
            prediction = result.prediction,
            failure_probability = result.failure_probability,
            status = %result.status,
            elapsed_us = elapsed_us as u64,
            "Prediction served"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let a = PredictorMetrics::new();
        let b = a.clone();
        a.observe_prediction_latency(0.0002);
        a.inc_predictions("healthy");
        b.inc_predictions("risk");
        b.inc_errors("validation");
        a.set_model(Some("logistic"), "rolling_mean");

        let families = prometheus::gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"failure_predictor_predictions_total"));
        assert!(names.contains(&"failure_predictor_model_loaded"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("predictor-server");
        assert_eq!(logger.service_name, "predictor-server");
    }
}
