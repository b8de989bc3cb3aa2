//! HTTP API: predictions, HTML form, health checks and Prometheus metrics

use crate::error::{AppError, AppResult};
use crate::html::{render_page, FormOutcome};
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        MatchedPath, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use predictor_lib::{
    HealthResponse, InferenceService, ModelInfo, PredictError, PredictionResult, PredictorMetrics,
    ReadinessResponse, StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InferenceService>,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(service: InferenceService, metrics: PredictorMetrics, logger: StructuredLogger) -> Self {
        Self {
            service: Arc::new(service),
            metrics,
            logger,
        }
    }

    /// Run a prediction and record its latency, outcome and errors
    fn observe<F>(&self, route: &str, run: F) -> Result<PredictionResult, PredictError>
    where
        F: FnOnce(&InferenceService) -> Result<PredictionResult, PredictError>,
    {
        let start = Instant::now();
        let outcome = run(&self.service);
        let elapsed = start.elapsed();

        match &outcome {
            Ok(result) => {
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions(result.status.as_str());
                self.logger.log_prediction(route, result, elapsed.as_micros());
            }
            Err(err) => self.metrics.inc_errors(err.kind()),
        }
        outcome
    }
}

/// Liveness check - always 200, reports whether a model is loaded
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::from_service(&state.service))
}

/// Readiness check - returns 200 with a model, 503 without
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = ReadinessResponse::from_service(&state.service);

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> AppResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// JSON prediction, served on `/predict` and `/api/predict`
///
/// The model check comes before the body is looked at, so an unloaded
/// service answers 500 even for malformed input.
async fn predict(
    State(state): State<Arc<AppState>>,
    path: MatchedPath,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<PredictionResult>> {
    if !state.service.is_loaded() {
        state.metrics.inc_errors(PredictError::ServiceUnavailable.kind());
        return Err(AppError::ModelNotLoaded);
    }

    let Json(body) = payload.map_err(|rejection| {
        state.metrics.inc_errors("validation");
        AppError::from(rejection)
    })?;

    let result = state.observe(path.as_str(), |service| service.predict_json(&body))?;
    Ok(Json(result))
}

async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    Json(state.service.model_info())
}

/// Empty form
async fn form_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(
        state.service.schema(),
        state.service.threshold(),
        &HashMap::new(),
        None,
    ))
}

/// Form submission; the outcome is rendered into the page
async fn form_submit(
    State(state): State<Arc<AppState>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> impl IntoResponse {
    let (values, outcome) = match form {
        Ok(Form(values)) => {
            let outcome = state.observe("/", |service| service.predict_form(&values));
            (values, outcome.map_err(AppError::from))
        }
        Err(rejection) => {
            // Same ordering as the JSON route: a missing model wins
            let err = if state.service.is_loaded() {
                AppError::from(rejection)
            } else {
                AppError::ModelNotLoaded
            };
            state.metrics.inc_errors(err.kind());
            (HashMap::new(), Err(err))
        }
    };

    let (status, outcome) = match outcome {
        Ok(result) => (StatusCode::OK, FormOutcome::Prediction(result)),
        Err(err) => (err.status(), FormOutcome::Error(err.message())),
    };

    let page = render_page(
        state.service.schema(),
        state.service.threshold(),
        &values,
        Some(&outcome),
    );
    (status, Html(page))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(form_page).post(form_submit))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .route("/api/predict", post(predict))
        .route("/api/model", get(model_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Starting API server");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
