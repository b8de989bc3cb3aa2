//! Error handling at the HTTP boundary

use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use predictor_lib::PredictError;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// No model loaded
    ModelNotLoaded,

    /// Malformed or incomplete input
    ValidationError(String),

    /// Model evaluation failed
    InferenceError(String),

    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ModelNotLoaded
            | AppError::InferenceError(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    pub fn message(&self) -> String {
        match self {
            AppError::ModelNotLoaded => "Model not loaded".to_string(),
            AppError::ValidationError(msg) => msg.clone(),
            AppError::InferenceError(msg) => format!("Inference failed: {}", msg),
            AppError::InternalError(_) => "Internal server error".to_string(),
        }
    }

    /// Label for the error counter
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ModelNotLoaded => "service_unavailable",
            AppError::ValidationError(_) => "validation",
            AppError::InferenceError(_) => "inference",
            AppError::InternalError(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::InferenceError(msg) => tracing::error!("Inference error: {}", msg),
            AppError::InternalError(msg) => tracing::error!("Internal error: {}", msg),
            AppError::ModelNotLoaded => tracing::warn!("Prediction requested without a model"),
            AppError::ValidationError(msg) => tracing::debug!("Rejected input: {}", msg),
        }

        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::ServiceUnavailable => AppError::ModelNotLoaded,
            PredictError::Validation(msg) => AppError::ValidationError(msg),
            PredictError::Inference(msg) => AppError::InferenceError(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::ModelNotLoaded.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::ValidationError("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PredictError::Inference("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::InternalError("encoder exploded".into());
        assert_eq!(err.message(), "Internal server error");
    }
}
