//! Health and readiness reporting
//!
//! `/health` is a liveness probe: it always answers, and reports whether a
//! model is loaded. `/readyz` is the readiness probe and fails while the
//! service runs without a model.

use crate::inference::InferenceService;
use serde::{Deserialize, Serialize};

/// Status string reported while the process is serving requests
pub const STATUS_ACTIVE: &str = "active";

/// Liveness response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

impl HealthResponse {
    pub fn from_service(service: &InferenceService) -> Self {
        Self {
            status: STATUS_ACTIVE.to_string(),
            model_loaded: service.is_loaded(),
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    pub fn from_service(service: &InferenceService) -> Self {
        if service.is_loaded() {
            Self {
                ready: true,
                reason: None,
            }
        } else {
            Self {
                ready: false,
                reason: Some("Model not loaded".to_string()),
            }
        }
    }
}
