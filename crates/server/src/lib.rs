//! HTTP front end for the machine failure predictor

pub mod api;
pub mod config;
pub mod error;
pub mod html;

pub use api::{create_router, serve, AppState};
pub use config::{LogFormat, ServerArgs, ServerConfig};
pub use error::{AppError, AppResult};

use anyhow::Result;
use predictor_lib::{ArtifactLoader, InferenceService, StructuredLogger};

/// Load the configured artifact and build the inference service.
///
/// A failed load is logged and yields a service without a model; only an
/// invalid schema configuration is an error here.
pub async fn load_service(config: &ServerConfig, logger: &StructuredLogger) -> Result<InferenceService> {
    let schema = config.feature_schema()?;

    let mut loader = ArtifactLoader::new(schema.clone());
    if let Some(sha) = &config.model_sha256 {
        loader = loader.with_checksum(sha.clone());
    }

    let model = match loader.load_async(config.model_path.clone()).await {
        Ok(model) => Some(model),
        Err(err) => {
            logger.log_model_load_failed(&config.model_path.display().to_string(), &err);
            None
        }
    };

    let service = InferenceService::new(schema, model, config.threshold_policy());
    if let Some(model) = service.model() {
        logger.log_model_loaded(model, service.threshold(), service.schema().preset().as_str());
    }
    Ok(service)
}
