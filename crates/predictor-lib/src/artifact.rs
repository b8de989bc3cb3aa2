//! Model artifact loading
//!
//! An artifact is read once at startup. Two layouts are accepted and told
//! apart by an explicit tag rather than by probing the content:
//!
//! ```text
//! {"bundle": {"model": {"type": "logistic", ...}, "threshold": 0.6}}
//! {"model": {"type": "tree_ensemble", ...}}
//! ```
//!
//! A file with the `.onnx` extension is a bare ONNX model.

use crate::error::LoadError;
use crate::predictor::{LogisticModel, OnnxPredictor, Predictor, TreeEnsemble};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Serialized model definition, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    Logistic(LogisticModel),
    TreeEnsemble(TreeEnsemble),
    /// ONNX graph stored next to the artifact
    Onnx { path: PathBuf },
}

/// Bundle layout: a model plus optional tuning metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: ModelSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Feature names the model was trained on, in column order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

/// Top-level artifact document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Bundle(ModelBundle),
    Model(ModelSpec),
}

impl Artifact {
    /// Parse an artifact document from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self, LoadError> {
        serde_json::from_slice(bytes).map_err(|e| LoadError::Format(e.to_string()))
    }

    /// Split into the model and the bundle's metadata
    fn into_parts(self) -> (ModelSpec, Option<f64>, Option<Vec<String>>) {
        match self {
            Artifact::Bundle(bundle) => (bundle.model, bundle.threshold, bundle.features),
            Artifact::Model(spec) => (spec, None, None),
        }
    }
}

/// A predictor ready to serve, together with where it came from
#[derive(Clone)]
pub struct LoadedModel {
    pub predictor: Arc<dyn Predictor>,
    /// Threshold tuned at training time, if the artifact was a bundle carrying one
    pub bundled_threshold: Option<f64>,
    pub source: PathBuf,
    /// Hex SHA-256 of the artifact file
    pub checksum: String,
    pub loaded_at: i64,
}

impl LoadedModel {
    /// Wrap an in-memory predictor (used by tests and embedders)
    pub fn from_predictor(predictor: Arc<dyn Predictor>) -> Self {
        Self {
            predictor,
            bundled_threshold: None,
            source: PathBuf::from("<memory>"),
            checksum: String::new(),
            loaded_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_bundled_threshold(mut self, threshold: f64) -> Self {
        self.bundled_threshold = Some(threshold);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.predictor.kind()
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("kind", &self.predictor.kind())
            .field("bundled_threshold", &self.bundled_threshold)
            .field("source", &self.source)
            .field("checksum", &self.checksum)
            .finish()
    }
}

/// Reads model artifacts from disk
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    schema: FeatureSchema,
    expected_sha256: Option<String>,
}

impl ArtifactLoader {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            expected_sha256: None,
        }
    }

    /// Require the artifact bytes to hash to this hex SHA-256 digest
    pub fn with_checksum(mut self, sha256: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256.into().to_lowercase());
        self
    }

    /// Load and validate the artifact at `path`
    pub fn load(&self, path: &Path) -> Result<LoadedModel, LoadError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let checksum = compute_checksum(&bytes);
        if let Some(expected) = &self.expected_sha256 {
            if *expected != checksum {
                return Err(LoadError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: checksum,
                });
            }
            debug!(checksum = %checksum, "Artifact checksum validated");
        }

        // References inside a JSON artifact resolve against its directory;
        // a bare ONNX file is opened exactly as given.
        let (artifact, base_dir) = if is_onnx_path(path) {
            let spec = ModelSpec::Onnx {
                path: path.to_path_buf(),
            };
            (Artifact::Model(spec), Path::new(""))
        } else {
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            (Artifact::from_json(&bytes)?, base_dir)
        };

        let (spec, threshold, features) = artifact.into_parts();

        if let Some(t) = threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(LoadError::InvalidThreshold(t));
            }
        }
        if let Some(features) = features {
            if features.as_slice() != self.schema.names() {
                return Err(LoadError::SchemaMismatch {
                    artifact: features,
                    schema: self.schema.names().to_vec(),
                });
            }
        }

        let predictor = self.build(spec, base_dir)?;
        if let Some(width) = predictor.input_width() {
            if width != self.schema.len() {
                return Err(LoadError::WidthMismatch {
                    expected: width,
                    actual: self.schema.len(),
                });
            }
        }

        info!(
            path = %path.display(),
            kind = predictor.kind(),
            bundled_threshold = ?threshold,
            "Model artifact loaded"
        );

        Ok(LoadedModel {
            predictor,
            bundled_threshold: threshold,
            source: path.to_path_buf(),
            checksum,
            loaded_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Load on the blocking pool so startup does not stall the runtime
    pub async fn load_async(&self, path: PathBuf) -> Result<LoadedModel, LoadError> {
        let loader = self.clone();
        match tokio::task::spawn_blocking(move || loader.load(&path)).await {
            Ok(result) => result,
            Err(e) => Err(LoadError::Format(format!("loader task failed: {}", e))),
        }
    }

    fn build(&self, spec: ModelSpec, base_dir: &Path) -> Result<Arc<dyn Predictor>, LoadError> {
        match spec {
            ModelSpec::Logistic(model) => {
                if model.coefficients.iter().any(|c| !c.is_finite()) || !model.intercept.is_finite() {
                    return Err(LoadError::Format(
                        "logistic model has non-finite parameters".to_string(),
                    ));
                }
                Ok(Arc::new(model))
            }
            ModelSpec::TreeEnsemble(ensemble) => {
                ensemble.validate().map_err(LoadError::Format)?;
                Ok(Arc::new(ensemble))
            }
            ModelSpec::Onnx { path } => {
                let resolved = resolve_reference(base_dir, &path);
                let predictor = OnnxPredictor::load(&resolved, self.schema.len())
                    .map_err(|e| LoadError::Onnx(format!("{:#}", e)))?;
                Ok(Arc::new(predictor))
            }
        }
    }
}

fn resolve_reference(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn is_onnx_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("onnx"))
        .unwrap_or(false)
}

/// Compute SHA256 checksum
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
