//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional config file,
//! then `PREDICTOR_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use predictor_lib::{FeatureSchema, SchemaPreset, ThresholdPolicy};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the model artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Expected hex SHA-256 of the artifact
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Feature schema preset
    #[serde(default)]
    pub schema: SchemaPreset,

    /// Feature names for the custom schema; a list or a comma-separated string
    #[serde(default, deserialize_with = "feature_list")]
    pub features: Vec<String>,

    /// Decision threshold override
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Use the threshold stored in a bundled artifact
    #[serde(default = "default_adopt_bundle_threshold")]
    pub adopt_bundle_threshold: bool,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("best_model.json")
}

fn default_adopt_bundle_threshold() -> bool {
    true
}

fn feature_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Features {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Features::deserialize(deserializer)? {
        Features::List(names) => names,
        Features::Joined(joined) => joined
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
    })
}

/// `PREDICTOR_*` variables, kept as strings until deserialization so that
/// values such as a digits-only checksum are not reinterpreted as numbers
fn environment() -> config::Environment {
    config::Environment::with_prefix("PREDICTOR")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_path: default_model_path(),
            model_sha256: None,
            schema: SchemaPreset::default(),
            features: Vec::new(),
            threshold: None,
            adopt_bundle_threshold: default_adopt_bundle_threshold(),
            log_format: LogFormat::default(),
        }
    }
}

/// Command-line flags; anything set here wins over file and environment
#[derive(Debug, Default, Parser)]
#[command(name = "predictor-server")]
#[command(author, version, about = "Machine failure prediction service", long_about = None)]
pub struct ServerArgs {
    /// Config file (TOML, JSON or YAML, chosen by extension)
    #[arg(long, short, env = "PREDICTOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Path to the model artifact
    #[arg(long, short)]
    pub model: Option<PathBuf>,

    /// Expected hex SHA-256 of the model artifact
    #[arg(long)]
    pub model_sha256: Option<String>,

    /// Feature schema preset (rolling_mean, lag, custom)
    #[arg(long)]
    pub schema: Option<SchemaPreset>,

    /// Comma-separated feature names for the custom schema
    #[arg(long, value_delimiter = ',')]
    pub features: Option<Vec<String>>,

    /// Decision threshold in [0, 1]
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Ignore the threshold stored in a bundled artifact
    #[arg(long)]
    pub ignore_bundle_threshold: bool,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl ServerConfig {
    /// Load configuration from file, environment and flags
    pub fn load(args: &ServerArgs) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }
        let settings = builder
            .add_source(environment())
            .build()
            .context("Failed to read configuration")?;

        let mut config: ServerConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Overlay command-line flags
    pub fn apply_args(&mut self, args: &ServerArgs) {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(model) = &args.model {
            self.model_path = model.clone();
        }
        if let Some(sha) = &args.model_sha256 {
            self.model_sha256 = Some(sha.clone());
        }
        if let Some(schema) = args.schema {
            self.schema = schema;
        }
        if let Some(features) = &args.features {
            self.features = features.clone();
        }
        if let Some(threshold) = args.threshold {
            self.threshold = Some(threshold);
        }
        if args.ignore_bundle_threshold {
            self.adopt_bundle_threshold = false;
        }
        if let Some(format) = args.log_format {
            self.log_format = format;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                anyhow::bail!("threshold must be within [0, 1], got {}", t);
            }
        }
        if let Some(sha) = &self.model_sha256 {
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                anyhow::bail!("model_sha256 must be 64 hex characters");
            }
        }
        self.feature_schema()?;
        Ok(())
    }

    pub fn feature_schema(&self) -> Result<FeatureSchema> {
        FeatureSchema::from_preset(self.schema, &self.features).map_err(anyhow::Error::msg)
    }

    pub fn threshold_policy(&self) -> ThresholdPolicy {
        ThresholdPolicy {
            configured: self.threshold,
            adopt_bundle: self.adopt_bundle_threshold,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
