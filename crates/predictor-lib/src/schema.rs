//! Feature schema and input normalization
//!
//! A schema is the ordered list of numeric fields the model was trained on.
//! Incoming readings are arbitrary key/value mappings; the normalizer keeps
//! only the schema's keys, coerces them to `f64` and lays them out in
//! schema order.

use crate::error::PredictError;
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Fields of the rolling-mean schema
pub const ROLLING_MEAN_FEATURES: &[&str] = &[
    "temperature",
    "pressure",
    "vibration",
    "temperature_roll_mean",
    "pressure_roll_mean",
    "vibration_roll_mean",
];

/// Fields of the lag schema
pub const LAG_FEATURES: &[&str] = &[
    "vibration",
    "pressure",
    "temperature",
    "tool_wear",
    "vibration_lag_1h",
    "vibration_lag_2h",
    "pressure_lag_1h",
    "pressure_lag_2h",
    "temperature_lag_1h",
    "temperature_lag_2h",
];

/// Default decision threshold for the rolling-mean schema
pub const ROLLING_MEAN_THRESHOLD: f64 = 0.50;

/// Default decision threshold for the lag schema
pub const LAG_THRESHOLD: f64 = 0.60;

/// Named schema choices exposed through configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPreset {
    #[default]
    RollingMean,
    Lag,
    Custom,
}

impl SchemaPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaPreset::RollingMean => "rolling_mean",
            SchemaPreset::Lag => "lag",
            SchemaPreset::Custom => "custom",
        }
    }

    /// Threshold used when neither configuration nor the artifact provides one
    pub fn default_threshold(&self) -> f64 {
        match self {
            SchemaPreset::Lag => LAG_THRESHOLD,
            SchemaPreset::RollingMean | SchemaPreset::Custom => ROLLING_MEAN_THRESHOLD,
        }
    }
}

impl std::str::FromStr for SchemaPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rolling_mean" | "rolling" => Ok(SchemaPreset::RollingMean),
            "lag" => Ok(SchemaPreset::Lag),
            "custom" => Ok(SchemaPreset::Custom),
            other => Err(format!("unknown schema preset: {}", other)),
        }
    }
}

/// Ordered set of required numeric fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    preset: SchemaPreset,
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn rolling_mean() -> Self {
        Self::from_static(SchemaPreset::RollingMean, ROLLING_MEAN_FEATURES)
    }

    pub fn lag() -> Self {
        Self::from_static(SchemaPreset::Lag, LAG_FEATURES)
    }

    /// Build a custom schema; names must be non-empty and unique
    pub fn custom<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err("custom schema needs at least one feature".to_string());
        }
        let mut seen = HashSet::new();
        for name in &names {
            if name.trim().is_empty() {
                return Err("feature names must not be blank".to_string());
            }
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate feature name: {}", name));
            }
        }
        Ok(Self {
            preset: SchemaPreset::Custom,
            names,
        })
    }

    /// Resolve a preset, taking `features` for the custom case
    pub fn from_preset(preset: SchemaPreset, features: &[String]) -> Result<Self, String> {
        match preset {
            SchemaPreset::RollingMean => Ok(Self::rolling_mean()),
            SchemaPreset::Lag => Ok(Self::lag()),
            SchemaPreset::Custom => Self::custom(features.iter().cloned()),
        }
    }

    fn from_static(preset: SchemaPreset, names: &[&str]) -> Self {
        Self {
            preset,
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn preset(&self) -> SchemaPreset {
        self.preset
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Normalize a JSON object into a feature vector.
    ///
    /// Keys outside the schema are dropped. Missing or non-numeric schema
    /// fields produce a validation error.
    pub fn normalize(&self, input: &Map<String, Value>) -> Result<FeatureVector, PredictError> {
        self.normalize_with(|name| input.get(name).map(coerce_json))
    }

    /// Normalize an arbitrary JSON value; anything but an object is rejected
    pub fn normalize_value(&self, input: &Value) -> Result<FeatureVector, PredictError> {
        match input {
            Value::Object(map) => self.normalize(map),
            other => Err(PredictError::Validation(format!(
                "expected a JSON object of feature values, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// Normalize string form fields (as submitted by the HTML form)
    pub fn normalize_form(&self, input: &HashMap<String, String>) -> Result<FeatureVector, PredictError> {
        self.normalize_with(|name| input.get(name).map(|raw| coerce_str(raw)))
    }

    fn normalize_with<F>(&self, lookup: F) -> Result<FeatureVector, PredictError>
    where
        F: Fn(&str) -> Option<Result<f64, String>>,
    {
        let mut values = Vec::with_capacity(self.names.len());
        let mut missing = Vec::new();

        for name in &self.names {
            match lookup(name) {
                Some(Ok(value)) => values.push(value),
                Some(Err(reason)) => {
                    return Err(PredictError::Validation(format!(
                        "feature '{}' {}",
                        name, reason
                    )));
                }
                None => missing.push(name.as_str()),
            }
        }

        if !missing.is_empty() {
            return Err(PredictError::Validation(format!(
                "missing required features: {}",
                missing.join(", ")
            )));
        }

        Ok(FeatureVector::new(values))
    }
}

fn coerce_json(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("is not a finite number: {}", n)),
        Value::String(s) => coerce_str(s),
        other => Err(format!("must be numeric, got {}", json_type_name(other))),
    }
}

fn coerce_str(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(format!("is not a finite number: {:?}", raw)),
        Err(_) => Err(format!("must be numeric, got {:?}", raw)),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
