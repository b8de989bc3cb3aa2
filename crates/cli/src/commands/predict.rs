//! Prediction command
//!
//! Builds a sensor reading from a sample preset, a JSON file and `--set`
//! overrides, then sends it to `/predict`.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde_json::{json, Map, Value};
use std::path::Path;

use crate::client::{ApiClient, ClientError};
use crate::output::{color_probability, color_status, print_error, print_json, print_success, OutputFormat};

/// Built-in example readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Sample {
    /// Current readings plus rolling means
    Rolling,
    /// Current readings plus 1h/2h lags and tool wear
    Lag,
}

impl Sample {
    pub fn reading(&self) -> Map<String, Value> {
        let value = match self {
            Sample::Rolling => json!({
                "temperature": 642.35,
                "pressure": 554.45,
                "vibration": 522.86,
                "temperature_roll_mean": 642.16,
                "pressure_roll_mean": 554.20,
                "vibration_roll_mean": 522.30
            }),
            // A machine that looks healthy: low vibration, stable pressure
            Sample::Lag => json!({
                "vibration": 1450,
                "pressure": 55.2,
                "temperature": 310.5,
                "tool_wear": 120,
                "vibration_lag_1h": 1440,
                "vibration_lag_2h": 1430,
                "pressure_lag_1h": 54.0,
                "pressure_lag_2h": 53.5,
                "temperature_lag_1h": 310.0,
                "temperature_lag_2h": 309.8
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Assemble the request body.
///
/// Layers, later ones winning: sample preset, JSON file, `key=value`
/// overrides. With no sample and no file the rolling sample is used.
pub fn build_reading(sample: Option<Sample>, file: Option<&Path>, sets: &[String]) -> Result<Map<String, Value>> {
    let mut reading = match (sample, file) {
        (Some(sample), _) => sample.reading(),
        (None, Some(_)) => Map::new(),
        (None, None) => Sample::Rolling.reading(),
    };

    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        match parsed {
            Value::Object(map) => reading.extend(map),
            _ => bail!("{} must contain a JSON object", path.display()),
        }
    }

    for set in sets {
        let (key, raw) = set
            .split_once('=')
            .with_context(|| format!("Invalid --set '{}', expected key=value", set))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid --set '{}', key is empty", set);
        }
        let value = match raw.trim().parse::<f64>() {
            Ok(n) => json!(n),
            Err(_) => Value::String(raw.to_string()),
        };
        reading.insert(key.to_string(), value);
    }

    Ok(reading)
}

/// Send a reading and print the outcome
pub async fn run_prediction(client: &ApiClient, reading: &Map<String, Value>, format: OutputFormat) -> Result<()> {
    let result = match client.predict(reading).await {
        Ok(result) => result,
        Err(e @ ClientError::Api { .. }) => {
            if format == OutputFormat::Table {
                print_error("Prediction failed");
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success("Prediction Success");
            println!("{}", "-".repeat(40));
            println!("Status:              {}", color_status(&result.status));
            println!(
                "Failure Probability: {}",
                color_probability(result.failure_probability, &result.status)
            );
            println!("Raw Prediction:      {}", result.prediction.to_string().bold());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_rolling_sample() {
        let reading = build_reading(None, None, &[]).unwrap();
        assert_eq!(reading.len(), 6);
        assert_eq!(reading["temperature"], json!(642.35));
    }

    #[test]
    fn test_lag_sample() {
        let reading = build_reading(Some(Sample::Lag), None, &[]).unwrap();
        assert_eq!(reading.len(), 10);
        assert!(reading.contains_key("tool_wear"));
    }

    #[test]
    fn test_overrides() {
        let sets = vec!["vibration=1600".to_string(), "machine=press-4".to_string()];
        let reading = build_reading(Some(Sample::Lag), None, &sets).unwrap();
        assert_eq!(reading["vibration"], json!(1600.0));
        assert_eq!(reading["machine"], json!("press-4"));
    }

    #[test]
    fn test_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reading.json");
        std::fs::write(&path, r#"{"temperature": 700.0, "pressure": 500}"#).unwrap();

        // File alone starts from an empty reading
        let reading = build_reading(None, Some(&path), &[]).unwrap();
        assert_eq!(reading.len(), 2);

        // File on top of a sample overrides matching keys
        let reading = build_reading(Some(Sample::Rolling), Some(&path), &[]).unwrap();
        assert_eq!(reading.len(), 6);
        assert_eq!(reading["temperature"], json!(700.0));
    }

    #[test]
    fn test_bad_inputs() {
        assert!(build_reading(None, None, &["novalue".to_string()]).is_err());
        assert!(build_reading(None, None, &["=1".to_string()]).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reading.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(build_reading(None, Some(&path), &[]).is_err());
    }
}
