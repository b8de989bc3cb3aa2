//! Core data models for the failure predictor

use serde::{Deserialize, Serialize};

/// Feature values ordered by the schema that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Human status label attached to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Healthy,
    Risk,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Healthy => "healthy",
            MachineStatus::Risk => "risk",
        }
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single prediction, as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 when the failure probability reaches the threshold, else 0
    pub prediction: u8,
    /// Class-1 probability rounded to 4 decimal places
    pub failure_probability: f64,
    pub status: MachineStatus,
}

impl PredictionResult {
    /// Classify a raw probability against a threshold.
    ///
    /// Probabilities exactly at the threshold count as risk.
    pub fn classify(probability: f64, threshold: f64) -> Self {
        let at_risk = probability >= threshold;
        Self {
            prediction: u8::from(at_risk),
            failure_probability: round4(probability),
            status: if at_risk {
                MachineStatus::Risk
            } else {
                MachineStatus::Healthy
            },
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_below_threshold() {
        let r = PredictionResult::classify(0.3, 0.5);
        assert_eq!(r.prediction, 0);
        assert_eq!(r.status, MachineStatus::Healthy);
    }

    #[test]
    fn test_classify_boundary_is_risk() {
        for threshold in [0.5, 0.6] {
            let r = PredictionResult::classify(threshold, threshold);
            assert_eq!(r.prediction, 1, "threshold {}", threshold);
            assert_eq!(r.status, MachineStatus::Risk);
        }
    }

    #[test]
    fn test_classify_just_below_boundary() {
        let r = PredictionResult::classify(0.59999, 0.6);
        assert_eq!(r.prediction, 0);
        // Rounding the reported probability must not change the label
        assert_eq!(r.failure_probability, 0.6);
        assert_eq!(r.status, MachineStatus::Healthy);
    }

    #[test]
    fn test_probability_rounded_to_four_places() {
        let r = PredictionResult::classify(0.123456, 0.5);
        assert_eq!(r.failure_probability, 0.1235);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let r = PredictionResult::classify(0.75, 0.6);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "risk");
        assert_eq!(json["prediction"], 1);
    }
}
