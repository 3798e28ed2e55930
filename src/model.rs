use crate::error::EngineError;
use crate::features::{FeatureVector, FEATURE_SET_VERSION};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialized classifier artifact produced by the offline training job.
///
/// The artifact declares the exact feature-name list it was trained
/// against. It is usable only when that list matches the live aggregator's
/// ordering exactly — no positional alignment, no name-based
/// reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Classifier kind; only "logistic_regression" is supported.
    pub kind: String,
    /// Feature set version the model was trained against.
    pub feature_set_version: u32,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl ModelArtifact {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&content)?;
        Ok(artifact)
    }

    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load-time precondition: the artifact must match the live feature set
    /// exactly (kind, version, names, ordering, weight count).
    pub fn check_compatibility(&self, expected_names: &[&str]) -> Result<(), EngineError> {
        if self.kind != "logistic_regression" {
            return Err(EngineError::ModelIncompatible(format!(
                "unsupported model kind '{}'",
                self.kind
            )));
        }
        if self.feature_set_version != FEATURE_SET_VERSION {
            return Err(EngineError::ModelIncompatible(format!(
                "artifact trained against feature set v{}, engine is v{}",
                self.feature_set_version, FEATURE_SET_VERSION
            )));
        }
        if self.feature_names.len() != expected_names.len()
            || self
                .feature_names
                .iter()
                .zip(expected_names.iter())
                .any(|(a, b)| a != b)
        {
            return Err(EngineError::ModelIncompatible(format!(
                "artifact feature list ({} names) does not match extractor ordering ({} names)",
                self.feature_names.len(),
                expected_names.len()
            )));
        }
        if self.weights.len() != self.feature_names.len() {
            return Err(EngineError::ModelIncompatible(format!(
                "{} weights for {} features",
                self.weights.len(),
                self.feature_names.len()
            )));
        }
        Ok(())
    }

    /// Calibrated threat probability for a feature vector. Assumes the
    /// compatibility check has passed.
    pub fn predict_probability(&self, vector: &FeatureVector) -> f64 {
        let dot: f64 = vector
            .iter()
            .zip(self.weights.iter())
            .map(|((_, _, value), weight)| value * weight)
            .sum();
        sigmoid(dot + self.bias)
    }

    /// Signed per-feature terms of the linear model, the model-backed
    /// analogue of the rule scorer's weighted terms.
    pub fn attributions(&self, vector: &FeatureVector) -> Vec<(String, f64)> {
        vector
            .iter()
            .zip(self.weights.iter())
            .map(|((name, _, value), weight)| (name.to_string(), value * weight))
            .collect()
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
