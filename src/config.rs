use serde::{Deserialize, Serialize};

/// Engine configuration. Scoring weights and thresholds live here rather
/// than as hidden constants so they can be tuned and tested independently
/// of code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Optional path to a serialized classifier artifact. When absent or
    /// incompatible, the deterministic rule-based scorer is used.
    pub model_path: Option<String>,
    /// Messages fetched per scan.
    pub fetch_limit: usize,
    /// Seconds before an external fetch is treated as a provider error.
    pub fetch_timeout_seconds: u64,
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Family weights for the rule-based score:
    /// clamp01(content*content_risk + url*url_risk + metadata*metadata_risk).
    pub content_weight: f64,
    pub url_weight: f64,
    pub metadata_weight: f64,
    /// Minimum absolute contribution for a feature to appear as a risk
    /// factor.
    pub materiality_threshold: f64,
    /// Contribution list is truncated to this many entries.
    pub max_contributions: usize,
    /// Score floor applied when a blacklisted sender forces a threat
    /// verdict.
    pub blacklist_score_floor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            model_path: None,
            fetch_limit: 100,
            fetch_timeout_seconds: 30,
            scoring: ScoringConfig::default(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            content_weight: 0.45,
            url_weight: 0.35,
            metadata_weight: 0.20,
            materiality_threshold: 0.04,
            max_contributions: 12,
            blacklist_score_floor: 0.9,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fetch_limit, 100);
        let total = config.scoring.content_weight
            + config.scoring.url_weight
            + config.scoring.metadata_weight;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: EngineConfig = serde_yaml::from_str("fetch_limit: 25\n").unwrap();
        assert_eq!(config.fetch_limit, 25);
        assert_eq!(config.scoring.max_contributions, 12);
    }

    #[test]
    fn test_roundtrip() {
        let config = EngineConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.scoring.content_weight, config.scoring.content_weight);
    }
}
