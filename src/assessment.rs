use serde::{Deserialize, Serialize};

/// Threat category assigned to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatType {
    Legitimate,
    Suspicious,
    Phishing,
    Spam,
    Malware,
}

impl ThreatType {
    /// Map a score to its threat type. Bands are total and non-overlapping:
    /// every score in [0,1] maps to exactly one type.
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            ThreatType::Legitimate
        } else if score < 0.7 {
            ThreatType::Suspicious
        } else {
            ThreatType::Phishing
        }
    }
}

impl std::fmt::Display for ThreatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThreatType::Legitimate => "legitimate",
            ThreatType::Suspicious => "suspicious",
            ThreatType::Phishing => "phishing",
            ThreatType::Spam => "spam",
            ThreatType::Malware => "malware",
        };
        write!(f, "{s}")
    }
}

/// Detection confidence, derived from the same score boundaries as the
/// type bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_score(score: f64) -> Self {
        if score < 0.5 {
            Confidence::Low
        } else if score <= 0.8 {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }
}

/// Score bands exposed for UI rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    Safe,
    LowRisk,
    MediumRisk,
    HighRisk,
    Critical,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            RiskBand::Safe
        } else if score < 0.5 {
            RiskBand::LowRisk
        } else if score < 0.7 {
            RiskBand::MediumRisk
        } else if score < 0.9 {
            RiskBand::HighRisk
        } else {
            RiskBand::Critical
        }
    }
}

/// The score's decomposition into family-attributable fractions.
/// Fractions sum to at most 1.0 (all zero when nothing contributed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub content: f64,
    pub url: f64,
    pub metadata: f64,
}

/// Signed per-feature scoring term. For rule-based scoring this is the
/// weighted term itself, not a gradient attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub contribution: f64,
}

/// A highlighted range of the analyzed text (`subject ‖ "\n\n" ‖ body`),
/// byte offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousSpan {
    pub start: usize,
    pub end: usize,
    pub reason: String,
}

/// A link with the reason it looks suspicious, or "None".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousUrl {
    pub url: String,
    pub reason: String,
}

/// The scored, typed, explained verdict for one message. Produced once per
/// (message, scorer) and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub score: f64,
    pub threat_type: ThreatType,
    pub confidence: Confidence,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_breakdown: RiskBreakdown,
    pub feature_contributions: Vec<FeatureContribution>,
    pub suspicious_spans: Vec<SuspiciousSpan>,
    pub suspicious_urls: Vec<SuspiciousUrl>,
}

impl ThreatAssessment {
    /// Degraded assessment for a message whose analysis failed. Never used
    /// for scored messages.
    pub fn analysis_failed() -> Self {
        ThreatAssessment {
            score: 0.0,
            threat_type: ThreatType::Legitimate,
            confidence: Confidence::Low,
            risk_factors: vec!["analysis failed".to_string()],
            recommendations: Vec::new(),
            risk_breakdown: RiskBreakdown::default(),
            feature_contributions: Vec::new(),
            suspicious_spans: Vec::new(),
            suspicious_urls: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_bands_are_total() {
        // Every score in [0,1] maps to exactly one type.
        for i in 0..=100 {
            let score = i as f64 / 100.0;
            let _ = ThreatType::from_score(score);
        }
        assert_eq!(ThreatType::from_score(0.0), ThreatType::Legitimate);
        assert_eq!(ThreatType::from_score(0.29), ThreatType::Legitimate);
        assert_eq!(ThreatType::from_score(0.3), ThreatType::Suspicious);
        assert_eq!(ThreatType::from_score(0.69), ThreatType::Suspicious);
        assert_eq!(ThreatType::from_score(0.7), ThreatType::Phishing);
        assert_eq!(ThreatType::from_score(1.0), ThreatType::Phishing);
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_score(0.49), Confidence::Low);
        assert_eq!(Confidence::from_score(0.5), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.8), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.81), Confidence::High);
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(RiskBand::from_score(0.1), RiskBand::Safe);
        assert_eq!(RiskBand::from_score(0.4), RiskBand::LowRisk);
        assert_eq!(RiskBand::from_score(0.6), RiskBand::MediumRisk);
        assert_eq!(RiskBand::from_score(0.8), RiskBand::HighRisk);
        assert_eq!(RiskBand::from_score(0.95), RiskBand::Critical);
    }
}
