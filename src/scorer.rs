use crate::assessment::{
    Confidence, FeatureContribution, RiskBreakdown, ThreatAssessment, ThreatType,
};
use crate::config::ScoringConfig;
use crate::error::EngineError;
use crate::features::{
    ExtractionArtifacts, FeatureAggregator, FeatureGroup, FeatureVector, FEATURE_SET_VERSION,
};
use crate::model::ModelArtifact;
use std::path::Path;

/// Per-feature term of the rule-based score. The term contributes
/// `weight * clamp01((value - floor) / (cap - floor))` to its family risk.
/// This table is part of the feature-set definition and versioned with it;
/// the family weights and reporting thresholds live in `ScoringConfig`.
struct RuleTerm {
    feature: &'static str,
    group: FeatureGroup,
    weight: f64,
    floor: f64,
    cap: f64,
}

const RULE_TERMS: &[RuleTerm] = &[
    // Content family
    RuleTerm { feature: "phishing_keyword_count", group: FeatureGroup::Content, weight: 0.45, floor: 0.0, cap: 6.0 },
    RuleTerm { feature: "high_risk_phrase_count", group: FeatureGroup::Content, weight: 0.25, floor: 0.0, cap: 2.0 },
    RuleTerm { feature: "urgency_word_count", group: FeatureGroup::Content, weight: 0.20, floor: 0.0, cap: 4.0 },
    RuleTerm { feature: "exclamation_count", group: FeatureGroup::Content, weight: 0.05, floor: 1.0, cap: 4.0 },
    RuleTerm { feature: "uppercase_ratio", group: FeatureGroup::Content, weight: 0.05, floor: 0.1, cap: 0.4 },
    RuleTerm { feature: "vocabulary_richness", group: FeatureGroup::Content, weight: -0.05, floor: 0.0, cap: 1.0 },
    // URL family
    RuleTerm { feature: "url_ip_literal_count", group: FeatureGroup::Url, weight: 0.35, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "url_brand_impersonation_count", group: FeatureGroup::Url, weight: 0.40, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "url_suspicious_tld_count", group: FeatureGroup::Url, weight: 0.30, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "url_suspicious_pattern_count", group: FeatureGroup::Url, weight: 0.25, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "url_shortener_count", group: FeatureGroup::Url, weight: 0.20, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "url_suspicious_path_count", group: FeatureGroup::Url, weight: 0.15, floor: 0.0, cap: 2.0 },
    RuleTerm { feature: "url_max_domain_entropy", group: FeatureGroup::Url, weight: 0.15, floor: 3.0, cap: 4.5 },
    RuleTerm { feature: "url_count", group: FeatureGroup::Url, weight: 0.10, floor: 2.0, cap: 6.0 },
    // Metadata family
    RuleTerm { feature: "meta_sender_brand_mismatch", group: FeatureGroup::Metadata, weight: 0.45, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "meta_display_name_mismatch", group: FeatureGroup::Metadata, weight: 0.40, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "meta_reply_to_mismatch", group: FeatureGroup::Metadata, weight: 0.30, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "meta_free_webmail_claimed_org", group: FeatureGroup::Metadata, weight: 0.25, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "meta_domain_reputation_unknown", group: FeatureGroup::Metadata, weight: 0.20, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "meta_sender_local_random", group: FeatureGroup::Metadata, weight: 0.15, floor: 0.0, cap: 1.0 },
    RuleTerm { feature: "meta_sender_local_has_digits", group: FeatureGroup::Metadata, weight: 0.10, floor: 0.0, cap: 1.0 },
];

/// Human phrasing for material features. Unlisted features fall back to a
/// generic sentence.
const RISK_FACTOR_PHRASES: &[(&str, &str)] = &[
    ("phishing_keyword_count", "Multiple phishing keywords detected"),
    ("high_risk_phrase_count", "High-risk phrases found"),
    ("urgency_word_count", "Urgency manipulation detected"),
    ("exclamation_count", "Excessive punctuation (emotional manipulation)"),
    ("uppercase_ratio", "Excessive use of uppercase letters"),
    ("url_ip_literal_count", "Direct IP addresses in links"),
    ("url_brand_impersonation_count", "Possible brand impersonation in URL"),
    ("url_suspicious_tld_count", "Link domain uses a high-risk TLD"),
    ("url_suspicious_pattern_count", "Deceptive URL structure"),
    ("url_shortener_count", "Shortened links hide the destination"),
    ("url_suspicious_path_count", "Link path mimics a login or verification page"),
    ("url_max_domain_entropy", "Random-looking link domain"),
    ("url_count", "Excessive number of URLs"),
    ("meta_sender_brand_mismatch", "Sender domain imitates a known brand"),
    ("meta_display_name_mismatch", "Display name claims a brand the sender does not match"),
    ("meta_reply_to_mismatch", "Reply-To domain differs from sender domain"),
    ("meta_free_webmail_claimed_org", "Organization claim from a free webmail address"),
    ("meta_domain_reputation_unknown", "Sender domain has no established reputation"),
    ("meta_sender_local_random", "Random-looking sender mailbox"),
    ("meta_sender_local_has_digits", "Suspicious sender address with numbers"),
];

enum Strategy {
    RuleBased,
    Model(ModelArtifact),
}

/// Produces a calibrated score and explanation from a feature vector.
///
/// The strategy is selected once at construction and fixed for the life of
/// the process: model-backed when a compatible artifact loads, otherwise
/// the deterministic rule-based fallback. For the rule-based path a
/// "contribution" is simply the signed weighted term, not a gradient
/// attribution.
pub struct ThreatScorer {
    strategy: Strategy,
    config: ScoringConfig,
}

impl ThreatScorer {
    /// Build a scorer, attempting to load the artifact at `model_path`.
    /// An unreadable or incompatible artifact is logged once and the
    /// engine falls back to rule-based scoring.
    pub fn new(
        config: ScoringConfig,
        model_path: Option<&str>,
        aggregator: &FeatureAggregator,
    ) -> Self {
        let strategy = match model_path {
            Some(path) => match Self::load_model(Path::new(path), aggregator) {
                Ok(artifact) => {
                    log::info!("loaded classifier artifact from {path}");
                    Strategy::Model(artifact)
                }
                Err(e) => {
                    log::warn!("rejecting model artifact at {path}: {e}; using rule-based scoring");
                    Strategy::RuleBased
                }
            },
            None => Strategy::RuleBased,
        };
        ThreatScorer { strategy, config }
    }

    pub fn rule_based(config: ScoringConfig) -> Self {
        ThreatScorer {
            strategy: Strategy::RuleBased,
            config,
        }
    }

    pub fn is_model_backed(&self) -> bool {
        matches!(self.strategy, Strategy::Model(_))
    }

    fn load_model(
        path: &Path,
        aggregator: &FeatureAggregator,
    ) -> Result<ModelArtifact, EngineError> {
        let artifact = ModelArtifact::from_file(path)
            .map_err(|e| EngineError::ModelIncompatible(e.to_string()))?;
        artifact.check_compatibility(&aggregator.feature_names())?;
        Ok(artifact)
    }

    /// Score one feature vector and assemble the full assessment.
    pub fn score(
        &self,
        vector: &FeatureVector,
        artifacts: ExtractionArtifacts,
    ) -> Result<ThreatAssessment, EngineError> {
        if vector.version != FEATURE_SET_VERSION {
            return Err(EngineError::ModelIncompatible(format!(
                "feature vector v{} does not match scorer v{}",
                vector.version, FEATURE_SET_VERSION
            )));
        }

        let (score, contributions) = match &self.strategy {
            Strategy::RuleBased => self.rule_based_score(vector),
            Strategy::Model(artifact) => {
                let score = artifact.predict_probability(vector);
                let contributions = artifact.attributions(vector);
                (score, contributions)
            }
        };
        let score = score.clamp(0.0, 1.0);

        let risk_breakdown = breakdown(vector, &contributions);
        let risk_factors = self.risk_factors(&contributions);
        let recommendations = recommendations(score);

        let mut ranked: Vec<FeatureContribution> = contributions
            .into_iter()
            .filter(|(_, c)| *c != 0.0)
            .map(|(feature, contribution)| FeatureContribution {
                feature,
                contribution,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.config.max_contributions);

        Ok(ThreatAssessment {
            score,
            threat_type: ThreatType::from_score(score),
            confidence: Confidence::from_score(score),
            risk_factors,
            recommendations,
            risk_breakdown,
            feature_contributions: ranked,
            suspicious_spans: artifacts.suspicious_spans,
            suspicious_urls: artifacts.suspicious_urls,
        })
    }

    /// Deterministic weighted-sum score with per-family clamping.
    fn rule_based_score(&self, vector: &FeatureVector) -> (f64, Vec<(String, f64)>) {
        let mut family_risk = [0.0f64; 3];
        let mut contributions = Vec::with_capacity(RULE_TERMS.len());

        for term in RULE_TERMS {
            let value = vector.get(term.feature);
            let normalized = ((value - term.floor) / (term.cap - term.floor)).clamp(0.0, 1.0);
            let raw = term.weight * normalized;
            family_risk[family_index(term.group)] += raw;
            let family_weight = self.family_weight(term.group);
            contributions.push((term.feature.to_string(), family_weight * raw));
        }

        for risk in &mut family_risk {
            *risk = risk.clamp(0.0, 1.0);
        }

        let score = (self.config.content_weight * family_risk[0]
            + self.config.url_weight * family_risk[1]
            + self.config.metadata_weight * family_risk[2])
            .clamp(0.0, 1.0);

        (score, contributions)
    }

    fn family_weight(&self, group: FeatureGroup) -> f64 {
        match group {
            FeatureGroup::Content => self.config.content_weight,
            FeatureGroup::Url => self.config.url_weight,
            FeatureGroup::Metadata => self.config.metadata_weight,
        }
    }

    /// Every feature whose contribution clears the materiality threshold,
    /// phrased for humans and ordered by magnitude.
    fn risk_factors(&self, contributions: &[(String, f64)]) -> Vec<String> {
        let mut material: Vec<(&String, f64)> = contributions
            .iter()
            .filter(|(_, c)| c.abs() >= self.config.materiality_threshold && *c > 0.0)
            .map(|(name, c)| (name, *c))
            .collect();
        material.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        material
            .into_iter()
            .map(|(name, _)| {
                RISK_FACTOR_PHRASES
                    .iter()
                    .find(|(feature, _)| feature == name)
                    .map(|(_, phrase)| phrase.to_string())
                    .unwrap_or_else(|| format!("Elevated {name}"))
            })
            .collect()
    }
}

fn family_index(group: FeatureGroup) -> usize {
    match group {
        FeatureGroup::Content => 0,
        FeatureGroup::Url => 1,
        FeatureGroup::Metadata => 2,
    }
}

/// Absolute contributions summed per family and normalized to fractions.
fn breakdown(vector: &FeatureVector, contributions: &[(String, f64)]) -> RiskBreakdown {
    let mut sums = [0.0f64; 3];
    for (name, contribution) in contributions {
        if let Some((_, group, _)) = vector.iter().find(|(n, _, _)| n == name) {
            sums[family_index(*group)] += contribution.abs();
        }
    }
    let total: f64 = sums.iter().sum();
    if total <= 0.0 {
        return RiskBreakdown::default();
    }
    RiskBreakdown {
        content: sums[0] / total,
        url: sums[1] / total,
        metadata: sums[2] / total,
    }
}

fn recommendations(score: f64) -> Vec<String> {
    let lines: &[&str] = if score >= 0.8 {
        &[
            "HIGH RISK - Do not interact with this email",
            "Do not click any links or download attachments",
            "Mark as spam or phishing immediately",
            "Consider reporting to your IT security team",
        ]
    } else if score >= 0.6 {
        &[
            "MEDIUM RISK - Exercise extreme caution",
            "Verify sender identity through an alternate channel",
            "Do not provide any personal information",
            "Hover over links to check the destination before clicking",
        ]
    } else if score >= 0.4 {
        &[
            "LOW RISK - Be cautious",
            "Verify the sender if it requests sensitive actions",
            "Check for official communication through legitimate channels",
        ]
    } else {
        &[
            "Email appears legitimate",
            "Always remain vigilant with unexpected requests",
        ]
    };
    lines.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::features::FeatureAggregator;
    use crate::message::EmailMessage;
    use crate::model::ModelArtifact;
    use chrono::Utc;

    fn msg(sender: &str, subject: &str, body: &str, urls: &[&str]) -> EmailMessage {
        EmailMessage {
            id: "m-1".to_string(),
            sender: sender.to_string(),
            sender_name: None,
            reply_to: None,
            subject: subject.to_string(),
            body: body.to_string(),
            received_at: Utc::now(),
            urls: urls.iter().map(|u| u.to_string()).collect(),
            attachments: Vec::new(),
            headers: Default::default(),
        }
    }

    fn assess(message: &EmailMessage) -> ThreatAssessment {
        let aggregator = FeatureAggregator::new();
        let scorer = ThreatScorer::rule_based(ScoringConfig::default());
        let (vector, artifacts) = aggregator.extract(message).unwrap();
        scorer.score(&vector, artifacts).unwrap()
    }

    #[test]
    fn test_obvious_phishing_scores_high() {
        let assessment = assess(&msg(
            "security@paypal-verify.tk",
            "URGENT: Verify Your Account",
            "Your account has been suspended. Click here immediately to verify now: http://paypal-verify.tk/login",
            &["http://paypal-verify.tk/login"],
        ));
        assert!(assessment.score >= 0.7, "score was {}", assessment.score);
        assert_eq!(assessment.threat_type, ThreatType::Phishing);
        assert!(!assessment.risk_factors.is_empty());
        assert!(!assessment.feature_contributions.is_empty());
        assert!(!assessment.suspicious_spans.is_empty());
    }

    #[test]
    fn test_legitimate_mail_scores_low() {
        let assessment = assess(&msg(
            "orders@amazon.com",
            "Your order has shipped",
            "Thanks for your order. Track your package below.",
            &["https://amazon.com/orders/123"],
        ));
        assert!(assessment.score < 0.3, "score was {}", assessment.score);
        assert_eq!(assessment.threat_type, ThreatType::Legitimate);
    }

    #[test]
    fn test_score_always_in_unit_interval() {
        let messages = [
            msg("", "", "", &[]),
            msg(
                "x@y.tk",
                "URGENT URGENT URGENT!!!!",
                "verify verify verify click here act now account suspended password expired \
                 update payment confirm your identity http://198.51.100.7/login",
                &["http://198.51.100.7/login", "http://bit.ly/a", "http://paypal-login.tk/verify"],
            ),
        ];
        for message in &messages {
            let assessment = assess(message);
            assert!((0.0..=1.0).contains(&assessment.score));
        }
    }

    #[test]
    fn test_breakdown_sums_to_one_when_nonzero() {
        let assessment = assess(&msg(
            "security@paypal-verify.tk",
            "URGENT: Verify Your Account",
            "Click here immediately.",
            &["http://paypal-verify.tk/login"],
        ));
        let total = assessment.risk_breakdown.content
            + assessment.risk_breakdown.url
            + assessment.risk_breakdown.metadata;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_contributions_ranked_and_truncated() {
        let assessment = assess(&msg(
            "security567@bank-alert.tk",
            "ALERT: Suspicious Activity Detected!!!!",
            "URGENT! VERIFY NOW or your account will be LOCKED! Click here: http://193.45.67.89/verify-account",
            &["http://193.45.67.89/verify-account"],
        ));
        assert!(assessment.feature_contributions.len() <= 12);
        for pair in assessment.feature_contributions.windows(2) {
            assert!(pair[0].contribution.abs() >= pair[1].contribution.abs());
        }
    }

    #[test]
    fn test_vector_version_mismatch_rejected() {
        let aggregator = FeatureAggregator::new();
        let scorer = ThreatScorer::rule_based(ScoringConfig::default());
        let message = msg("a@b.com", "hi", "hello", &[]);
        let (mut vector, artifacts) = aggregator.extract(&message).unwrap();
        vector.version += 1;
        let err = scorer.score(&vector, artifacts).unwrap_err();
        assert!(matches!(err, EngineError::ModelIncompatible(_)));
    }

    #[test]
    fn test_incompatible_model_falls_back_to_rules() {
        let aggregator = FeatureAggregator::new();
        let dir = std::env::temp_dir().join("mailwarden-scorer-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad-model.json");
        let artifact = ModelArtifact {
            kind: "logistic_regression".to_string(),
            feature_set_version: crate::features::FEATURE_SET_VERSION,
            feature_names: vec!["training_only_feature".to_string()],
            weights: vec![1.0],
            bias: 0.0,
        };
        artifact.to_file(&path).unwrap();

        let scorer = ThreatScorer::new(
            ScoringConfig::default(),
            Some(path.to_str().unwrap()),
            &aggregator,
        );
        assert!(!scorer.is_model_backed());
    }

    #[test]
    fn test_compatible_model_is_used() {
        let aggregator = FeatureAggregator::new();
        let names: Vec<String> = aggregator
            .feature_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let weights = vec![0.0; names.len()];
        let artifact = ModelArtifact {
            kind: "logistic_regression".to_string(),
            feature_set_version: crate::features::FEATURE_SET_VERSION,
            feature_names: names,
            weights,
            bias: -4.0,
        };
        let dir = std::env::temp_dir().join("mailwarden-scorer-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("good-model.json");
        artifact.to_file(&path).unwrap();

        let scorer = ThreatScorer::new(
            ScoringConfig::default(),
            Some(path.to_str().unwrap()),
            &aggregator,
        );
        assert!(scorer.is_model_backed());

        // Bias -4 pushes every probability near zero regardless of input.
        let message = msg("a@b.com", "hi", "hello", &[]);
        let (vector, artifacts) = aggregator.extract(&message).unwrap();
        let assessment = scorer.score(&vector, artifacts).unwrap();
        assert!(assessment.score < 0.3);
        assert_eq!(assessment.threat_type, ThreatType::Legitimate);
    }

    #[test]
    fn test_recommendations_follow_score_tier() {
        let high = recommendations(0.9);
        assert!(high[0].contains("HIGH RISK"));
        let low = recommendations(0.1);
        assert!(low[0].contains("legitimate"));
    }
}
