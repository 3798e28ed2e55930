pub mod content;
pub mod metadata;
pub mod url;

use crate::assessment::{SuspiciousSpan, SuspiciousUrl};
use crate::error::EngineError;
use crate::message::EmailMessage;
use serde::{Deserialize, Serialize};

pub use content::ContentFeatureExtractor;
pub use metadata::MetadataFeatureExtractor;
pub use url::UrlFeatureExtractor;

/// Version of the feature set (names and ordering). Bumped whenever a
/// feature is added, removed, or reordered; scorers reject vectors carrying
/// a different version instead of silently mis-scoring.
pub const FEATURE_SET_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureGroup {
    Content,
    Url,
    Metadata,
}

/// One named feature vector with a stable ordering: content features first,
/// then URL, then metadata. Built fresh per message, never cached across
/// messages.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    pub version: u32,
    entries: Vec<(&'static str, FeatureGroup, f64)>,
}

impl FeatureVector {
    fn new() -> Self {
        FeatureVector {
            version: FEATURE_SET_VERSION,
            entries: Vec::new(),
        }
    }

    fn extend(&mut self, group: FeatureGroup, pairs: Vec<(&'static str, f64)>) {
        for (name, value) in pairs {
            self.entries.push((name, group, value));
        }
    }

    pub fn get(&self, name: &str) -> f64 {
        self.entries
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, _, v)| *v)
            .unwrap_or(0.0)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(n, _, _)| *n).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, FeatureGroup, f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Explainability side products of extraction, carried alongside the
/// numeric vector into the assessment.
#[derive(Debug, Clone, Default)]
pub struct ExtractionArtifacts {
    pub suspicious_spans: Vec<SuspiciousSpan>,
    pub suspicious_urls: Vec<SuspiciousUrl>,
}

/// Merges the three feature families into one vector with the fixed,
/// versioned ordering the scorers agree on.
pub struct FeatureAggregator {
    content: ContentFeatureExtractor,
    url: UrlFeatureExtractor,
    metadata: MetadataFeatureExtractor,
}

impl Default for FeatureAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureAggregator {
    pub fn new() -> Self {
        FeatureAggregator {
            content: ContentFeatureExtractor::new(),
            url: UrlFeatureExtractor::new(),
            metadata: MetadataFeatureExtractor::new(),
        }
    }

    /// Extract the full feature vector for one message.
    ///
    /// A message without a provider id cannot be keyed for idempotent
    /// flagging and is rejected as malformed; the orchestrator recovers
    /// per-message.
    pub fn extract(
        &self,
        message: &EmailMessage,
    ) -> Result<(FeatureVector, ExtractionArtifacts), EngineError> {
        if message.id.trim().is_empty() {
            return Err(EngineError::Extraction(
                "message has no provider id".to_string(),
            ));
        }

        let content = self.content.extract(&message.subject, &message.body);

        let urls = if message.urls.is_empty() {
            UrlFeatureExtractor::extract_urls_from_text(&message.body)
        } else {
            message.urls.clone()
        };
        let url = self.url.extract(&urls);

        let metadata = self.metadata.extract(
            &message.sender,
            message.sender_name.as_deref(),
            message.reply_to.as_deref(),
        );

        let mut vector = FeatureVector::new();
        vector.extend(FeatureGroup::Content, content.entries);
        vector.extend(FeatureGroup::Url, url.entries);
        vector.extend(FeatureGroup::Metadata, metadata.entries);

        let artifacts = ExtractionArtifacts {
            suspicious_spans: content.spans,
            suspicious_urls: url.suspicious_urls,
        };

        Ok((vector, artifacts))
    }

    /// Canonical feature names in vector order, for model compatibility
    /// checks.
    pub fn feature_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        names.extend_from_slice(content::FEATURE_NAMES);
        names.extend_from_slice(url::FEATURE_NAMES);
        names.extend_from_slice(metadata::FEATURE_NAMES);
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message() -> EmailMessage {
        EmailMessage {
            id: "msg-1".to_string(),
            sender: "security@paypal-verify.tk".to_string(),
            sender_name: Some("PayPal Security".to_string()),
            reply_to: None,
            subject: "URGENT: Verify Your Account".to_string(),
            body: "Click here immediately: http://paypal-verify.tk/login".to_string(),
            received_at: Utc::now(),
            urls: vec!["http://paypal-verify.tk/login".to_string()],
            attachments: Vec::new(),
            headers: Default::default(),
        }
    }

    #[test]
    fn test_ordering_matches_feature_names() {
        let aggregator = FeatureAggregator::new();
        let (vector, _) = aggregator.extract(&message()).unwrap();
        assert_eq!(vector.names(), aggregator.feature_names());
        assert_eq!(vector.version, FEATURE_SET_VERSION);
    }

    #[test]
    fn test_groups_are_contiguous_and_ordered() {
        let aggregator = FeatureAggregator::new();
        let (vector, _) = aggregator.extract(&message()).unwrap();
        let groups: Vec<FeatureGroup> = vector.iter().map(|(_, g, _)| *g).collect();
        let mut seen_url = false;
        let mut seen_meta = false;
        for group in groups {
            match group {
                FeatureGroup::Content => assert!(!seen_url && !seen_meta),
                FeatureGroup::Url => {
                    assert!(!seen_meta);
                    seen_url = true;
                }
                FeatureGroup::Metadata => seen_meta = true,
            }
        }
        assert!(seen_url && seen_meta);
    }

    #[test]
    fn test_urls_extracted_from_body_when_not_presplit() {
        let aggregator = FeatureAggregator::new();
        let mut msg = message();
        msg.urls.clear();
        let (vector, artifacts) = aggregator.extract(&msg).unwrap();
        assert_eq!(vector.get("url_count"), 1.0);
        assert_eq!(artifacts.suspicious_urls.len(), 1);
    }

    #[test]
    fn test_missing_id_is_extraction_error() {
        let aggregator = FeatureAggregator::new();
        let mut msg = message();
        msg.id = "  ".to_string();
        let err = aggregator.extract(&msg).unwrap_err();
        assert!(matches!(err, EngineError::Extraction(_)));
    }

    #[test]
    fn test_artifacts_present_for_phishing_message() {
        let aggregator = FeatureAggregator::new();
        let (vector, artifacts) = aggregator.extract(&message()).unwrap();
        assert!(vector.get("phishing_keyword_count") > 0.0);
        assert!(!artifacts.suspicious_spans.is_empty());
        assert_ne!(artifacts.suspicious_urls[0].reason, "None");
    }
}
