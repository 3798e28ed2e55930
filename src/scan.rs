use crate::assessment::ThreatAssessment;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::features::FeatureAggregator;
use crate::message::EmailMessage;
use crate::policy::PolicyFilter;
use crate::scorer::ThreatScorer;
use crate::source::InboxSource;
use crate::store::{FlaggedEmailRecord, FlaggedStore, PolicyStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Which source actually served a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    Primary,
    Fallback,
}

/// Aggregate outcome of one inbox scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub total_scanned: usize,
    pub threats_found: usize,
    pub threat_rate: f64,
    pub source: ScanSource,
    /// Why the primary source was bypassed, when it was.
    pub fallback_reason: Option<String>,
    /// Messages that could not be analyzed and received a degraded verdict.
    pub analysis_failures: usize,
}

/// A single message's assessment after policy overrides.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub assessment: ThreatAssessment,
    pub is_threat: bool,
    pub override_reason: Option<String>,
}

/// Drives extraction, scoring, policy, and persistence for whole inboxes.
///
/// Scans are idempotent: a message already flagged for the user is skipped
/// on rescan (it still counts as scanned and as a threat), so repeated scans
/// of an unchanged inbox report unchanged totals and write nothing.
pub struct ScanOrchestrator {
    aggregator: FeatureAggregator,
    scorer: ThreatScorer,
    policies: Arc<dyn PolicyStore>,
    flagged: Arc<dyn FlaggedStore>,
    primary: Box<dyn InboxSource>,
    fallback: Box<dyn InboxSource>,
    fetch_limit: usize,
    blacklist_score_floor: f64,
}

impl ScanOrchestrator {
    pub fn new(
        config: &EngineConfig,
        policies: Arc<dyn PolicyStore>,
        flagged: Arc<dyn FlaggedStore>,
        primary: Box<dyn InboxSource>,
        fallback: Box<dyn InboxSource>,
    ) -> Self {
        let aggregator = FeatureAggregator::new();
        let scorer = ThreatScorer::new(
            config.scoring.clone(),
            config.model_path.as_deref(),
            &aggregator,
        );
        ScanOrchestrator {
            aggregator,
            scorer,
            policies,
            flagged,
            primary,
            fallback,
            fetch_limit: config.fetch_limit,
            blacklist_score_floor: config.scoring.blacklist_score_floor,
        }
    }

    pub fn is_model_backed(&self) -> bool {
        self.scorer.is_model_backed()
    }

    /// Scan the user's inbox, skipping already-flagged messages.
    pub fn scan_inbox(&self, user_id: &str) -> Result<ScanResult, EngineError> {
        self.scan(user_id, false)
    }

    /// Scan the user's inbox. With `force_rescan`, already-flagged messages
    /// are re-analyzed instead of skipped; unchanged assessments still leave
    /// their stored records untouched.
    pub fn scan(&self, user_id: &str, force_rescan: bool) -> Result<ScanResult, EngineError> {
        let (messages, source, fallback_reason) = self.fetch()?;

        // Snapshot once; list edits made mid-scan apply from the next scan.
        let policy = self.policies.get(user_id);

        let mut threats_found = 0usize;
        let mut analysis_failures = 0usize;

        for message in &messages {
            if !force_rescan && self.flagged.exists(user_id, &message.id)? {
                log::debug!("message {} already flagged, skipping", message.id);
                threats_found += 1;
                continue;
            }

            let verdict = match self.assess(message, &policy) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("analysis of message {} failed: {e}", message.id);
                    analysis_failures += 1;
                    Verdict {
                        assessment: ThreatAssessment::analysis_failed(),
                        is_threat: false,
                        override_reason: None,
                    }
                }
            };

            if verdict.is_threat {
                threats_found += 1;
                if policy.auto_flag {
                    self.flagged.save(FlaggedEmailRecord {
                        user_id: user_id.to_string(),
                        message_id: message.id.clone(),
                        assessment: verdict.assessment,
                        flagged_at: Utc::now(),
                        false_positive: false,
                    })?;
                }
            }
        }

        let total_scanned = messages.len();
        let threat_rate = if total_scanned == 0 {
            0.0
        } else {
            threats_found as f64 / total_scanned as f64
        };
        log::info!(
            "scanned {total_scanned} messages for {user_id}: {threats_found} threats, \
             {analysis_failures} analysis failures"
        );

        Ok(ScanResult {
            total_scanned,
            threats_found,
            threat_rate,
            source,
            fallback_reason,
            analysis_failures,
        })
    }

    /// Assess a single message on demand, optionally persisting a threat
    /// verdict the same way a scan would.
    pub fn analyze_single_email(
        &self,
        user_id: &str,
        message: &EmailMessage,
        persist: bool,
    ) -> Result<Verdict, EngineError> {
        let policy = self.policies.get(user_id);
        let verdict = self.assess(message, &policy)?;
        if persist && verdict.is_threat {
            self.flagged.save(FlaggedEmailRecord {
                user_id: user_id.to_string(),
                message_id: message.id.clone(),
                assessment: verdict.assessment.clone(),
                flagged_at: Utc::now(),
                false_positive: false,
            })?;
        }
        Ok(verdict)
    }

    /// Retrieve the stored verdict for a previously flagged message.
    pub fn get_assessment(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<FlaggedEmailRecord>, EngineError> {
        self.flagged.get(user_id, message_id)
    }

    fn assess(
        &self,
        message: &EmailMessage,
        policy: &crate::policy::UserPolicy,
    ) -> Result<Verdict, EngineError> {
        let (vector, artifacts) = self.aggregator.extract(message)?;
        let assessment = self.scorer.score(&vector, artifacts)?;
        let decision = PolicyFilter::apply(
            policy,
            &message.sender,
            assessment.score,
            self.blacklist_score_floor,
        );

        let mut assessment = assessment;
        if decision.score != assessment.score {
            assessment.score = decision.score;
            assessment.threat_type =
                crate::assessment::ThreatType::from_score(decision.score);
            assessment.confidence =
                crate::assessment::Confidence::from_score(decision.score);
        }
        if let Some(reason) = &decision.override_reason {
            assessment.risk_factors.insert(0, reason.clone());
        }

        Ok(Verdict {
            assessment,
            is_threat: decision.is_threat,
            override_reason: decision.override_reason,
        })
    }

    /// Fetch from the primary source, falling back on provider failure.
    /// A fallback failure does propagate; there is nothing left to try.
    fn fetch(
        &self,
    ) -> Result<(Vec<EmailMessage>, ScanSource, Option<String>), EngineError> {
        match self.primary.fetch(self.fetch_limit) {
            Ok(messages) => Ok((messages, ScanSource::Primary, None)),
            Err(e) => {
                let reason = format!("{} unavailable: {e}", self.primary.name());
                log::warn!("{reason}; using {} source", self.fallback.name());
                let messages = self.fallback.fetch(self.fetch_limit)?;
                Ok((messages, ScanSource::Fallback, Some(reason)))
            }
        }
    }
}
