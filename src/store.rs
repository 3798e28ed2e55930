use crate::assessment::ThreatAssessment;
use crate::error::EngineError;
use crate::policy::{pattern_matches, BlacklistEntry, UserPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A persisted flagged verdict. At most one exists per
/// (user_id, message_id); scanning is idempotent at the message-identity
/// level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedEmailRecord {
    pub user_id: String,
    pub message_id: String,
    pub assessment: ThreatAssessment,
    pub flagged_at: DateTime<Utc>,
    pub false_positive: bool,
}

/// Store of per-user scanning policies. Load-on-demand with write-through
/// on mutation; a user without stored policy gets the default.
pub trait PolicyStore: Send + Sync {
    fn get(&self, user_id: &str) -> UserPolicy;
    fn update(&self, user_id: &str, policy: UserPolicy) -> Result<(), EngineError>;

    /// Add a sender pattern to the whitelist. Removes any matching
    /// blacklist entry so a sender is on at most one list.
    fn add_to_whitelist(&self, user_id: &str, pattern: &str) -> Result<(), EngineError>;

    /// Add a sender pattern to the blacklist. Removes any matching
    /// whitelist entry.
    fn add_to_blacklist(
        &self,
        user_id: &str,
        pattern: &str,
        reason: Option<&str>,
    ) -> Result<(), EngineError>;

    fn set_threshold(&self, user_id: &str, threshold: f64) -> Result<(), EngineError>;
}

/// Persistence sink for flagged verdicts.
pub trait FlaggedStore: Send + Sync {
    fn exists(&self, user_id: &str, message_id: &str) -> Result<bool, EngineError>;

    /// Insert a record, or refresh an existing one only when its assessment
    /// changed (e.g. a model upgrade). A rescan of an unchanged message is
    /// a no-op.
    fn save(&self, record: FlaggedEmailRecord) -> Result<(), EngineError>;

    fn get(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<FlaggedEmailRecord>, EngineError>;

    fn list(&self, user_id: &str) -> Result<Vec<FlaggedEmailRecord>, EngineError>;

    fn mark_false_positive(
        &self,
        user_id: &str,
        message_id: &str,
        false_positive: bool,
    ) -> Result<(), EngineError>;
}

/// In-memory policy store keyed by user id.
#[derive(Default)]
pub struct MemoryPolicyStore {
    policies: Mutex<HashMap<String, UserPolicy>>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn get(&self, user_id: &str) -> UserPolicy {
        self.policies
            .lock()
            .expect("policy store lock")
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn update(&self, user_id: &str, policy: UserPolicy) -> Result<(), EngineError> {
        self.policies
            .lock()
            .expect("policy store lock")
            .insert(user_id.to_string(), policy);
        Ok(())
    }

    fn add_to_whitelist(&self, user_id: &str, pattern: &str) -> Result<(), EngineError> {
        let mut policies = self.policies.lock().expect("policy store lock");
        let policy = policies.entry(user_id.to_string()).or_default();
        policy
            .blacklist
            .retain(|e| !e.pattern.eq_ignore_ascii_case(pattern) && !pattern_matches(&e.pattern, pattern));
        if !policy
            .whitelist
            .iter()
            .any(|p| p.eq_ignore_ascii_case(pattern))
        {
            policy.whitelist.push(pattern.to_lowercase());
        }
        Ok(())
    }

    fn add_to_blacklist(
        &self,
        user_id: &str,
        pattern: &str,
        reason: Option<&str>,
    ) -> Result<(), EngineError> {
        let mut policies = self.policies.lock().expect("policy store lock");
        let policy = policies.entry(user_id.to_string()).or_default();
        policy
            .whitelist
            .retain(|p| !p.eq_ignore_ascii_case(pattern) && !pattern_matches(p, pattern));
        if !policy
            .blacklist
            .iter()
            .any(|e| e.pattern.eq_ignore_ascii_case(pattern))
        {
            policy.blacklist.push(BlacklistEntry {
                pattern: pattern.to_lowercase(),
                reason: reason.map(|r| r.to_string()),
            });
        }
        Ok(())
    }

    fn set_threshold(&self, user_id: &str, threshold: f64) -> Result<(), EngineError> {
        let mut policies = self.policies.lock().expect("policy store lock");
        let policy = policies.entry(user_id.to_string()).or_default();
        policy.threshold = threshold.clamp(0.0, 1.0);
        Ok(())
    }
}

/// In-memory flagged-record store keyed by (user id, message id).
#[derive(Default)]
pub struct MemoryFlaggedStore {
    records: Mutex<HashMap<(String, String), FlaggedEmailRecord>>,
}

impl MemoryFlaggedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("flagged store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FlaggedStore for MemoryFlaggedStore {
    fn exists(&self, user_id: &str, message_id: &str) -> Result<bool, EngineError> {
        Ok(self
            .records
            .lock()
            .expect("flagged store lock")
            .contains_key(&(user_id.to_string(), message_id.to_string())))
    }

    fn save(&self, record: FlaggedEmailRecord) -> Result<(), EngineError> {
        let mut records = self.records.lock().expect("flagged store lock");
        let key = (record.user_id.clone(), record.message_id.clone());
        match records.get(&key) {
            Some(existing) if existing.assessment == record.assessment => {}
            _ => {
                records.insert(key, record);
            }
        }
        Ok(())
    }

    fn get(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<Option<FlaggedEmailRecord>, EngineError> {
        Ok(self
            .records
            .lock()
            .expect("flagged store lock")
            .get(&(user_id.to_string(), message_id.to_string()))
            .cloned())
    }

    fn list(&self, user_id: &str) -> Result<Vec<FlaggedEmailRecord>, EngineError> {
        let records = self.records.lock().expect("flagged store lock");
        let mut out: Vec<FlaggedEmailRecord> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.flagged_at.cmp(&a.flagged_at));
        Ok(out)
    }

    fn mark_false_positive(
        &self,
        user_id: &str,
        message_id: &str,
        false_positive: bool,
    ) -> Result<(), EngineError> {
        let mut records = self.records.lock().expect("flagged store lock");
        match records.get_mut(&(user_id.to_string(), message_id.to_string())) {
            Some(record) => {
                record.false_positive = false_positive;
                Ok(())
            }
            None => Err(EngineError::Persistence(format!(
                "no flagged record for message {message_id}"
            ))),
        }
    }
}
