use serde::{Deserialize, Serialize};

/// Default flagging threshold for new users.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub pattern: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Per-user scanning policy. Mutated only through explicit
/// whitelist/blacklist/settings operations; the scan takes a snapshot at
/// start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPolicy {
    /// Score at or above which a message is treated as a threat.
    pub threshold: f64,
    /// Persist flagged verdicts automatically during scans.
    pub auto_flag: bool,
    /// Sender patterns that are never threats.
    pub whitelist: Vec<String>,
    /// Sender patterns that are always threats.
    pub blacklist: Vec<BlacklistEntry>,
}

impl Default for UserPolicy {
    fn default() -> Self {
        UserPolicy {
            threshold: DEFAULT_THRESHOLD,
            auto_flag: true,
            whitelist: Vec::new(),
            blacklist: Vec::new(),
        }
    }
}

impl UserPolicy {
    pub fn whitelisted(&self, sender: &str) -> bool {
        self.whitelist.iter().any(|p| pattern_matches(p, sender))
    }

    pub fn blacklisted(&self, sender: &str) -> Option<&BlacklistEntry> {
        self.blacklist
            .iter()
            .find(|e| pattern_matches(&e.pattern, sender))
    }
}

/// Outcome of applying policy overrides to a computed score.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision {
    pub is_threat: bool,
    pub score: f64,
    pub override_reason: Option<String>,
}

/// Applies per-user overrides to a raw score. Evaluation order is fixed:
/// blacklist, then whitelist, then threshold. If a sender somehow matches
/// both lists, blacklist wins.
pub struct PolicyFilter;

impl PolicyFilter {
    pub fn apply(
        policy: &UserPolicy,
        sender: &str,
        score: f64,
        score_floor: f64,
    ) -> PolicyDecision {
        if let Some(entry) = policy.blacklisted(sender) {
            let reason = match &entry.reason {
                Some(r) => format!("blacklisted sender: {r}"),
                None => "blacklisted sender".to_string(),
            };
            return PolicyDecision {
                is_threat: true,
                score: score.max(score_floor),
                override_reason: Some(reason),
            };
        }

        if policy.whitelisted(sender) {
            return PolicyDecision {
                is_threat: false,
                score,
                override_reason: Some("whitelisted sender".to_string()),
            };
        }

        PolicyDecision {
            is_threat: score >= policy.threshold,
            score,
            override_reason: None,
        }
    }
}

/// Case-insensitive exact-address or domain-suffix match. A pattern
/// without '@' matches the sender's domain and its subdomains.
pub fn pattern_matches(pattern: &str, sender: &str) -> bool {
    let pattern = pattern.trim().to_lowercase();
    let sender = sender.trim().to_lowercase();
    if pattern.is_empty() || sender.is_empty() {
        return false;
    }
    if pattern.contains('@') {
        return pattern == sender;
    }
    match sender.rsplit('@').next() {
        Some(domain) if domain != sender => {
            domain == pattern || domain.ends_with(&format!(".{pattern}"))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UserPolicy {
        UserPolicy {
            threshold: 0.6,
            auto_flag: true,
            whitelist: vec!["friend@gmail.com".to_string(), "mycompany.com".to_string()],
            blacklist: vec![BlacklistEntry {
                pattern: "security@paypal-verify.tk".to_string(),
                reason: Some("reported phish".to_string()),
            }],
        }
    }

    #[test]
    fn test_pattern_matching() {
        assert!(pattern_matches("Friend@Gmail.com", "friend@gmail.com"));
        assert!(pattern_matches("mycompany.com", "hr@mycompany.com"));
        assert!(pattern_matches("mycompany.com", "hr@mail.mycompany.com"));
        assert!(!pattern_matches("mycompany.com", "hr@notmycompany.com"));
        assert!(!pattern_matches("friend@gmail.com", "other@gmail.com"));
        assert!(!pattern_matches("", "anyone@example.com"));
    }

    #[test]
    fn test_blacklist_dominates_even_at_zero_score() {
        let decision = PolicyFilter::apply(&policy(), "security@paypal-verify.tk", 0.0, 0.9);
        assert!(decision.is_threat);
        assert_eq!(decision.score, 0.9);
        assert!(decision.override_reason.unwrap().contains("blacklisted"));
    }

    #[test]
    fn test_whitelist_dominates_even_at_max_score() {
        let decision = PolicyFilter::apply(&policy(), "friend@gmail.com", 1.0, 0.9);
        assert!(!decision.is_threat);
        assert_eq!(decision.score, 1.0);
    }

    #[test]
    fn test_whitelisted_domain_suffix() {
        let decision = PolicyFilter::apply(&policy(), "anyone@mail.mycompany.com", 0.95, 0.9);
        assert!(!decision.is_threat);
    }

    #[test]
    fn test_threshold_applies_otherwise() {
        let p = policy();
        assert!(PolicyFilter::apply(&p, "stranger@example.com", 0.6, 0.9).is_threat);
        assert!(!PolicyFilter::apply(&p, "stranger@example.com", 0.59, 0.9).is_threat);
    }

    #[test]
    fn test_blacklist_wins_when_both_match() {
        let mut p = policy();
        p.whitelist.push("security@paypal-verify.tk".to_string());
        let decision = PolicyFilter::apply(&p, "security@paypal-verify.tk", 0.1, 0.9);
        assert!(decision.is_threat);
    }

    #[test]
    fn test_blacklist_keeps_higher_computed_score() {
        let decision = PolicyFilter::apply(&policy(), "security@paypal-verify.tk", 0.97, 0.9);
        assert_eq!(decision.score, 0.97);
    }
}
